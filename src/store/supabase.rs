//! Supabase PostgREST backend using the service_role key

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{MatchStore, PlayerProfile, StoreError, StoredMatch, UserDirectory, Version};
use crate::config::SupabaseConfig;
use crate::game::{Match, MatchStatus};

const MATCHES_TABLE: &str = "matches";
const PROFILES_TABLE: &str = "player_profiles";
const USERS_TABLE: &str = "users";

/// Timeout applied to every call against the backend.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin PostgREST client for server-side database access.
/// Uses the service_role key which bypasses RLS - handle with care!
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key.clone(),
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header("Content-Type", "application/json")
    }

    /// GET returning every matching row.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Vec<T>, StoreError> {
        let url = format!("{}?{}", self.rest_url(table), query);
        let response = self.authed(self.client.get(&url)).send().await?;
        let response = Self::checked(response).await?;
        Ok(response.json().await?)
    }

    /// GET expecting zero or one row.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Option<T>, StoreError> {
        let rows: Vec<T> = self.select(table, &format!("{query}&limit=1")).await?;
        Ok(rows.into_iter().next())
    }

    /// POST a row, returning its representation.
    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<R, StoreError> {
        let response = self
            .authed(self.client.post(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let response = Self::checked(response).await?;
        // PostgREST wraps the inserted row in an array
        let rows: Vec<R> = response.json().await?;
        rows.into_iter().next().ok_or(StoreError::NoRowReturned)
    }

    /// PATCH rows matching the filter, returning how many rows changed.
    pub async fn update<T: Serialize>(
        &self,
        table: &str,
        filter: &str,
        patch: &T,
    ) -> Result<usize, StoreError> {
        let url = format!("{}?{}", self.rest_url(table), filter);
        let response = self
            .authed(self.client.patch(&url))
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        let response = Self::checked(response).await?;
        let rows: Vec<Value> = response.json().await?;
        Ok(rows.len())
    }

    /// DELETE rows matching the filter.
    pub async fn delete(&self, table: &str, filter: &str) -> Result<(), StoreError> {
        let url = format!("{}?{}", self.rest_url(table), filter);
        let response = self.authed(self.client.delete(&url)).send().await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

/// Row shape for inserts into `matches`. The player and status columns are
/// duplicated out of the JSONB state so the active-match query can filter
/// without unpacking it.
#[derive(Debug, Serialize)]
struct MatchRow<'a> {
    id: Uuid,
    player1_id: Uuid,
    player2_id: Option<Uuid>,
    status: MatchStatus,
    version: Version,
    state: &'a Match,
}

#[derive(Debug, Serialize)]
struct MatchPatch<'a> {
    status: MatchStatus,
    version: Version,
    state: &'a Match,
}

#[derive(Debug, Deserialize)]
struct MatchRecord {
    version: Version,
    state: Match,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: Uuid,
}

/// Match store over the `matches`, `player_profiles` and `users` tables.
pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MatchStore for SupabaseStore {
    async fn load(&self, id: Uuid) -> Result<Option<StoredMatch>, StoreError> {
        let row: Option<MatchRecord> = self
            .client
            .select_one(MATCHES_TABLE, &format!("id=eq.{id}&select=version,state"))
            .await?;
        Ok(row.map(|r| StoredMatch {
            game: r.state,
            version: r.version,
        }))
    }

    async fn save(&self, game: &Match, expected: Option<Version>) -> Result<Version, StoreError> {
        match expected {
            None => {
                let row = MatchRow {
                    id: game.id(),
                    player1_id: game.player1(),
                    player2_id: game.player2(),
                    status: game.status(),
                    version: 1,
                    state: game,
                };
                let _: Value = self.client.insert(MATCHES_TABLE, &row).await?;
                Ok(1)
            }
            Some(version) => {
                let next = version + 1;
                let patch = MatchPatch {
                    status: game.status(),
                    version: next,
                    state: game,
                };
                let filter = format!("id=eq.{}&version=eq.{}", game.id(), version);
                let changed = self.client.update(MATCHES_TABLE, &filter, &patch).await?;
                if changed == 0 {
                    return Err(StoreError::VersionConflict(game.id()));
                }
                Ok(next)
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.client.delete(MATCHES_TABLE, &format!("id=eq.{id}")).await
    }

    async fn active_match_id(&self, player: Uuid) -> Result<Option<Uuid>, StoreError> {
        let query = format!(
            "select=id&or=(player1_id.eq.{player},player2_id.eq.{player})&status=neq.finished"
        );
        let row: Option<IdRow> = self.client.select_one(MATCHES_TABLE, &query).await?;
        Ok(row.map(|r| r.id))
    }

    async fn load_or_create_profile(&self, player: Uuid) -> Result<PlayerProfile, StoreError> {
        let existing: Option<PlayerProfile> = self
            .client
            .select_one(PROFILES_TABLE, &format!("user_id=eq.{player}&select=*"))
            .await?;
        match existing {
            Some(profile) => Ok(profile),
            None => self.client.insert(PROFILES_TABLE, &PlayerProfile::new(player)).await,
        }
    }

    async fn update_profile(&self, profile: &PlayerProfile) -> Result<(), StoreError> {
        let filter = format!("user_id=eq.{}", profile.user_id());
        let changed = self.client.update(PROFILES_TABLE, &filter, profile).await?;
        if changed == 0 {
            return Err(StoreError::NoRowReturned);
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SupabaseStore {
    async fn exists(&self, player: Uuid) -> Result<bool, StoreError> {
        let row: Option<IdRow> = self
            .client
            .select_one(USERS_TABLE, &format!("id=eq.{player}&select=id"))
            .await?;
        Ok(row.is_some())
    }
}
