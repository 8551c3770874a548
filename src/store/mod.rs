//! Persistence: match rows, player profiles, and user lookups

pub mod memory;
pub mod profiles;
pub mod supabase;

pub use memory::MemoryStore;
pub use profiles::PlayerProfile;
pub use supabase::{SupabaseClient, SupabaseStore};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::game::Match;

/// Version counter for optimistic concurrency on match rows.
pub type Version = u64;

/// A match together with the version it was read at.
#[derive(Debug, Clone)]
pub struct StoredMatch {
    pub game: Match,
    pub version: Version,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stale write for match {0}: version check failed")]
    VersionConflict(Uuid),
    #[error("request to the storage backend failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("storage backend returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("storage backend returned no row")]
    NoRowReturned,
}

/// Match persistence.
///
/// `save` with `expected: None` inserts a new row at version 1; with
/// `Some(v)` it updates only while the stored version is still `v`, bumping
/// it by one. A failed check surfaces as `VersionConflict`, which is how
/// concurrent writers to the same match are serialized.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn load(&self, id: Uuid) -> Result<Option<StoredMatch>, StoreError>;
    async fn save(&self, game: &Match, expected: Option<Version>) -> Result<Version, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    /// Id of the player's non-finished match, if any.
    async fn active_match_id(&self, player: Uuid) -> Result<Option<Uuid>, StoreError>;
    async fn load_or_create_profile(&self, player: Uuid) -> Result<PlayerProfile, StoreError>;
    async fn update_profile(&self, profile: &PlayerProfile) -> Result<(), StoreError>;
}

/// Player-id existence lookups backing match validation.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, player: Uuid) -> Result<bool, StoreError>;
}
