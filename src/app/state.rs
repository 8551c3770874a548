//! Application state shared across routes

use std::sync::Arc;

use tracing::warn;

use crate::config::Config;
use crate::service::MatchService;
use crate::store::{
    MatchStore, MemoryStore, StoreError, SupabaseClient, SupabaseStore, UserDirectory,
};
use crate::util::rate_limit::PlayerRateLimiter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub matches: Arc<MatchService>,
    pub limiter: Arc<PlayerRateLimiter>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, StoreError> {
        let config = Arc::new(config);

        // Pick the store backend; both traits come from the same instance
        let (store, users): (Arc<dyn MatchStore>, Arc<dyn UserDirectory>) = match &config.supabase
        {
            Some(supabase) => {
                let client = SupabaseClient::new(supabase)?;
                let store = Arc::new(SupabaseStore::new(client));
                (
                    store.clone() as Arc<dyn MatchStore>,
                    store as Arc<dyn UserDirectory>,
                )
            }
            None => {
                warn!("Supabase not configured, match state lives in memory only");
                let store = Arc::new(MemoryStore::default());
                (
                    store.clone() as Arc<dyn MatchStore>,
                    store as Arc<dyn UserDirectory>,
                )
            }
        };

        let matches = Arc::new(MatchService::new(store, users, config.turn_timeout_secs));
        let limiter = Arc::new(PlayerRateLimiter::default());

        Ok(Self {
            config,
            matches,
            limiter,
        })
    }
}
