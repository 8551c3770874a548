//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Per-turn time budget when TURN_TIMEOUT_SECS is not set.
pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 30;

/// Supabase connection settings. Present only when both variables are set.
#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    /// Supabase project URL
    pub url: String,
    /// Supabase service role key (bypasses RLS - server only!)
    pub service_role_key: String,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Secret for verifying bearer tokens
    pub jwt_secret: String,
    /// Allowed client origins for CORS, comma-separated; "*" is permissive
    pub client_origin: String,
    /// Per-turn time budget in seconds
    pub turn_timeout_secs: u64,
    /// Database settings; absent selects the in-memory store
    pub supabase: Option<SupabaseConfig>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let turn_timeout_secs = match env::var("TURN_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                name: "TURN_TIMEOUT_SECS",
                value: raw,
            })?,
            Err(_) => DEFAULT_TURN_TIMEOUT_SECS,
        };

        // Supabase is configured as a pair; one variable without the other
        // is a deployment mistake, not a fallback.
        let supabase = match (
            env::var("SUPABASE_URL"),
            env::var("SUPABASE_SERVICE_ROLE_KEY"),
        ) {
            (Ok(url), Ok(service_role_key)) => Some(SupabaseConfig {
                url,
                service_role_key,
            }),
            (Ok(_), Err(_)) => return Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY")),
            (Err(_), Ok(_)) => return Err(ConfigError::Missing("SUPABASE_URL")),
            (Err(_), Err(_)) => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,

            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            turn_timeout_secs,

            supabase,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
}
