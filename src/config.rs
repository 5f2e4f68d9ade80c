//! Application-level configuration loaded from the environment.

use std::{env, time::Duration};

use tracing::warn;

/// Default TCP port the server listens on.
const DEFAULT_PORT: u16 = 8080;
/// Default length of a vote countdown.
const DEFAULT_VOTE_DURATION_SECS: u64 = 30;
/// Default room capacity when the creator does not pick one.
const DEFAULT_MAX_PLAYERS: usize = 8;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Port the HTTP/WebSocket listener binds to.
    pub port: u16,
    /// MongoDB connection string.
    pub mongo_uri: String,
    /// Optional database name override.
    pub mongo_db: Option<String>,
    /// Length of a vote countdown before it resolves.
    pub vote_duration: Duration,
    /// Room capacity applied when room creation does not specify one.
    pub default_max_players: usize,
}

impl AppConfig {
    /// Load the configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .or_else(|_| env::var("SERVER_PORT"))
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let mongo_uri =
            env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
        let mongo_db = env::var("MONGO_DB").ok();

        let vote_duration = Duration::from_secs(
            parse_env("VOTE_DURATION_SECS").unwrap_or(DEFAULT_VOTE_DURATION_SECS),
        );
        let default_max_players =
            parse_env("ROOM_MAX_PLAYERS").unwrap_or(DEFAULT_MAX_PLAYERS);

        Self {
            port,
            mongo_uri,
            mongo_db,
            vote_duration,
            default_max_players,
        }
    }
}

/// Parse an environment variable, logging and discarding unparseable values.
fn parse_env<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = env::var(var).ok()?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            mongo_uri: "mongodb://localhost:27017".into(),
            mongo_db: None,
            vote_duration: Duration::from_secs(DEFAULT_VOTE_DURATION_SECS),
            default_max_players: DEFAULT_MAX_PLAYERS,
        }
    }
}
