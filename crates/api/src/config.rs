//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use engine::{Policy, PolicyError};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Directory evidence photos are written to.
    pub photo_dir: PathBuf,
    /// Public URL prefix the photo directory is served under.
    pub photo_base_url: String,
    /// Push relay endpoint. Without one, notifications are only logged.
    pub push_relay_url: Option<String>,
    pub push_relay_token: Option<String>,
    /// Bearer token required by the /jobs routes, if set.
    pub job_token: Option<String>,
    pub policy: Policy,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `SOMBRA_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:sombra.db?mode=rwc` |
    /// | `PHOTO_DIR` | Photo directory | `photos` |
    /// | `PHOTO_BASE_URL` | Public photo URL prefix | `http://127.0.0.1:8790/photos` |
    /// | `PUSH_RELAY_URL` | Push relay endpoint | (unset) |
    /// | `PUSH_RELAY_TOKEN` | Push relay bearer token | (unset) |
    /// | `JOB_TOKEN` | Bearer token for /jobs | (unset) |
    /// | `MIN_MEMBERS_TO_START` | Members needed to start | `3` |
    /// | `MAX_MEMBERS` | Roster capacity | `5` |
    /// | `RETENTION_DAYS` | Days completed operations are kept | `7` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("SOMBRA_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("SQLITE_PATH")
            .unwrap_or_else(|_| "sqlite:sombra.db?mode=rwc".to_string());

        let photo_dir = env::var("PHOTO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("photos"));

        let photo_base_url = env::var("PHOTO_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}/photos", addr));

        Ok(Self {
            addr,
            database_url,
            photo_dir,
            photo_base_url,
            push_relay_url: non_empty("PUSH_RELAY_URL"),
            push_relay_token: non_empty("PUSH_RELAY_TOKEN"),
            job_token: non_empty("JOB_TOKEN"),
            policy: Policy::from_env()?,
        })
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid SOMBRA_ADDR format")]
    InvalidAddr,

    #[error(transparent)]
    Policy(#[from] PolicyError),
}
