use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};

/// Optional config file read from the working directory
pub const CONFIG_FILE: &str = "zeitindex-stats.toml";

/// Prefix for environment overrides, e.g. `STATS_PORT=8080`
pub const ENV_PREFIX: &str = "STATS_";

/// Uploads above this size are rejected before parsing
pub const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
    /// Log destination. `None` or an empty path logs to stdout.
    pub log_file: Option<PathBuf>,
    /// Number of request log entries kept in memory
    pub log_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            log_file: Some(PathBuf::from("api.log")),
            log_capacity: 100,
        }
    }
}

impl ServerConfig {
    /// Defaults, then `zeitindex-stats.toml`, then `STATS_*` environment variables
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(ServerConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> Result<Self> {
        Self::figment()
            .extract()
            .map_err(|e| AppError::Internal(format!("Invalid configuration: {}", e)))
    }

    pub fn log_path(&self) -> Option<&PathBuf> {
        self.log_file
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}
