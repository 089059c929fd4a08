use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::graph::repair::RepairPolicy;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KithConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub relationships: RelationshipConfig,
    pub repair: RepairConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub default_owner: String,
}

/// Write-path tuning for paired edge operations.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RelationshipConfig {
    /// Attempts for the reciprocal write/delete, including the first one.
    pub retry_attempts: u32,
    /// Backoff before the second attempt; doubled for each further attempt.
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RepairConfig {
    /// Run the background repair worker alongside the server.
    pub enabled: bool,
    pub interval_minutes: u64,
    pub policy: RepairPolicy,
    /// Edges fetched per page during a full scan.
    pub page_size: usize,
}

impl Default for KithConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            relationships: RelationshipConfig::default(),
            repair: RepairConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 7411,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_kith_dir()
            .join("graph.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            default_owner: "default".into(),
        }
    }
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_backoff_ms: 25,
        }
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: 60,
            policy: RepairPolicy::Recreate,
            page_size: 500,
        }
    }
}

impl RelationshipConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl RepairConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}

/// Returns `~/.kith/`
pub fn default_kith_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kith")
}

/// Returns the default config file path: `~/.kith/config.toml`
pub fn default_config_path() -> PathBuf {
    default_kith_dir().join("config.toml")
}

impl KithConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            KithConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (KITH_DB, KITH_OWNER, KITH_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("KITH_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("KITH_OWNER") {
            self.storage.default_owner = val;
        }
        if let Ok(val) = std::env::var("KITH_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
