//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::defaults::*;
use super::policy::{FilterConfig, MatchingConfig, ModerationConfig, RateLimitConfig, TrustConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity and operator settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Line gateway listener.
    pub listen: ListenConfig,
    /// Key-value store backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Pool and session lifetimes.
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Trust score range and level thresholds.
    #[serde(default)]
    pub trust: TrustConfig,
    /// Report window and ban escalation.
    #[serde(default)]
    pub moderation: ModerationConfig,
    /// Message send rate window.
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
    /// Bad-word mask and file denylist.
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name used in logs and the gateway greeting.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Prometheus metrics HTTP port (default: 9090, 0 disables).
    pub metrics_port: Option<u16>,
    /// User ids allowed to run admin commands.
    #[serde(default)]
    pub admin_ids: Vec<i64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            metrics_port: None,
            admin_ids: Vec::new(),
        }
    }
}

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:7070").
    pub address: SocketAddr,
}

/// Which store implementation backs the engine.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, lost on restart.
    #[default]
    Memory,
    /// Embedded redb database file.
    Redb,
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database file for the redb backend.
    #[serde(default = "default_store_path")]
    pub path: String,
    /// Seconds between expired-key sweeps (default: 60).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl StoreConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}
