use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MindCacheConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub tracking: TrackingConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub operation_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrackingConfig {
    pub interaction_cap: usize,
    pub summary_cap: usize,
    pub insight_cap: usize,
    pub scroll_throttle_ms: i64,
    pub scroll_min_delta_px: f64,
    pub session_min_duration_ms: i64,
    pub retention_sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_ms: u64,
    pub extension_version: String,
}

impl Default for MindCacheConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            tracking: TrackingConfig::default(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7412,
            log_level: "info".into(),
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_mindcache_dir()
            .join("storage.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            operation_timeout_ms: 5000,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            interaction_cap: 1000,
            summary_cap: 100,
            insight_cap: 100,
            scroll_throttle_ms: 1000,
            scroll_min_delta_px: 100.0,
            session_min_duration_ms: 5000,
            retention_sweep_interval_secs: 3600,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:5000/api/analyze".into(),
            timeout_ms: 5000,
            extension_version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

impl StorageConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Returns `~/.mindcache/`
pub fn default_mindcache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".mindcache")
}

/// Returns the default config file path: `~/.mindcache/config.toml`
pub fn default_config_path() -> PathBuf {
    default_mindcache_dir().join("config.toml")
}

impl MindCacheConfig {
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
            MindCacheConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (MINDCACHE_DB, MINDCACHE_LOG_LEVEL, MINDCACHE_ANALYTICS_URL, MINDCACHE_PORT).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MINDCACHE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("MINDCACHE_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("MINDCACHE_ANALYTICS_URL") {
            self.analytics.endpoint = val;
            self.analytics.enabled = true;
        }
        if let Ok(val) = std::env::var("MINDCACHE_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid MINDCACHE_PORT"),
            }
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
