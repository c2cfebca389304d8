//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::BackendConfig;
use crate::live::LiveConfig;
use crate::supabase::SupabaseConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendSection,

    #[serde(default)]
    pub live: LiveSection,

    #[serde(default)]
    pub supabase: SupabaseSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Classification backend endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Live connection timing and display tuning
#[derive(Debug, Clone, Deserialize)]
pub struct LiveSection {
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_ms: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,

    #[serde(default = "default_counter_animation")]
    pub counter_animation_ms: u64,

    #[serde(default = "default_counter_steps")]
    pub counter_animation_steps: u32,
}

fn default_reconnect_delay() -> u64 {
    5000 // 5 seconds
}

fn default_keepalive_interval() -> u64 {
    30_000
}

fn default_poll_interval() -> u64 {
    10_000
}

fn default_feed_capacity() -> usize {
    20
}

fn default_counter_animation() -> u64 {
    500
}

fn default_counter_steps() -> u32 {
    20
}

impl Default for LiveSection {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay(),
            keepalive_interval_ms: default_keepalive_interval(),
            poll_interval_ms: default_poll_interval(),
            feed_capacity: default_feed_capacity(),
            counter_animation_ms: default_counter_animation(),
            counter_animation_steps: default_counter_steps(),
        }
    }
}

/// Hosted data service project
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseSection {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub anon_key: String,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default = "default_users_table")]
    pub users_table: String,

    pub redirect_to: Option<String>,
}

fn default_bucket() -> String {
    "fruit-images".to_string()
}

fn default_table() -> String {
    "classifications".to_string()
}

fn default_users_table() -> String {
    "users".to_string()
}

impl Default for SupabaseSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            bucket: default_bucket(),
            table: default_table(),
            users_table: default_users_table(),
            redirect_to: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("freshwatch").join("config.toml")),
            Some(PathBuf::from("/etc/freshwatch/config.toml")),
            Some(PathBuf::from("./freshwatch.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Backend overrides
        if let Some(url) = lookup("FRESHWATCH_API_URL") {
            self.backend.api_url = url;
        }
        if let Some(url) = lookup("FRESHWATCH_WS_URL") {
            self.backend.ws_url = url;
        }

        // Hosted service overrides
        if let Some(url) = lookup("FRESHWATCH_SUPABASE_URL") {
            self.supabase.url = url;
        }
        if let Some(key) = lookup("FRESHWATCH_SUPABASE_ANON_KEY") {
            self.supabase.anon_key = key;
        }

        // Logging overrides
        if let Some(level) = lookup("FRESHWATCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("FRESHWATCH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.backend.api_url.clone(),
            request_timeout: Duration::from_secs(self.backend.request_timeout_secs),
        }
    }

    pub fn live_config(&self) -> LiveConfig {
        LiveConfig {
            ws_url: self.backend.ws_url.clone(),
            reconnect_delay: Duration::from_millis(self.live.reconnect_delay_ms),
            keepalive_interval: Duration::from_millis(self.live.keepalive_interval_ms),
            poll_interval: Duration::from_millis(self.live.poll_interval_ms),
            history_limit: self.live.feed_capacity,
        }
    }

    pub fn supabase_config(&self) -> SupabaseConfig {
        SupabaseConfig {
            url: self.supabase.url.clone(),
            anon_key: self.supabase.anon_key.clone(),
            bucket: self.supabase.bucket.clone(),
            table: self.supabase.table.clone(),
            users_table: self.supabase.users_table.clone(),
            redirect_to: self.supabase.redirect_to.clone(),
            request_timeout: Duration::from_secs(self.backend.request_timeout_secs),
        }
    }

    /// Counter animation length
    pub fn counter_animation(&self) -> Duration {
        Duration::from_millis(self.live.counter_animation_ms)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Freshwatch Configuration
#
# Environment variables override these settings:
# - FRESHWATCH_API_URL
# - FRESHWATCH_WS_URL
# - FRESHWATCH_SUPABASE_URL
# - FRESHWATCH_SUPABASE_ANON_KEY
# - FRESHWATCH_LOG_LEVEL
# - FRESHWATCH_LOG_FORMAT

[backend]
# Classification backend REST base URL
api_url = "http://localhost:8000"

# Live update WebSocket endpoint
ws_url = "ws://localhost:8000/ws"

# Request timeout in seconds
request_timeout_secs = 10

[live]
# Delay before reconnecting after the connection drops (ms)
reconnect_delay_ms = 5000

# Keepalive interval while connected (ms)
keepalive_interval_ms = 30000

# Statistics polling interval while disconnected (ms)
poll_interval_ms = 10000

# Number of entries kept in the activity feed
feed_capacity = 20

# Counter animation length (ms) and number of steps
counter_animation_ms = 500
counter_animation_steps = 20

[supabase]
# Project URL and public anon key
url = ""
anon_key = ""

# Image bucket and tables
bucket = "fruit-images"
table = "classifications"
users_table = "users"

# Where OAuth sign-in returns to
# redirect_to = "http://localhost:3000"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend.api_url, "http://localhost:8000");
        assert_eq!(config.backend.ws_url, "ws://localhost:8000/ws");
        assert_eq!(config.live.feed_capacity, 20);
        assert_eq!(config.supabase.bucket, "fruit-images");
        assert_eq!(config.logging.format, "pretty");

        let live = config.live_config();
        assert_eq!(live.reconnect_delay, Duration::from_secs(5));
        assert_eq!(live.keepalive_interval, Duration::from_secs(30));
        assert_eq!(live.poll_interval, Duration::from_secs(10));
        assert_eq!(config.counter_animation(), Duration::from_millis(500));
    }

    #[test]
    fn test_generated_template_matches_defaults() {
        let parsed: Config = toml::from_str(&generate_default_config()).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.backend.api_url, defaults.backend.api_url);
        assert_eq!(parsed.live.poll_interval_ms, defaults.live.poll_interval_ms);
        assert_eq!(parsed.live.counter_animation_steps, defaults.live.counter_animation_steps);
        assert_eq!(parsed.supabase.users_table, defaults.supabase.users_table);
        assert!(parsed.supabase.redirect_to.is_none());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[backend]
api_url = "http://pi.local:8000"

[live]
poll_interval_ms = 2500

[supabase]
url = "https://demo.supabase.co"
redirect_to = "http://localhost:3000"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.backend.api_url, "http://pi.local:8000");
        assert_eq!(config.backend.ws_url, "ws://localhost:8000/ws");
        assert_eq!(config.live.poll_interval_ms, 2500);
        assert_eq!(config.live.reconnect_delay_ms, 5000);

        let supabase = config.supabase_config();
        assert_eq!(supabase.url, "https://demo.supabase.co");
        assert_eq!(supabase.redirect_to.as_deref(), Some("http://localhost:3000"));
        assert_eq!(supabase.table, "classifications");
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/nonexistent/freshwatch.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[live]\npoll_interval_ms = \"soon\"").unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FRESHWATCH_API_URL", "http://10.0.0.5:8000"),
            ("FRESHWATCH_WS_URL", "ws://10.0.0.5:8000/ws"),
            ("FRESHWATCH_SUPABASE_ANON_KEY", "secret"),
            ("FRESHWATCH_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend_config().base_url, "http://10.0.0.5:8000");
        assert_eq!(config.live_config().ws_url, "ws://10.0.0.5:8000/ws");
        assert_eq!(config.supabase.anon_key, "secret");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }
}
