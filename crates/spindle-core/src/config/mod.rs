//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `SPINDLE_CONFIG` env var
//! 3. **Environment variables**: `SPINDLE__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`PoolConfig`]: endpoint URLs, proxy, penalty and polling intervals
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! [pool]
//! rpc_urls = "https://eth-mainnet.example.com, wss://eth-ws.example.org"
//! proxy_url = "http://127.0.0.1:8080"
//! manual_block_time = false
//! replicas = 2
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Endpoint pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Comma-separated endpoint URLs. Order is the rotation order.
    pub rpc_urls: String,

    /// Outbound proxy for HTTP endpoints. Empty or absent means direct connections.
    pub proxy_url: Option<String>,

    /// Read block timestamps from the raw block payload instead of the typed header.
    pub manual_block_time: bool,

    /// How long a failed endpoint stays unavailable. Defaults to `15`.
    pub penalty_seconds: u64,

    /// Sleep between selection scans when every endpoint is penalized. Defaults to `15`.
    pub selection_retry_seconds: u64,

    /// Poll interval while waiting for enough endpoints for a quorum. Defaults to `60`.
    pub multi_selection_poll_seconds: u64,

    /// Maximum concurrent HTTP requests across all endpoints. Defaults to `1000`.
    pub concurrency_limit: usize,

    /// Default per-request timeout. Defaults to `30`.
    pub request_timeout_seconds: u64,

    /// Endpoints that must agree on every log query. Defaults to `1` (no cross-check).
    pub replicas: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            rpc_urls: String::new(),
            proxy_url: None,
            manual_block_time: false,
            penalty_seconds: 15,
            selection_retry_seconds: 15,
            multi_selection_poll_seconds: 60,
            concurrency_limit: 1000,
            request_timeout_seconds: 30,
            replicas: 1,
        }
    }
}

impl PoolConfig {
    /// The configured URLs, trimmed, with empty entries dropped.
    #[must_use]
    pub fn endpoint_urls(&self) -> Vec<String> {
        self.rpc_urls
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Environment variables with the `SPINDLE__` prefix can override any configuration value.
    /// Use `__` as a separator for nested fields (e.g., `SPINDLE__POOL__RPC_URLS=...`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let defaults = PoolConfig::default();
        let config_builder = Config::builder()
            .set_default("pool.rpc_urls", "")?
            .set_default("pool.manual_block_time", false)?
            .set_default("pool.penalty_seconds", defaults.penalty_seconds)?
            .set_default("pool.selection_retry_seconds", defaults.selection_retry_seconds)?
            .set_default("pool.multi_selection_poll_seconds", defaults.multi_selection_poll_seconds)?
            .set_default("pool.concurrency_limit", defaults.concurrency_limit as u64)?
            .set_default("pool.request_timeout_seconds", defaults.request_timeout_seconds)?
            .set_default("pool.replicas", defaults.replicas as u64)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("SPINDLE").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml` with fallback to defaults.
    ///
    /// The config file path can be overridden using the `SPINDLE_CONFIG` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("SPINDLE_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Validates the configuration:
    /// - At least one endpoint URL, each parseable
    /// - Intervals, penalty and concurrency greater than zero
    /// - Proxy URL parseable when set
    /// - Logging format is either `"json"` or `"pretty"`
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        let urls = self.pool.endpoint_urls();
        if urls.is_empty() {
            return Err("No RPC endpoints configured".to_string());
        }
        for url in &urls {
            url::Url::parse(url).map_err(|e| format!("Invalid endpoint URL {url}: {e}"))?;
        }

        if let Some(proxy) = self.pool.proxy_url.as_deref().filter(|p| !p.is_empty()) {
            url::Url::parse(proxy).map_err(|e| format!("Invalid proxy URL {proxy}: {e}"))?;
        }

        if self.pool.penalty_seconds == 0 {
            return Err("Penalty must be greater than 0".to_string());
        }
        if self.pool.selection_retry_seconds == 0 || self.pool.multi_selection_poll_seconds == 0 {
            return Err("Selection intervals must be greater than 0".to_string());
        }
        if self.pool.concurrency_limit == 0 {
            return Err("Concurrency limit must be greater than 0".to_string());
        }
        if self.pool.request_timeout_seconds == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(format!("Invalid logging format: {}", self.logging.format));
        }

        Ok(())
    }
}
