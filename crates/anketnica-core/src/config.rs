//! Configuration loading and typed config structures for the economy engines.
//!
//! The configuration lives in `anketnica-config.yaml` next to the binary.
//! Every field has a default, so a missing file or a partial file is valid.
//! Environment variables override the deployment-specific values:
//!
//! - `DATABASE_URL` overrides `database.url`
//! - `ANKETNICA_LOG_LEVEL` overrides `logging.level`

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration of the economy host.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EconomyConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Price engine tuning.
    #[serde(default)]
    pub market: MarketConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Random number generation.
    #[serde(default)]
    pub rng: RngConfig,
}

impl EconomyConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment overrides are applied after parsing.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist. Environment overrides apply either way.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override values from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(level) = lookup("ANKETNICA_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` connection string.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Size of the connection pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Apply pending migrations at startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

/// Price engine tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketConfig {
    /// Whether the price loops run at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between stock price ticks.
    #[serde(default = "default_interval_secs")]
    pub stock_interval_secs: u64,

    /// Seconds between crypto price ticks.
    #[serde(default = "default_interval_secs")]
    pub crypto_interval_secs: u64,

    /// Half-width of the uniform stock noise term.
    #[serde(default = "default_stock_noise_amplitude")]
    pub stock_noise_amplitude: f64,

    /// Half-width of the uniform crypto noise term.
    #[serde(default = "default_crypto_noise_amplitude")]
    pub crypto_noise_amplitude: f64,

    /// Per-tick, per-instrument probability of a crypto shock.
    #[serde(default = "default_crypto_shock_chance")]
    pub crypto_shock_chance: f64,

    /// Half-width of a crypto shock.
    #[serde(default = "default_crypto_shock_magnitude")]
    pub crypto_shock_magnitude: f64,

    /// Days of price history kept before pruning.
    #[serde(default = "default_history_retention_days")]
    pub history_retention_days: u32,
}

impl MarketConfig {
    /// Stock tick period.
    pub fn stock_interval(&self) -> Duration {
        Duration::from_secs(self.stock_interval_secs.max(1))
    }

    /// Crypto tick period.
    pub fn crypto_interval(&self) -> Duration {
        Duration::from_secs(self.crypto_interval_secs.max(1))
    }

    /// Price history retention window.
    pub fn history_retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.history_retention_days))
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stock_interval_secs: default_interval_secs(),
            crypto_interval_secs: default_interval_secs(),
            stock_noise_amplitude: default_stock_noise_amplitude(),
            crypto_noise_amplitude: default_crypto_noise_amplitude(),
            crypto_shock_chance: default_crypto_shock_chance(),
            crypto_shock_magnitude: default_crypto_shock_magnitude(),
            history_retention_days: default_history_retention_days(),
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Random number generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RngConfig {
    /// Fixed seed for reproducible runs; OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_database_url() -> String {
    "sqlite://anketi.db".to_owned()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_interval_secs() -> u64 {
    300
}

const fn default_stock_noise_amplitude() -> f64 {
    0.01
}

const fn default_crypto_noise_amplitude() -> f64 {
    0.025
}

const fn default_crypto_shock_chance() -> f64 {
    0.01
}

const fn default_crypto_shock_magnitude() -> f64 {
    0.10
}

const fn default_history_retention_days() -> u32 {
    30
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
