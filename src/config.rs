//! Runtime configuration for the engine and its stock ledger.

use crate::core::amount::{Amount, AmountError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_CATALOG: &str = "CHANGE_ENGINE_CATALOG";
pub const ENV_STOCK_DIR: &str = "CHANGE_ENGINE_STOCK_DIR";
pub const ENV_LOCK_TIMEOUT_MS: &str = "CHANGE_ENGINE_LOCK_TIMEOUT_MS";
pub const ENV_INITIAL_STOCK: &str = "CHANGE_ENGINE_INITIAL_STOCK";

/// Units of each denomination a fresh ledger starts with.
pub const DEFAULT_INITIAL_STOCK: u64 = 1_000_000_000;

/// Errors arising from invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a whole number of milliseconds, got {value:?}")]
    InvalidTimeout { name: String, value: String },
    #[error("{name} is not a valid stock count: {source}")]
    InvalidStock {
        name: String,
        #[source]
        source: AmountError,
    },
}

/// Settings for the stock ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// How long a transaction waits for the per-currency lock.
    pub lock_timeout: Duration,
    /// Count seeded for every denomination when a ledger is first created.
    pub initial_stock: Amount,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            initial_stock: Amount::from(DEFAULT_INITIAL_STOCK),
        }
    }
}

/// Top-level engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Currency catalog file; the built-in catalog is used when `None`.
    pub catalog_path: Option<PathBuf>,
    /// Directory holding one stock file per currency.
    pub stock_dir: PathBuf,
    pub ledger: LedgerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            stock_dir: PathBuf::from("stock"),
            ledger: LedgerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with the `CHANGE_ENGINE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = lookup(ENV_CATALOG) {
            config.catalog_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup(ENV_STOCK_DIR) {
            config.stock_dir = PathBuf::from(dir);
        }
        if let Some(ms) = lookup(ENV_LOCK_TIMEOUT_MS) {
            config.ledger.lock_timeout = parse_timeout_ms(ENV_LOCK_TIMEOUT_MS, &ms)?;
        }
        if let Some(count) = lookup(ENV_INITIAL_STOCK) {
            config.ledger.initial_stock =
                Amount::parse(&count).map_err(|source| ConfigError::InvalidStock {
                    name: ENV_INITIAL_STOCK.to_string(),
                    source,
                })?;
        }
        Ok(config)
    }
}

/// Parse a millisecond count such as `"250"` into a [`Duration`].
pub fn parse_timeout_ms(name: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidTimeout {
            name: name.to_string(),
            value: value.to_string(),
        })
}
