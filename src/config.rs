//! Connection configuration.

use crate::error::{Error, Result};
use serde::Deserialize;

/// Options consumed by [`crate::Database::connect`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Driver selector, e.g. "sqlite3" or "postgres". Picks the dialect.
    pub driver_name: String,
    /// File path for SQLite, connection string for Postgres.
    pub data_source_name: String,
    /// Switch SQLite to write-ahead logging after opening.
    #[serde(default)]
    pub use_write_ahead_logs: bool,
    /// Accepted but not implemented; connecting with it set only logs a warning.
    #[serde(default)]
    pub encrypt_at_rest: bool,
    #[serde(default)]
    pub encryption_key: Option<String>,
}

impl Config {
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            driver_name: "sqlite3".to_string(),
            data_source_name: path.into(),
            use_write_ahead_logs: false,
            encrypt_at_rest: false,
            encryption_key: None,
        }
    }

    pub fn postgres(dsn: impl Into<String>) -> Self {
        Self {
            driver_name: "postgres".to_string(),
            ..Self::sqlite(dsn)
        }
    }

    pub fn with_write_ahead_logs(mut self, enabled: bool) -> Self {
        self.use_write_ahead_logs = enabled;
        self
    }

    /// Parse a configuration from a TOML document using the field names above.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::Config(e.to_string()))
    }
}
