//! Storage configuration
//!
//! Construct a `StorageConfig` explicitly, or pull overrides from the
//! environment for deployments (`REALM_DATABASE_PATH`, `REALM_DB_MAX_CONNECTIONS`).

use serde::Deserialize;

/// Configuration for the embedded game database
#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
    /// Path of the SQLite database file
    pub database_path: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Create the database file if it does not exist
    pub create_if_missing: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "data/realm.db".to_string(),
            max_connections: 8,
            create_if_missing: true,
        }
    }
}

impl StorageConfig {
    /// Build a config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("REALM_DATABASE_PATH") {
            config.database_path = path;
        }
        if let Ok(max) = std::env::var("REALM_DB_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse() {
                config.max_connections = max;
            }
        }
        config
    }

    /// Config pointing at the given database file
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            database_path: path.into(),
            ..Self::default()
        }
    }
}
