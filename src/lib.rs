//! Realm Server Data Layer
//!
//! Persistence and domain-catalog layer for the Realm game server:
//! - Dynamic row / schema abstraction over an embedded SQLite database
//! - Manager lifecycle base with idempotent start and supervised init
//! - Template/instance catalogs with in-memory foreign-key linking
//! - Dependency-ordered, fail-fast startup orchestration
//!
//! Gameplay code boots once through [`GameData::boot`] and afterwards uses
//! the managers' synchronous getters only.

pub mod catalogs;
pub mod config;
pub mod db;
pub mod error;
pub mod manager;
pub mod orchestrator;

// Re-export commonly used types
pub use config::StorageConfig;
pub use db::{DbClient, DbValue, Row, SchemaColumn, TableSchema};
pub use error::DataError;
pub use manager::{
    start_initialization, Catalog, CatalogEntry, DatabaseManager, ManagedSystem, ManagerCore,
    ManagerState,
};
pub use orchestrator::{BootState, GameData, Orchestrator};
