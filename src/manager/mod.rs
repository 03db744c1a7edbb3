//! Manager lifecycle base and shared catalog machinery

pub mod catalog;
pub mod database;
pub mod lifecycle;

pub use catalog::{map_rows, Catalog, CatalogEntry};
pub use database::DatabaseManager;
pub use lifecycle::{start_initialization, ManagedSystem, ManagerCore, ManagerState};
