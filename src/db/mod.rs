//! Database layer: dynamic rows, table schemas, and the pooled client
//!
//! ```text
//! [Catalog Managers]
//!       ↓ Row / TableSchema
//! [DbClient (sqlx pool)]
//!       ↓
//! [SQLite file]
//! ```

pub mod client;
pub mod schema;
pub mod value;

pub use client::DbClient;
pub use schema::{SchemaColumn, TableSchema};
pub use value::{DbValue, Row};
