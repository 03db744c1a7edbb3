//! Error taxonomy for the persistence and catalog layer
//!
//! Database-level failures are converted to logged boolean/empty results at
//! the manager lifecycle boundary; only manager initialization faults travel
//! further, and they stop at the orchestrator.

/// Errors produced by the storage and catalog layer
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("database connection unavailable: {context}")]
    ConnectionUnavailable { context: String },

    #[error("schema setup failed for table `{table}`: {detail}")]
    Schema { table: String, detail: String },

    #[error("query execution failed: {detail}")]
    QueryExecution { detail: String },

    #[error("row in `{table}` could not be mapped (column `{column}`): {detail}")]
    RowMapping {
        table: String,
        column: String,
        detail: String,
    },

    #[error("manager `{manager}` failed to initialize: {detail}")]
    ManagerInit { manager: String, detail: String },

    #[error("startup halted: manager `{manager}` did not come up")]
    Halted { manager: String },
}

impl DataError {
    /// Wrap a driver error as a query-execution failure
    pub fn execution(err: impl std::fmt::Display) -> Self {
        DataError::QueryExecution {
            detail: err.to_string(),
        }
    }

    pub fn mapping(table: &str, column: &str, detail: impl std::fmt::Display) -> Self {
        DataError::RowMapping {
            table: table.to_string(),
            column: column.to_string(),
            detail: detail.to_string(),
        }
    }
}
