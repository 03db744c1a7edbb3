//! Repository client over the embedded SQLite database
//!
//! Thin wrapper around a `sqlx` connection pool. Every call checks a
//! connection out of the pool for exactly the duration of one statement, so
//! concurrent in-flight operations never share or leak connections.
//!
//! Values are always bound out-of-band; only allow-listed identifiers are
//! interpolated into SQL text.

use sqlx::sqlite::{
    SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row as SqlxRow, TypeInfo, ValueRef};
use tracing::debug;

use crate::config::StorageConfig;
use crate::error::DataError;

use super::schema::{ensure_identifier, TableSchema};
use super::value::{DbValue, Row};

/// Pooled database client
#[derive(Clone)]
pub struct DbClient {
    pool: SqlitePool,
}

impl DbClient {
    /// Open (and optionally create) the database file and build the pool
    pub async fn connect(config: &StorageConfig) -> Result<Self, DataError> {
        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(config.create_if_missing);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| DataError::ConnectionUnavailable {
                context: format!("{}: {e}", config.database_path),
            })?;

        debug!(
            path = %config.database_path,
            max_connections = config.max_connections,
            "database pool opened"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests, shared pools)
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trip a trivial statement to prove the connection works
    pub async fn ping(&self) -> Result<(), DataError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DataError::execution)?;
        Ok(())
    }

    // ========================================================================
    // Schema operations
    // ========================================================================

    pub async fn table_exists(&self, table: &str) -> Result<bool, DataError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await
        .map_err(DataError::execution)?;
        Ok(count > 0)
    }

    /// Create the table if missing. Idempotent: succeeds whether or not the
    /// table already existed.
    pub async fn create_table_if_not_exists(
        &self,
        schema: &TableSchema,
    ) -> Result<bool, DataError> {
        schema.validate()?;
        sqlx::query(&schema.create_sql())
            .execute(&self.pool)
            .await
            .map_err(|e| DataError::Schema {
                table: schema.table().to_string(),
                detail: e.to_string(),
            })?;
        debug!(table = schema.table(), "table ensured");
        Ok(true)
    }

    // ========================================================================
    // Row operations
    // ========================================================================

    /// Run a SELECT and decode every result row dynamically
    ///
    /// An execution failure is an `Err`; zero rows is an empty `Ok`.
    pub async fn query(&self, sql: &str, params: &[DbValue]) -> Result<Vec<Row>, DataError> {
        let query = bind_values(sqlx::query(sql), params);
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(DataError::execution)?;
        rows.iter().map(decode_row).collect()
    }

    /// Run a non-query statement, returning rows affected
    pub async fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, DataError> {
        let query = bind_values(sqlx::query(sql), params);
        let result = query
            .execute(&self.pool)
            .await
            .map_err(DataError::execution)?;
        Ok(result.rows_affected())
    }

    /// Insert a row, returning the generated rowid
    pub async fn insert(&self, table: &str, row: &Row) -> Result<i64, DataError> {
        ensure_identifier(table, table)?;
        for name in row.names() {
            ensure_identifier(table, name)?;
        }
        if row.is_empty() {
            return Err(DataError::execution(format!(
                "insert into `{table}` with no columns"
            )));
        }

        let columns = row.names().collect::<Vec<_>>().join(", ");
        let placeholders = vec!["?"; row.len()].join(", ");
        let sql = format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})");

        let values: Vec<DbValue> = row.values().cloned().collect();
        let query = bind_values(sqlx::query(&sql), &values);
        let result = query
            .execute(&self.pool)
            .await
            .map_err(DataError::execution)?;
        Ok(result.last_insert_rowid())
    }

    /// Update columns of rows matching `where_clause`, returning rows affected
    pub async fn update(
        &self,
        table: &str,
        row: &Row,
        where_clause: &str,
        where_params: &[DbValue],
    ) -> Result<u64, DataError> {
        ensure_identifier(table, table)?;
        for name in row.names() {
            ensure_identifier(table, name)?;
        }

        let assignments = row
            .names()
            .map(|n| format!("{n} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {table} SET {assignments} WHERE {where_clause}");

        let mut params: Vec<DbValue> = row.values().cloned().collect();
        params.extend_from_slice(where_params);
        self.execute(&sql, &params).await
    }

    /// Delete rows matching `where_clause`, returning rows affected
    pub async fn delete(
        &self,
        table: &str,
        where_clause: &str,
        params: &[DbValue],
    ) -> Result<u64, DataError> {
        ensure_identifier(table, table)?;
        let sql = format!("DELETE FROM {table} WHERE {where_clause}");
        self.execute(&sql, params).await
    }

    /// First column of the first result row as an integer
    pub async fn scalar_i64(
        &self,
        sql: &str,
        params: &[DbValue],
    ) -> Result<Option<i64>, DataError> {
        let rows = self.query(sql, params).await?;
        Ok(rows
            .first()
            .and_then(|r| r.values().next())
            .and_then(|v| match v {
                DbValue::Int(i) => Some(*i),
                DbValue::Float(f) => Some(*f as i64),
                _ => None,
            }))
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_values<'q>(mut query: SqliteQuery<'q>, params: &[DbValue]) -> SqliteQuery<'q> {
    for value in params {
        query = match value {
            DbValue::Int(v) => query.bind(*v),
            DbValue::Float(v) => query.bind(*v),
            DbValue::Text(s) => query.bind(s.clone()),
            DbValue::Bool(v) => query.bind(*v),
            DbValue::Timestamp(t) => query.bind(*t),
            DbValue::Null => query.bind(Option::<i64>::None),
        };
    }
    query
}

/// Decode one driver row into a dynamic `Row`
///
/// SQLite reports the storage class of each value, so booleans surface as
/// integers and timestamps as RFC 3339 text; the safe accessors coerce those
/// back on read.
fn decode_row(row: &SqliteRow) -> Result<Row, DataError> {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i).map_err(DataError::execution)?;
        let is_null = raw.is_null();
        let type_name = raw.type_info().name().to_string();

        let value = if is_null {
            DbValue::Null
        } else {
            match type_name.as_str() {
                "INTEGER" => DbValue::Int(row.try_get(i).map_err(DataError::execution)?),
                "REAL" | "NUMERIC" => {
                    DbValue::Float(row.try_get(i).map_err(DataError::execution)?)
                }
                "BOOLEAN" => DbValue::Bool(row.try_get(i).map_err(DataError::execution)?),
                "DATETIME" | "TIMESTAMP" | "DATE" => row
                    .try_get::<chrono::DateTime<chrono::Utc>, _>(i)
                    .map(DbValue::Timestamp)
                    .or_else(|_| {
                        row.try_get::<String, _>(i)
                            .map(DbValue::Text)
                            .map_err(DataError::execution)
                    })?,
                _ => DbValue::Text(row.try_get(i).map_err(DataError::execution)?),
            }
        };
        out.set(column.name(), value);
    }
    Ok(out)
}
