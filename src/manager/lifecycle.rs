//! Manager lifecycle base
//!
//! Every catalog manager is a `ManagedSystem`: it owns a `ManagerCore`
//! (state machine, readiness handle, data-loaded notification) and supplies
//! one async initialization routine. `start_initialization` runs that
//! routine as a supervised task and observes its outcome exactly once:
//! success marks the manager `Ready`, any fault (error return or panic)
//! marks it `Failed` with the fault recorded. There is no partial state.
//!
//! The core also carries the shared database convenience operations. Each of
//! them fails fast with a logged error when the database manager is not
//! ready, and converts client errors into `false` / `None` results —
//! database errors never escape this layer as panics or `Err`s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::db::{DbClient, DbValue, Row, TableSchema};
use crate::error::DataError;

use super::database::DatabaseManager;

/// Lifecycle states of a catalog manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Uninitialized,
    Initializing,
    /// Catalogs fully loaded and linked
    Ready,
    /// Initialization faulted; catalogs must be treated as empty
    Failed,
}

/// A manager with the bootstrap-and-catalog lifecycle
#[async_trait]
pub trait ManagedSystem: Send + Sync + 'static {
    fn core(&self) -> &ManagerCore;

    /// Manager-specific initialization: ensure tables, bulk load, link,
    /// notify. Runs under the supervisor spawned by `start_initialization`.
    async fn initialize(self: Arc<Self>) -> Result<(), DataError>;

    fn name(&self) -> &'static str {
        self.core().name()
    }

    fn is_initialized(&self) -> bool {
        self.core().is_initialized()
    }
}

/// Launch a manager's initialization routine as a supervised task
///
/// Idempotent: a call while a previous initialization is still in flight is
/// a warn-level no-op. At most one initialization runs per manager.
pub fn start_initialization<M>(manager: &Arc<M>)
where
    M: ManagedSystem + ?Sized,
{
    let core = manager.core();
    if !core.begin() {
        warn!(
            manager = core.name(),
            "initialization already in flight, ignoring start request"
        );
        return;
    }
    info!(manager = core.name(), "starting initialization");

    let manager = Arc::clone(manager);
    tokio::spawn(async move {
        // Inner spawn so a panicking routine surfaces as a JoinError
        // instead of killing the supervisor.
        let routine = tokio::spawn(Arc::clone(&manager).initialize());
        let outcome = match routine.await {
            Ok(result) => result,
            Err(join_err) => Err(DataError::ManagerInit {
                manager: manager.core().name().to_string(),
                detail: format!("initialization task aborted: {join_err}"),
            }),
        };
        manager.core().complete(outcome);
    });
}

/// Shared lifecycle state every manager embeds
pub struct ManagerCore {
    name: &'static str,
    /// Absent only for the database manager itself
    database: Option<Arc<DatabaseManager>>,
    state: watch::Sender<ManagerState>,
    initialized: AtomicBool,
    loaded: watch::Sender<u64>,
    last_fault: Mutex<Option<String>>,
}

impl ManagerCore {
    pub fn new(name: &'static str, database: Option<Arc<DatabaseManager>>) -> Self {
        let (state, _) = watch::channel(ManagerState::Uninitialized);
        let (loaded, _) = watch::channel(0u64);
        Self {
            name,
            database,
            state,
            initialized: AtomicBool::new(false),
            loaded,
            last_fault: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> ManagerState {
        *self.state.borrow()
    }

    /// Whether catalogs are safe to query
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// The fault recorded by the last failed initialization, if any
    pub fn last_fault(&self) -> Option<String> {
        self.last_fault.lock().clone()
    }

    /// Transition to `Initializing` unless one is already in flight
    pub(crate) fn begin(&self) -> bool {
        let mut started = false;
        self.state.send_if_modified(|state| {
            if *state == ManagerState::Initializing {
                false
            } else {
                *state = ManagerState::Initializing;
                started = true;
                true
            }
        });
        if started {
            self.initialized.store(false, Ordering::SeqCst);
        }
        started
    }

    /// Observe the initialization outcome (called once by the supervisor)
    pub(crate) fn complete(&self, outcome: Result<(), DataError>) {
        match outcome {
            Ok(()) => {
                self.initialized.store(true, Ordering::SeqCst);
                self.state.send_replace(ManagerState::Ready);
                info!(manager = self.name, "initialization complete");
            }
            Err(fault) => {
                self.initialized.store(false, Ordering::SeqCst);
                *self.last_fault.lock() = Some(fault.to_string());
                self.state.send_replace(ManagerState::Failed);
                error!(manager = self.name, %fault, "initialization failed");
            }
        }
    }

    /// Await the end of the current initialization
    ///
    /// Resolves `true` when the manager reaches `Ready`, `false` on `Failed`.
    pub async fn ready(&self) -> bool {
        let mut rx = self.state.subscribe();
        loop {
            match *rx.borrow_and_update() {
                ManagerState::Ready => return true,
                ManagerState::Failed => return false,
                _ => {}
            }
            if rx.changed().await.is_err() {
                return false;
            }
        }
    }

    /// Signal that all loading and linking is done
    ///
    /// Repeat notifications are tolerated; listeners see a counter bump.
    pub fn notify_data_loaded(&self) {
        self.loaded.send_modify(|n| *n += 1);
    }

    /// Subscribe to data-loaded notifications
    pub fn data_loaded(&self) -> watch::Receiver<u64> {
        self.loaded.subscribe()
    }

    // ========================================================================
    // Database convenience operations
    //
    // Fail fast when the database manager is absent or not ready; convert
    // every client error into a logged safe result.
    // ========================================================================

    fn client_or_log(&self, operation: &str, target: &str) -> Option<Arc<DbClient>> {
        let Some(db) = &self.database else {
            error!(
                manager = self.name,
                operation, target, "no database manager wired, operation dropped"
            );
            return None;
        };
        if !db.is_initialized() {
            error!(
                manager = self.name,
                operation, target, "database manager not ready, operation dropped"
            );
            return None;
        }
        match db.client() {
            Some(client) => Some(client),
            None => {
                error!(
                    manager = self.name,
                    operation, target, "database manager has no client, operation dropped"
                );
                None
            }
        }
    }

    /// Ensure a table exists; `false` on any failure
    pub async fn ensure_table(&self, schema: &TableSchema) -> bool {
        let Some(client) = self.client_or_log("ensure_table", schema.table()) else {
            return false;
        };
        match client.create_table_if_not_exists(schema).await {
            Ok(_) => true,
            Err(e) => {
                error!(manager = self.name, table = schema.table(), error = %e, "table creation failed");
                false
            }
        }
    }

    /// Insert a row, returning the generated ID; `None` on any failure
    pub async fn insert_row(&self, table: &str, row: &Row) -> Option<i64> {
        let client = self.client_or_log("insert", table)?;
        match client.insert(table, row).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!(manager = self.name, table, error = %e, "insert failed");
                None
            }
        }
    }

    /// Update rows; `false` on any failure
    pub async fn update_rows(
        &self,
        table: &str,
        row: &Row,
        where_clause: &str,
        params: &[DbValue],
    ) -> bool {
        let Some(client) = self.client_or_log("update", table) else {
            return false;
        };
        match client.update(table, row, where_clause, params).await {
            Ok(_) => true,
            Err(e) => {
                error!(manager = self.name, table, error = %e, "update failed");
                false
            }
        }
    }

    /// Delete rows; `false` on any failure
    pub async fn delete_rows(&self, table: &str, where_clause: &str, params: &[DbValue]) -> bool {
        let Some(client) = self.client_or_log("delete", table) else {
            return false;
        };
        match client.delete(table, where_clause, params).await {
            Ok(_) => true,
            Err(e) => {
                error!(manager = self.name, table, error = %e, "delete failed");
                false
            }
        }
    }

    /// Run a query; `None` signals execution failure, distinct from an
    /// empty successful result
    pub async fn query_rows(&self, sql: &str, params: &[DbValue]) -> Option<Vec<Row>> {
        let client = self.client_or_log("query", sql)?;
        match client.query(sql, params).await {
            Ok(rows) => Some(rows),
            Err(e) => {
                error!(manager = self.name, query = sql, error = %e, "query failed");
                None
            }
        }
    }
}
