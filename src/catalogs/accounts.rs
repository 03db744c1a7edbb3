//! Account catalog manager
//!
//! Plain local account rows. The external identity provider integration is
//! permanently disabled; nothing here talks to it.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::db::{Row, TableSchema};
use crate::error::DataError;
use crate::manager::{
    map_rows, Catalog, CatalogEntry, DatabaseManager, ManagedSystem, ManagerCore,
};

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Account {
    fn from_row(row: &Row) -> Result<Self, DataError> {
        let id = row
            .id("id")
            .ok_or_else(|| DataError::mapping("accounts", "id", "missing or invalid ID"))?;
        Ok(Self {
            id,
            name: row.text_or("name", ""),
            created_at: row.timestamp("created_at"),
        })
    }
}

impl CatalogEntry for Account {
    fn id(&self) -> i64 {
        self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
}

fn accounts_schema() -> TableSchema {
    TableSchema::new("accounts")
        .column("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
        .column("name", "TEXT NOT NULL DEFAULT ''")
        .column("created_at", "DATETIME DEFAULT CURRENT_TIMESTAMP")
}

pub struct AccountManager {
    core: ManagerCore,
    accounts: RwLock<Catalog<Account>>,
}

impl AccountManager {
    pub fn new(database: Arc<DatabaseManager>) -> Arc<Self> {
        Arc::new(Self {
            core: ManagerCore::new("accounts", Some(database)),
            accounts: RwLock::new(Catalog::new()),
        })
    }

    fn guard(&self, request: &str) -> bool {
        if !self.core.is_initialized() {
            warn!(manager = "accounts", request, "catalog queried before initialization");
            return false;
        }
        true
    }

    pub fn account(&self, id: i64) -> Option<Arc<Account>> {
        if !self.guard("account") {
            return None;
        }
        self.accounts.read().get(id)
    }

    pub fn account_by_name(&self, name: &str) -> Option<Arc<Account>> {
        if !self.guard("account_by_name") {
            return None;
        }
        self.accounts.read().get_by_name(name)
    }

    pub fn accounts(&self) -> Vec<Arc<Account>> {
        if !self.guard("accounts") {
            return Vec::new();
        }
        self.accounts.read().all()
    }

    pub async fn create_account(&self, name: &str) -> Option<Arc<Account>> {
        if !self.guard("create_account") {
            return None;
        }
        let row = Row::new().with("name", name);
        let id = self.core.insert_row("accounts", &row).await?;
        let account = Arc::new(Account {
            id,
            name: name.to_string(),
            created_at: None,
        });
        self.accounts.write().insert(Arc::clone(&account));
        info!(id, name, "account created");
        Some(account)
    }

    pub async fn delete_account(&self, id: i64) -> bool {
        if !self.guard("delete_account") {
            return false;
        }
        if !self
            .core
            .delete_rows("accounts", "id = ?", &[id.into()])
            .await
        {
            return false;
        }
        self.accounts.write().remove(id);
        true
    }
}

#[async_trait]
impl ManagedSystem for AccountManager {
    fn core(&self) -> &ManagerCore {
        &self.core
    }

    async fn initialize(self: Arc<Self>) -> Result<(), DataError> {
        let schema = accounts_schema();
        if !self.core.ensure_table(&schema).await {
            return Err(DataError::Schema {
                table: schema.table().to_string(),
                detail: "table could not be ensured".to_string(),
            });
        }

        let rows = self
            .core
            .query_rows("SELECT * FROM accounts ORDER BY id", &[])
            .await
            .ok_or_else(|| DataError::QueryExecution {
                detail: "account load failed".to_string(),
            })?;
        let accounts = map_rows("accounts", &rows, Account::from_row);
        {
            let mut catalog = self.accounts.write();
            catalog.clear();
            for account in accounts {
                catalog.insert(Arc::new(account));
            }
        }

        info!(accounts = self.accounts.read().len(), "account catalog loaded");
        self.core.notify_data_loaded();
        Ok(())
    }
}
