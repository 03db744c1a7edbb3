//! Database manager
//!
//! First manager in the boot order. Owns the pooled `DbClient`; every other
//! manager reaches the database through it and fails fast while it is not
//! ready.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use crate::config::StorageConfig;
use crate::db::DbClient;
use crate::error::DataError;

use super::lifecycle::{ManagedSystem, ManagerCore};

pub struct DatabaseManager {
    core: ManagerCore,
    config: StorageConfig,
    client: RwLock<Option<Arc<DbClient>>>,
}

impl DatabaseManager {
    pub fn new(config: StorageConfig) -> Arc<Self> {
        Arc::new(Self {
            core: ManagerCore::new("database", None),
            config,
            client: RwLock::new(None),
        })
    }

    /// The shared client, present once initialization has connected
    pub fn client(&self) -> Option<Arc<DbClient>> {
        self.client.read().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.core.is_initialized()
    }
}

#[async_trait]
impl ManagedSystem for DatabaseManager {
    fn core(&self) -> &ManagerCore {
        &self.core
    }

    async fn initialize(self: Arc<Self>) -> Result<(), DataError> {
        let client = DbClient::connect(&self.config).await?;
        client.ping().await?;
        *self.client.write() = Some(Arc::new(client));
        info!(path = %self.config.database_path, "database connected");
        self.core.notify_data_loaded();
        Ok(())
    }
}
