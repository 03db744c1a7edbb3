//! Initialization orchestrator
//!
//! Boots the managers in a fixed dependency order and halts the whole
//! startup on the first failure. There is no partial-startup mode: a system
//! with even one failed manager is fully down, and a halted orchestrator
//! stays disabled until the process restarts.
//!
//! Order: database → accounts → resources → items (recipes resolve against
//! them) → characters → inventory (characters + items) → crafting (items).

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::catalogs::{
    AccountManager, CharacterManager, CraftingManager, InventoryManager, ItemManager,
    ResourceManager,
};
use crate::config::StorageConfig;
use crate::error::DataError;
use crate::manager::{start_initialization, DatabaseManager, ManagedSystem};

/// Orchestrator lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    NotStarted,
    Running,
    Completed,
    Halted,
}

pub struct Orchestrator {
    state: watch::Sender<BootState>,
    managers: Vec<Arc<dyn ManagedSystem>>,
}

impl Orchestrator {
    /// Build from a hand-ordered manager sequence
    pub fn new(managers: Vec<Arc<dyn ManagedSystem>>) -> Self {
        let (state, _) = watch::channel(BootState::NotStarted);
        Self { state, managers }
    }

    pub fn state(&self) -> BootState {
        *self.state.borrow()
    }

    /// The single system-ready flag gating gameplay logic
    pub fn is_ready(&self) -> bool {
        self.state() == BootState::Completed
    }

    /// Observe state transitions (e.g. gameplay bootstrap waiting for ready)
    pub fn watch(&self) -> watch::Receiver<BootState> {
        self.state.subscribe()
    }

    /// Start every manager in order, awaiting each one's readiness
    ///
    /// Fail-fast: the first manager that does not come up halts the
    /// sequence; later managers are never started. A halted orchestrator
    /// refuses further boots.
    pub async fn boot(&self) -> Result<(), DataError> {
        let mut proceed = false;
        self.state.send_if_modified(|state| {
            if *state == BootState::NotStarted {
                *state = BootState::Running;
                proceed = true;
                true
            } else {
                false
            }
        });
        if !proceed {
            return match self.state() {
                BootState::Halted => Err(DataError::Halted {
                    manager: "orchestrator".to_string(),
                }),
                _ => {
                    warn!("boot already in progress or complete, ignoring");
                    Ok(())
                }
            };
        }

        for manager in &self.managers {
            let name = manager.name();
            start_initialization(manager);
            let came_up = manager.core().ready().await;
            if !came_up || !manager.is_initialized() {
                error!(
                    manager = name,
                    fault = manager.core().last_fault().as_deref().unwrap_or("unknown"),
                    "manager failed to initialize, halting startup"
                );
                self.state.send_replace(BootState::Halted);
                return Err(DataError::Halted {
                    manager: name.to_string(),
                });
            }
        }

        self.state.send_replace(BootState::Completed);
        info!(managers = self.managers.len(), "all managers ready");
        Ok(())
    }
}

/// Composition root: every manager, wired with explicit dependencies, plus
/// the orchestrator that owns their startup order
pub struct GameData {
    pub database: Arc<DatabaseManager>,
    pub accounts: Arc<AccountManager>,
    pub resources: Arc<ResourceManager>,
    pub items: Arc<ItemManager>,
    pub characters: Arc<CharacterManager>,
    pub inventory: Arc<InventoryManager>,
    pub crafting: Arc<CraftingManager>,
    pub orchestrator: Orchestrator,
}

impl GameData {
    pub fn new(config: StorageConfig) -> Self {
        let database = DatabaseManager::new(config);
        let accounts = AccountManager::new(Arc::clone(&database));
        let resources = ResourceManager::new(Arc::clone(&database));
        let items = ItemManager::new(Arc::clone(&database));
        let characters = CharacterManager::new(Arc::clone(&database), Arc::clone(&accounts));
        let inventory = InventoryManager::new(
            Arc::clone(&database),
            Arc::clone(&characters),
            Arc::clone(&items),
        );
        let crafting = CraftingManager::new(Arc::clone(&database), Arc::clone(&items));

        let orchestrator = Orchestrator::new(vec![
            Arc::clone(&database) as Arc<dyn ManagedSystem>,
            Arc::clone(&accounts) as Arc<dyn ManagedSystem>,
            Arc::clone(&resources) as Arc<dyn ManagedSystem>,
            Arc::clone(&items) as Arc<dyn ManagedSystem>,
            Arc::clone(&characters) as Arc<dyn ManagedSystem>,
            Arc::clone(&inventory) as Arc<dyn ManagedSystem>,
            Arc::clone(&crafting) as Arc<dyn ManagedSystem>,
        ]);

        Self {
            database,
            accounts,
            resources,
            items,
            characters,
            inventory,
            crafting,
            orchestrator,
        }
    }

    pub async fn boot(&self) -> Result<(), DataError> {
        self.orchestrator.boot().await
    }

    pub fn is_ready(&self) -> bool {
        self.orchestrator.is_ready()
    }
}
