//! Integration tests for the manager lifecycle, catalogs, and orchestrator
//!
//! Covers the full flow: boot → create templates/instances → reload from
//! storage → linked in-memory catalogs, plus the lifecycle and fail-fast
//! guarantees.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use realm_server_data::{
    start_initialization, BootState, DataError, GameData, ManagedSystem, ManagerCore,
    ManagerState, Orchestrator, StorageConfig,
};

fn test_config(dir: &TempDir) -> StorageConfig {
    let path = dir.path().join("realm.db");
    StorageConfig::with_path(path.to_str().expect("utf-8 temp path"))
}

async fn booted(dir: &TempDir) -> GameData {
    let data = GameData::new(test_config(dir));
    data.boot().await.expect("boot should succeed");
    data
}

// ============================================================================
// Boot and end-to-end catalog scenarios
// ============================================================================

#[tokio::test]
async fn boot_brings_every_manager_ready() {
    let dir = TempDir::new().unwrap();
    let data = booted(&dir).await;

    assert!(data.is_ready());
    assert_eq!(data.orchestrator.state(), BootState::Completed);
    assert!(data.database.is_initialized());
    assert!(data.accounts.is_initialized());
    assert!(data.resources.is_initialized());
    assert!(data.items.is_initialized());
    assert!(data.characters.is_initialized());
    assert!(data.inventory.is_initialized());
    assert!(data.crafting.is_initialized());
}

#[tokio::test]
async fn template_and_instance_survive_reload_with_link_resolved() {
    let dir = TempDir::new().unwrap();

    let (template_id, item_id) = {
        let data = booted(&dir).await;
        let template = data
            .items
            .create_template("iron_sword", "main_hand", 10.0, 0.0, 1, 25)
            .await
            .expect("template create");
        let item = data
            .items
            .create_item(template.id, 1)
            .await
            .expect("item create");
        assert_eq!(item.template.as_ref().unwrap().id, template.id);
        (template.id, item.id)
    };

    // Fresh process: reload everything from storage
    let data = booted(&dir).await;
    let item = data.items.item(item_id).expect("item should reload");
    let linked = item.template.as_ref().expect("link should resolve");
    assert_eq!(linked.id, template_id);
    assert_eq!(linked.damage, 10.0);
    assert_eq!(linked.name, "iron_sword");
}

#[tokio::test]
async fn instance_with_missing_template_stays_loaded_unlinked() {
    let dir = TempDir::new().unwrap();

    let item_id = {
        let data = booted(&dir).await;
        let item = data.items.create_item(999, 1).await.expect("item create");
        assert!(item.template.is_none());
        item.id
    };

    let data = booted(&dir).await;
    let item = data
        .items
        .item(item_id)
        .expect("orphaned instance must still be present");
    assert!(item.template.is_none());
    assert_eq!(item.template_id, 999);
}

#[tokio::test]
async fn deleting_a_template_orphans_instances_without_cascade() {
    let dir = TempDir::new().unwrap();
    let data = booted(&dir).await;

    let template = data
        .items
        .create_template("plank", "none", 0.0, 0.0, 50, 1)
        .await
        .unwrap();
    let item = data.items.create_item(template.id, 10).await.unwrap();

    assert!(data.items.delete_template(template.id).await);
    assert!(data.items.template(template.id).is_none());
    assert!(
        data.items.item(item.id).is_some(),
        "instances are orphaned, not cascade-deleted"
    );

    // After reload the orphan re-links to nothing
    let data = booted(&dir).await;
    let item = data.items.item(item.id).unwrap();
    assert!(item.template.is_none());
}

#[tokio::test]
async fn character_inventory_and_crafting_link_across_managers() {
    let dir = TempDir::new().unwrap();

    let (char_id, slot_id, recipe_id) = {
        let data = booted(&dir).await;
        let account = data.accounts.create_account("otto").await.unwrap();
        let character = data
            .characters
            .create_character(account.id, "Brann")
            .await
            .unwrap();
        assert_eq!(character.account.as_ref().unwrap().id, account.id);

        let ore = data
            .resources
            .create_template("iron_ore", "mining", 3.0, 2)
            .await
            .unwrap();
        let node = data
            .resources
            .create_node(ore.id, (10.0, 0.0, -4.5), 5, 60.0)
            .await
            .unwrap();
        assert_eq!(node.template.as_ref().unwrap().name, "iron_ore");

        let sword = data
            .items
            .create_template("iron_sword", "main_hand", 10.0, 0.0, 1, 25)
            .await
            .unwrap();
        let ingot = data
            .items
            .create_template("iron_ingot", "none", 0.0, 0.0, 20, 2)
            .await
            .unwrap();
        let item = data.items.create_item(sword.id, 1).await.unwrap();

        let slot = data
            .inventory
            .add_slot(character.id, item.id, 0, 1)
            .await
            .unwrap();
        assert_eq!(slot.item.as_ref().unwrap().id, item.id);

        let recipe = data
            .crafting
            .create_recipe("forge_iron_sword", sword.id, 1, 12.0)
            .await
            .unwrap();
        data.crafting
            .add_ingredient(recipe.id, ingot.id, 3)
            .await
            .unwrap();

        (character.id, slot.id, recipe.id)
    };

    let data = booted(&dir).await;

    let slots = data.inventory.slots_for_character(char_id);
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].id, slot_id);
    let held = slots[0].item.as_ref().expect("slot item link");
    assert_eq!(held.template.as_ref().unwrap().name, "iron_sword");

    let recipe = data.crafting.recipe(recipe_id).expect("recipe reload");
    assert_eq!(recipe.output.as_ref().unwrap().name, "iron_sword");
    let ingredients = data.crafting.ingredients_for(recipe_id);
    assert_eq!(ingredients.len(), 1);
    assert_eq!(ingredients[0].quantity, 3);
    assert_eq!(
        ingredients[0].ingredient.as_ref().unwrap().name,
        "iron_ingot"
    );
}

#[tokio::test]
async fn updating_a_deleted_entity_fails_without_a_phantom_entry() {
    let dir = TempDir::new().unwrap();
    let data = booted(&dir).await;

    let template = data
        .items
        .create_template("torch", "off_hand", 0.0, 0.0, 10, 1)
        .await
        .unwrap();
    let item = data.items.create_item(template.id, 1).await.unwrap();
    let mut stale = (*item).clone();
    assert!(data.items.delete_item(item.id).await);

    stale.quantity = 5;
    assert!(
        !data.items.update_item(stale).await,
        "updating a deleted item must fail"
    );
    assert!(
        data.items.item(item.id).is_none(),
        "a failed update must not resurrect the catalog entry"
    );

    let account = data.accounts.create_account("mira").await.unwrap();
    let character = data
        .characters
        .create_character(account.id, "Sigrun")
        .await
        .unwrap();
    let mut stale = (*character).clone();
    assert!(data.characters.delete_character(character.id).await);

    stale.level = 2;
    assert!(!data.characters.update_character(stale).await);
    assert!(data.characters.character(character.id).is_none());
}

#[tokio::test]
async fn getters_before_readiness_return_safe_empties() {
    let dir = TempDir::new().unwrap();
    let data = GameData::new(test_config(&dir));

    // Never booted: every getter must degrade, not panic
    assert!(!data.is_ready());
    assert!(data.items.template(1).is_none());
    assert!(data.items.templates().is_empty());
    assert_eq!(data.items.template_count(), 0);
    assert_eq!(data.items.item_count(), 0);
    assert!(data.characters.character_by_name("Brann").is_none());
    assert!(data.inventory.slots_for_character(1).is_empty());
    assert!(data.items.create_item(1, 1).await.is_none());
}

// ============================================================================
// Lifecycle guarantees (stub managers)
// ============================================================================

struct StubManager {
    core: ManagerCore,
    runs: AtomicU32,
    fail: bool,
}

impl StubManager {
    fn new(name: &'static str, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            core: ManagerCore::new(name, None),
            runs: AtomicU32::new(0),
            fail,
        })
    }

    fn runs(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManagedSystem for StubManager {
    fn core(&self) -> &ManagerCore {
        &self.core
    }

    async fn initialize(self: Arc<Self>) -> Result<(), DataError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        if self.fail {
            return Err(DataError::ManagerInit {
                manager: self.core.name().to_string(),
                detail: "stubbed fault".to_string(),
            });
        }
        self.core.notify_data_loaded();
        Ok(())
    }
}

#[tokio::test]
async fn start_while_initializing_is_a_no_op() {
    let stub = StubManager::new("alpha", false);

    start_initialization(&stub);
    assert_eq!(stub.core().state(), ManagerState::Initializing);
    start_initialization(&stub); // redundant call while in flight

    assert!(stub.core().ready().await);
    assert!(stub.is_initialized());
    assert_eq!(stub.runs(), 1, "redundant start must not launch a second run");
}

#[tokio::test]
async fn failed_initialization_records_fault_and_allows_restart() {
    let stub = StubManager::new("beta", true);

    start_initialization(&stub);
    assert!(!stub.core().ready().await);
    assert!(!stub.is_initialized());
    assert_eq!(stub.core().state(), ManagerState::Failed);
    assert!(stub
        .core()
        .last_fault()
        .unwrap()
        .contains("stubbed fault"));

    // A completed (failed) run may be restarted from outside
    start_initialization(&stub);
    assert!(!stub.core().ready().await);
    assert_eq!(stub.runs(), 2);
}

#[tokio::test]
async fn data_loaded_notification_fires_and_tolerates_repeats() {
    let stub = StubManager::new("gamma", false);
    let mut loaded = stub.core().data_loaded();
    assert_eq!(*loaded.borrow_and_update(), 0);

    start_initialization(&stub);
    assert!(stub.core().ready().await);
    loaded.changed().await.expect("notification");
    assert_eq!(*loaded.borrow_and_update(), 1);

    stub.core().notify_data_loaded(); // repeated notify is a no-op signal
    assert_eq!(*stub.core().data_loaded().borrow(), 2);
}

// ============================================================================
// Orchestration
// ============================================================================

#[tokio::test]
async fn orchestrator_halts_on_first_failure_and_skips_the_rest() {
    let a = StubManager::new("alpha", false);
    let b = StubManager::new("beta", true);
    let c = StubManager::new("gamma", false);

    let orchestrator = Orchestrator::new(vec![
        Arc::clone(&a) as Arc<dyn ManagedSystem>,
        Arc::clone(&b) as Arc<dyn ManagedSystem>,
        Arc::clone(&c) as Arc<dyn ManagedSystem>,
    ]);

    let result = orchestrator.boot().await;
    match result {
        Err(DataError::Halted { manager }) => assert_eq!(manager, "beta"),
        other => panic!("expected halt on beta, got {other:?}"),
    }

    assert_eq!(orchestrator.state(), BootState::Halted);
    assert!(!orchestrator.is_ready());
    assert!(a.is_initialized());
    assert_eq!(c.runs(), 0, "managers after the failure must never start");
    assert_eq!(c.core().state(), ManagerState::Uninitialized);

    // A halted orchestrator is permanently disabled
    assert!(matches!(
        orchestrator.boot().await,
        Err(DataError::Halted { .. })
    ));
    assert_eq!(c.runs(), 0);
}

#[tokio::test]
async fn completed_orchestrator_ignores_repeat_boot() {
    let a = StubManager::new("alpha", false);
    let orchestrator = Orchestrator::new(vec![Arc::clone(&a) as Arc<dyn ManagedSystem>]);

    orchestrator.boot().await.expect("boot");
    assert!(orchestrator.is_ready());
    orchestrator.boot().await.expect("repeat boot is a no-op");
    assert_eq!(a.runs(), 1);
}

#[tokio::test]
async fn unreachable_database_halts_startup_before_any_catalog() {
    let config = StorageConfig {
        database_path: "/nonexistent_realm_dir/realm.db".to_string(),
        max_connections: 2,
        create_if_missing: true,
    };
    let data = GameData::new(config);

    let result = data.boot().await;
    match result {
        Err(DataError::Halted { manager }) => assert_eq!(manager, "database"),
        other => panic!("expected database halt, got {other:?}"),
    }
    assert!(!data.is_ready());
    assert!(!data.items.is_initialized());
    assert_eq!(data.items.core().state(), ManagerState::Uninitialized);
}
