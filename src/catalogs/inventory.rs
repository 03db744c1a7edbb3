//! Inventory catalog manager
//!
//! `inventory_slots` ties characters to item instances. Depends on the
//! character and item managers being up: the linking pass resolves each
//! slot's item instance and sanity-checks the owning character.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::db::{Row, TableSchema};
use crate::error::DataError;
use crate::manager::{
    map_rows, Catalog, CatalogEntry, DatabaseManager, ManagedSystem, ManagerCore,
};

use super::characters::CharacterManager;
use super::items::{ItemInstance, ItemManager};

/// One inventory slot: a character holding a quantity of an item instance
#[derive(Debug, Clone)]
pub struct InventorySlot {
    pub id: i64,
    pub character_id: i64,
    pub item_id: i64,
    pub slot_index: i64,
    pub quantity: i64,
    pub item: Option<Arc<ItemInstance>>,
}

impl InventorySlot {
    fn from_row(row: &Row) -> Result<Self, DataError> {
        let id = row
            .id("id")
            .ok_or_else(|| DataError::mapping("inventory_slots", "id", "missing or invalid ID"))?;
        Ok(Self {
            id,
            character_id: row.int_or("character_id", 0),
            item_id: row.int_or("item_id", 0),
            slot_index: row.int_or("slot_index", 0),
            quantity: row.int_or("quantity", 1),
            item: None,
        })
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("character_id", self.character_id)
            .with("item_id", self.item_id)
            .with("slot_index", self.slot_index)
            .with("quantity", self.quantity)
    }
}

impl CatalogEntry for InventorySlot {
    fn id(&self) -> i64 {
        self.id
    }
}

fn slots_schema() -> TableSchema {
    TableSchema::new("inventory_slots")
        .column("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
        .column("character_id", "INTEGER NOT NULL")
        .column("item_id", "INTEGER NOT NULL")
        .column("slot_index", "INTEGER NOT NULL DEFAULT 0")
        .column("quantity", "INTEGER NOT NULL DEFAULT 1")
}

pub struct InventoryManager {
    core: ManagerCore,
    characters: Arc<CharacterManager>,
    items: Arc<ItemManager>,
    slots: RwLock<Catalog<InventorySlot>>,
}

impl InventoryManager {
    pub fn new(
        database: Arc<DatabaseManager>,
        characters: Arc<CharacterManager>,
        items: Arc<ItemManager>,
    ) -> Arc<Self> {
        Arc::new(Self {
            core: ManagerCore::new("inventory", Some(database)),
            characters,
            items,
            slots: RwLock::new(Catalog::new()),
        })
    }

    fn guard(&self, request: &str) -> bool {
        if !self.core.is_initialized() {
            warn!(manager = "inventory", request, "catalog queried before initialization");
            return false;
        }
        true
    }

    pub fn slot(&self, id: i64) -> Option<Arc<InventorySlot>> {
        if !self.guard("slot") {
            return None;
        }
        self.slots.read().get(id)
    }

    pub fn slots(&self) -> Vec<Arc<InventorySlot>> {
        if !self.guard("slots") {
            return Vec::new();
        }
        self.slots.read().all()
    }

    pub fn slots_for_character(&self, character_id: i64) -> Vec<Arc<InventorySlot>> {
        if !self.guard("slots_for_character") {
            return Vec::new();
        }
        self.slots
            .read()
            .all()
            .into_iter()
            .filter(|s| s.character_id == character_id)
            .collect()
    }

    /// Give an item instance to a character at a slot index
    pub async fn add_slot(
        &self,
        character_id: i64,
        item_id: i64,
        slot_index: i64,
        quantity: i64,
    ) -> Option<Arc<InventorySlot>> {
        if !self.guard("add_slot") {
            return None;
        }
        if self.characters.character(character_id).is_none() {
            warn!(character_id, "adding inventory slot for unknown character");
        }
        let item = self.items.item(item_id);
        if item.is_none() {
            warn!(item_id, "adding inventory slot for unknown item instance");
        }
        let slot = InventorySlot {
            id: 0,
            character_id,
            item_id,
            slot_index,
            quantity,
            item,
        };
        let id = self.core.insert_row("inventory_slots", &slot.to_row()).await?;
        let slot = Arc::new(InventorySlot { id, ..slot });
        self.slots.write().insert(Arc::clone(&slot));
        Some(slot)
    }

    pub async fn set_quantity(&self, slot_id: i64, quantity: i64) -> bool {
        if !self.guard("set_quantity") {
            return false;
        }
        let Some(existing) = self.slots.read().get(slot_id) else {
            warn!(slot_id, "set_quantity on unknown inventory slot");
            return false;
        };
        let mut updated = (*existing).clone();
        updated.quantity = quantity;
        let ok = self
            .core
            .update_rows(
                "inventory_slots",
                &updated.to_row(),
                "id = ?",
                &[slot_id.into()],
            )
            .await;
        if !ok {
            return false;
        }
        self.slots.write().insert(Arc::new(updated));
        true
    }

    pub async fn remove_slot(&self, id: i64) -> bool {
        if !self.guard("remove_slot") {
            return false;
        }
        if !self
            .core
            .delete_rows("inventory_slots", "id = ?", &[id.into()])
            .await
        {
            return false;
        }
        self.slots.write().remove(id);
        true
    }
}

#[async_trait]
impl ManagedSystem for InventoryManager {
    fn core(&self) -> &ManagerCore {
        &self.core
    }

    async fn initialize(self: Arc<Self>) -> Result<(), DataError> {
        let schema = slots_schema();
        if !self.core.ensure_table(&schema).await {
            return Err(DataError::Schema {
                table: schema.table().to_string(),
                detail: "table could not be ensured".to_string(),
            });
        }

        let rows = self
            .core
            .query_rows("SELECT * FROM inventory_slots ORDER BY id", &[])
            .await
            .ok_or_else(|| DataError::QueryExecution {
                detail: "inventory load failed".to_string(),
            })?;
        let slots = map_rows("inventory_slots", &rows, InventorySlot::from_row);

        {
            let mut catalog = self.slots.write();
            catalog.clear();
            for mut slot in slots {
                slot.item = self.items.item(slot.item_id);
                if slot.item.is_none() {
                    warn!(
                        slot_id = slot.id,
                        item_id = slot.item_id,
                        "inventory slot references missing item instance"
                    );
                }
                if self.characters.character(slot.character_id).is_none() {
                    warn!(
                        slot_id = slot.id,
                        character_id = slot.character_id,
                        "inventory slot references missing character"
                    );
                }
                catalog.insert(Arc::new(slot));
            }
        }

        info!(slots = self.slots.read().len(), "inventory catalog loaded");
        self.core.notify_data_loaded();
        Ok(())
    }
}
