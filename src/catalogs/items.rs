//! Item catalog manager
//!
//! Loads two tables: `item_templates` (base definitions shared by many
//! items) and `items` (individually identified instances carrying
//! durability / rolled-stat / quantity overrides plus a `template_id`
//! foreign key). After both loads, a linking pass resolves each instance's
//! template reference; a missing template is a data-quality warning, never
//! a load failure.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::db::{Row, TableSchema};
use crate::error::DataError;
use crate::manager::{
    map_rows, Catalog, CatalogEntry, DatabaseManager, ManagedSystem, ManagerCore,
};

// ============================================================================
// Entities
// ============================================================================

/// Base item definition, immutable once loaded
#[derive(Debug, Clone)]
pub struct ItemTemplate {
    pub id: i64,
    pub name: String,
    pub slot: String,
    pub damage: f64,
    pub armor: f64,
    pub max_stack: i64,
    pub value: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ItemTemplate {
    fn from_row(row: &Row) -> Result<Self, DataError> {
        let id = row
            .id("id")
            .ok_or_else(|| DataError::mapping("item_templates", "id", "missing or invalid ID"))?;
        Ok(Self {
            id,
            name: row.text_or("name", ""),
            slot: row.text_or("slot", ""),
            damage: row.float_or("damage", 0.0),
            armor: row.float_or("armor", 0.0),
            max_stack: row.int_or("max_stack", 1),
            value: row.int_or("value", 0),
            created_at: row.timestamp("created_at"),
        })
    }
}

impl CatalogEntry for ItemTemplate {
    fn id(&self) -> i64 {
        self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
}

/// A concrete item instance referencing its template by ID
///
/// The template link is a lookup result, not ownership: when the template is
/// absent the instance stays valid with `template == None`.
#[derive(Debug, Clone)]
pub struct ItemInstance {
    pub id: i64,
    pub template_id: i64,
    pub quantity: i64,
    pub durability: f64,
    pub bonus_damage: f64,
    pub template: Option<Arc<ItemTemplate>>,
}

impl ItemInstance {
    fn from_row(row: &Row) -> Result<Self, DataError> {
        let id = row
            .id("id")
            .ok_or_else(|| DataError::mapping("items", "id", "missing or invalid ID"))?;
        Ok(Self {
            id,
            template_id: row.int_or("template_id", 0),
            quantity: row.int_or("quantity", 1),
            durability: row.float_or("durability", 1.0),
            bonus_damage: row.float_or("bonus_damage", 0.0),
            template: None,
        })
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("template_id", self.template_id)
            .with("quantity", self.quantity)
            .with("durability", self.durability)
            .with("bonus_damage", self.bonus_damage)
    }
}

impl CatalogEntry for ItemInstance {
    fn id(&self) -> i64 {
        self.id
    }
}

// ============================================================================
// Schemas
// ============================================================================

fn templates_schema() -> TableSchema {
    TableSchema::new("item_templates")
        .column("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
        .column("name", "TEXT NOT NULL DEFAULT ''")
        .column("slot", "TEXT NOT NULL DEFAULT ''")
        .column("damage", "REAL NOT NULL DEFAULT 0")
        .column("armor", "REAL NOT NULL DEFAULT 0")
        .column("max_stack", "INTEGER NOT NULL DEFAULT 1")
        .column("value", "INTEGER NOT NULL DEFAULT 0")
        .column("created_at", "DATETIME DEFAULT CURRENT_TIMESTAMP")
}

fn items_schema() -> TableSchema {
    TableSchema::new("items")
        .column("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
        .column("template_id", "INTEGER NOT NULL")
        .column("quantity", "INTEGER NOT NULL DEFAULT 1")
        .column("durability", "REAL NOT NULL DEFAULT 1.0")
        .column("bonus_damage", "REAL NOT NULL DEFAULT 0")
}

// ============================================================================
// Manager
// ============================================================================

pub struct ItemManager {
    core: ManagerCore,
    templates: RwLock<Catalog<ItemTemplate>>,
    items: RwLock<Catalog<ItemInstance>>,
}

impl ItemManager {
    pub fn new(database: Arc<DatabaseManager>) -> Arc<Self> {
        Arc::new(Self {
            core: ManagerCore::new("items", Some(database)),
            templates: RwLock::new(Catalog::new()),
            items: RwLock::new(Catalog::new()),
        })
    }

    fn guard(&self, request: &str) -> bool {
        if !self.core.is_initialized() {
            warn!(manager = "items", request, "catalog queried before initialization");
            return false;
        }
        true
    }

    // ------------------------------------------------------------------------
    // Getters (synchronous; valid only once initialized)
    // ------------------------------------------------------------------------

    pub fn template(&self, id: i64) -> Option<Arc<ItemTemplate>> {
        if !self.guard("template") {
            return None;
        }
        self.templates.read().get(id)
    }

    pub fn template_by_name(&self, name: &str) -> Option<Arc<ItemTemplate>> {
        if !self.guard("template_by_name") {
            return None;
        }
        self.templates.read().get_by_name(name)
    }

    pub fn templates(&self) -> Vec<Arc<ItemTemplate>> {
        if !self.guard("templates") {
            return Vec::new();
        }
        self.templates.read().all()
    }

    pub fn template_count(&self) -> usize {
        if !self.guard("template_count") {
            return 0;
        }
        self.templates.read().len()
    }

    pub fn item(&self, id: i64) -> Option<Arc<ItemInstance>> {
        if !self.guard("item") {
            return None;
        }
        self.items.read().get(id)
    }

    pub fn items(&self) -> Vec<Arc<ItemInstance>> {
        if !self.guard("items") {
            return Vec::new();
        }
        self.items.read().all()
    }

    pub fn item_count(&self) -> usize {
        if !self.guard("item_count") {
            return 0;
        }
        self.items.read().len()
    }

    // ------------------------------------------------------------------------
    // Runtime mutations: database first, then in-memory sync. A failed
    // database call leaves the catalogs untouched.
    // ------------------------------------------------------------------------

    pub async fn create_template(
        &self,
        name: &str,
        slot: &str,
        damage: f64,
        armor: f64,
        max_stack: i64,
        value: i64,
    ) -> Option<Arc<ItemTemplate>> {
        if !self.guard("create_template") {
            return None;
        }
        let row = Row::new()
            .with("name", name)
            .with("slot", slot)
            .with("damage", damage)
            .with("armor", armor)
            .with("max_stack", max_stack)
            .with("value", value);
        let id = self.core.insert_row("item_templates", &row).await?;
        let template = Arc::new(ItemTemplate {
            id,
            name: name.to_string(),
            slot: slot.to_string(),
            damage,
            armor,
            max_stack,
            value,
            created_at: None,
        });
        self.templates.write().insert(Arc::clone(&template));
        info!(id, name, "item template created");
        Some(template)
    }

    pub async fn create_item(&self, template_id: i64, quantity: i64) -> Option<Arc<ItemInstance>> {
        if !self.guard("create_item") {
            return None;
        }
        let template = self.templates.read().get(template_id);
        if template.is_none() {
            warn!(template_id, "creating item for unknown template");
        }
        let instance = ItemInstance {
            id: 0,
            template_id,
            quantity,
            durability: 1.0,
            bonus_damage: 0.0,
            template,
        };
        let id = self.core.insert_row("items", &instance.to_row()).await?;
        let instance = Arc::new(ItemInstance { id, ..instance });
        self.items.write().insert(Arc::clone(&instance));
        Some(instance)
    }

    /// Persist changed instance fields and replace the catalog entry
    pub async fn update_item(&self, mut item: ItemInstance) -> bool {
        if !self.guard("update_item") {
            return false;
        }
        if !self.items.read().contains(item.id) {
            warn!(item_id = item.id, "update_item on unknown item instance");
            return false;
        }
        let ok = self
            .core
            .update_rows("items", &item.to_row(), "id = ?", &[item.id.into()])
            .await;
        if !ok {
            return false;
        }
        item.template = self.templates.read().get(item.template_id);
        self.items.write().insert(Arc::new(item));
        true
    }

    pub async fn delete_item(&self, id: i64) -> bool {
        if !self.guard("delete_item") {
            return false;
        }
        if !self.core.delete_rows("items", "id = ?", &[id.into()]).await {
            return false;
        }
        self.items.write().remove(id);
        true
    }

    /// Delete a template. Dependent instances are orphaned, never cascaded:
    /// they keep their resolved link until the next reload re-links them to
    /// `None`.
    pub async fn delete_template(&self, id: i64) -> bool {
        if !self.guard("delete_template") {
            return false;
        }
        if !self
            .core
            .delete_rows("item_templates", "id = ?", &[id.into()])
            .await
        {
            return false;
        }
        self.templates.write().remove(id);
        true
    }
}

#[async_trait]
impl ManagedSystem for ItemManager {
    fn core(&self) -> &ManagerCore {
        &self.core
    }

    async fn initialize(self: Arc<Self>) -> Result<(), DataError> {
        for schema in [templates_schema(), items_schema()] {
            if !self.core.ensure_table(&schema).await {
                return Err(DataError::Schema {
                    table: schema.table().to_string(),
                    detail: "table could not be ensured".to_string(),
                });
            }
        }

        let rows = self
            .core
            .query_rows("SELECT * FROM item_templates ORDER BY id", &[])
            .await
            .ok_or_else(|| DataError::QueryExecution {
                detail: "item template load failed".to_string(),
            })?;
        let templates = map_rows("item_templates", &rows, ItemTemplate::from_row);
        {
            let mut catalog = self.templates.write();
            catalog.clear();
            for template in templates {
                catalog.insert(Arc::new(template));
            }
        }

        let rows = self
            .core
            .query_rows("SELECT * FROM items ORDER BY id", &[])
            .await
            .ok_or_else(|| DataError::QueryExecution {
                detail: "item instance load failed".to_string(),
            })?;
        let instances = map_rows("items", &rows, ItemInstance::from_row);

        // Linking pass: resolve template references; misses are warnings
        {
            let templates = self.templates.read();
            let mut catalog = self.items.write();
            catalog.clear();
            for mut item in instances {
                item.template = templates.get(item.template_id);
                if item.template.is_none() {
                    warn!(
                        item_id = item.id,
                        template_id = item.template_id,
                        "item references missing template"
                    );
                }
                catalog.insert(Arc::new(item));
            }
        }

        info!(
            templates = self.templates.read().len(),
            items = self.items.read().len(),
            "item catalogs loaded"
        );
        self.core.notify_data_loaded();
        Ok(())
    }
}
