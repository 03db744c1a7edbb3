//! Resource catalog manager
//!
//! `resource_templates` defines gatherable resource kinds; `resource_nodes`
//! are the world spawn points referencing a template. Same
//! template/instance load-and-link shape as the item manager.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::db::{Row, TableSchema};
use crate::error::DataError;
use crate::manager::{
    map_rows, Catalog, CatalogEntry, DatabaseManager, ManagedSystem, ManagerCore,
};

/// Gatherable resource definition
#[derive(Debug, Clone)]
pub struct ResourceTemplate {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub gather_seconds: f64,
    pub base_yield: i64,
}

impl ResourceTemplate {
    fn from_row(row: &Row) -> Result<Self, DataError> {
        let id = row.id("id").ok_or_else(|| {
            DataError::mapping("resource_templates", "id", "missing or invalid ID")
        })?;
        Ok(Self {
            id,
            name: row.text_or("name", ""),
            category: row.text_or("category", ""),
            gather_seconds: row.float_or("gather_seconds", 0.0),
            base_yield: row.int_or("base_yield", 1),
        })
    }
}

impl CatalogEntry for ResourceTemplate {
    fn id(&self) -> i64 {
        self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
}

/// A resource spawn point in the world
#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub id: i64,
    pub template_id: i64,
    pub pos_x: f64,
    pub pos_y: f64,
    pub pos_z: f64,
    pub quantity: i64,
    pub respawn_seconds: f64,
    pub template: Option<Arc<ResourceTemplate>>,
}

impl ResourceNode {
    fn from_row(row: &Row) -> Result<Self, DataError> {
        let id = row
            .id("id")
            .ok_or_else(|| DataError::mapping("resource_nodes", "id", "missing or invalid ID"))?;
        Ok(Self {
            id,
            template_id: row.int_or("template_id", 0),
            pos_x: row.float_or("pos_x", 0.0),
            pos_y: row.float_or("pos_y", 0.0),
            pos_z: row.float_or("pos_z", 0.0),
            quantity: row.int_or("quantity", 1),
            respawn_seconds: row.float_or("respawn_seconds", 0.0),
            template: None,
        })
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("template_id", self.template_id)
            .with("pos_x", self.pos_x)
            .with("pos_y", self.pos_y)
            .with("pos_z", self.pos_z)
            .with("quantity", self.quantity)
            .with("respawn_seconds", self.respawn_seconds)
    }
}

impl CatalogEntry for ResourceNode {
    fn id(&self) -> i64 {
        self.id
    }
}

fn templates_schema() -> TableSchema {
    TableSchema::new("resource_templates")
        .column("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
        .column("name", "TEXT NOT NULL DEFAULT ''")
        .column("category", "TEXT NOT NULL DEFAULT ''")
        .column("gather_seconds", "REAL NOT NULL DEFAULT 0")
        .column("base_yield", "INTEGER NOT NULL DEFAULT 1")
}

fn nodes_schema() -> TableSchema {
    TableSchema::new("resource_nodes")
        .column("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
        .column("template_id", "INTEGER NOT NULL")
        .column("pos_x", "REAL NOT NULL DEFAULT 0")
        .column("pos_y", "REAL NOT NULL DEFAULT 0")
        .column("pos_z", "REAL NOT NULL DEFAULT 0")
        .column("quantity", "INTEGER NOT NULL DEFAULT 1")
        .column("respawn_seconds", "REAL NOT NULL DEFAULT 0")
}

pub struct ResourceManager {
    core: ManagerCore,
    templates: RwLock<Catalog<ResourceTemplate>>,
    nodes: RwLock<Catalog<ResourceNode>>,
}

impl ResourceManager {
    pub fn new(database: Arc<DatabaseManager>) -> Arc<Self> {
        Arc::new(Self {
            core: ManagerCore::new("resources", Some(database)),
            templates: RwLock::new(Catalog::new()),
            nodes: RwLock::new(Catalog::new()),
        })
    }

    fn guard(&self, request: &str) -> bool {
        if !self.core.is_initialized() {
            warn!(manager = "resources", request, "catalog queried before initialization");
            return false;
        }
        true
    }

    pub fn template(&self, id: i64) -> Option<Arc<ResourceTemplate>> {
        if !self.guard("template") {
            return None;
        }
        self.templates.read().get(id)
    }

    pub fn template_by_name(&self, name: &str) -> Option<Arc<ResourceTemplate>> {
        if !self.guard("template_by_name") {
            return None;
        }
        self.templates.read().get_by_name(name)
    }

    pub fn templates(&self) -> Vec<Arc<ResourceTemplate>> {
        if !self.guard("templates") {
            return Vec::new();
        }
        self.templates.read().all()
    }

    pub fn node(&self, id: i64) -> Option<Arc<ResourceNode>> {
        if !self.guard("node") {
            return None;
        }
        self.nodes.read().get(id)
    }

    pub fn nodes(&self) -> Vec<Arc<ResourceNode>> {
        if !self.guard("nodes") {
            return Vec::new();
        }
        self.nodes.read().all()
    }

    pub async fn create_template(
        &self,
        name: &str,
        category: &str,
        gather_seconds: f64,
        base_yield: i64,
    ) -> Option<Arc<ResourceTemplate>> {
        if !self.guard("create_template") {
            return None;
        }
        let row = Row::new()
            .with("name", name)
            .with("category", category)
            .with("gather_seconds", gather_seconds)
            .with("base_yield", base_yield);
        let id = self.core.insert_row("resource_templates", &row).await?;
        let template = Arc::new(ResourceTemplate {
            id,
            name: name.to_string(),
            category: category.to_string(),
            gather_seconds,
            base_yield,
        });
        self.templates.write().insert(Arc::clone(&template));
        Some(template)
    }

    pub async fn create_node(
        &self,
        template_id: i64,
        pos: (f64, f64, f64),
        quantity: i64,
        respawn_seconds: f64,
    ) -> Option<Arc<ResourceNode>> {
        if !self.guard("create_node") {
            return None;
        }
        let template = self.templates.read().get(template_id);
        if template.is_none() {
            warn!(template_id, "creating resource node for unknown template");
        }
        let node = ResourceNode {
            id: 0,
            template_id,
            pos_x: pos.0,
            pos_y: pos.1,
            pos_z: pos.2,
            quantity,
            respawn_seconds,
            template,
        };
        let id = self.core.insert_row("resource_nodes", &node.to_row()).await?;
        let node = Arc::new(ResourceNode { id, ..node });
        self.nodes.write().insert(Arc::clone(&node));
        Some(node)
    }

    pub async fn update_node(&self, mut node: ResourceNode) -> bool {
        if !self.guard("update_node") {
            return false;
        }
        if !self.nodes.read().contains(node.id) {
            warn!(node_id = node.id, "update_node on unknown resource node");
            return false;
        }
        let ok = self
            .core
            .update_rows("resource_nodes", &node.to_row(), "id = ?", &[node.id.into()])
            .await;
        if !ok {
            return false;
        }
        node.template = self.templates.read().get(node.template_id);
        self.nodes.write().insert(Arc::new(node));
        true
    }

    pub async fn delete_node(&self, id: i64) -> bool {
        if !self.guard("delete_node") {
            return false;
        }
        if !self
            .core
            .delete_rows("resource_nodes", "id = ?", &[id.into()])
            .await
        {
            return false;
        }
        self.nodes.write().remove(id);
        true
    }
}

#[async_trait]
impl ManagedSystem for ResourceManager {
    fn core(&self) -> &ManagerCore {
        &self.core
    }

    async fn initialize(self: Arc<Self>) -> Result<(), DataError> {
        for schema in [templates_schema(), nodes_schema()] {
            if !self.core.ensure_table(&schema).await {
                return Err(DataError::Schema {
                    table: schema.table().to_string(),
                    detail: "table could not be ensured".to_string(),
                });
            }
        }

        let rows = self
            .core
            .query_rows("SELECT * FROM resource_templates ORDER BY id", &[])
            .await
            .ok_or_else(|| DataError::QueryExecution {
                detail: "resource template load failed".to_string(),
            })?;
        let templates = map_rows("resource_templates", &rows, ResourceTemplate::from_row);
        {
            let mut catalog = self.templates.write();
            catalog.clear();
            for template in templates {
                catalog.insert(Arc::new(template));
            }
        }

        let rows = self
            .core
            .query_rows("SELECT * FROM resource_nodes ORDER BY id", &[])
            .await
            .ok_or_else(|| DataError::QueryExecution {
                detail: "resource node load failed".to_string(),
            })?;
        let nodes = map_rows("resource_nodes", &rows, ResourceNode::from_row);
        {
            let templates = self.templates.read();
            let mut catalog = self.nodes.write();
            catalog.clear();
            for mut node in nodes {
                node.template = templates.get(node.template_id);
                if node.template.is_none() {
                    warn!(
                        node_id = node.id,
                        template_id = node.template_id,
                        "resource node references missing template"
                    );
                }
                catalog.insert(Arc::new(node));
            }
        }

        info!(
            templates = self.templates.read().len(),
            nodes = self.nodes.read().len(),
            "resource catalogs loaded"
        );
        self.core.notify_data_loaded();
        Ok(())
    }
}
