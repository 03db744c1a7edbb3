//! Crafting catalog manager
//!
//! `recipes` are templates whose output references an item template;
//! `recipe_ingredients` are the per-recipe requirement rows. Both linking
//! passes resolve against the item manager, which is why crafting boots
//! after items.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::db::{Row, TableSchema};
use crate::error::DataError;
use crate::manager::{
    map_rows, Catalog, CatalogEntry, DatabaseManager, ManagedSystem, ManagerCore,
};

use super::items::{ItemManager, ItemTemplate};

#[derive(Debug, Clone)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub output_template_id: i64,
    pub output_quantity: i64,
    pub craft_seconds: f64,
    pub output: Option<Arc<ItemTemplate>>,
}

impl Recipe {
    fn from_row(row: &Row) -> Result<Self, DataError> {
        let id = row
            .id("id")
            .ok_or_else(|| DataError::mapping("recipes", "id", "missing or invalid ID"))?;
        Ok(Self {
            id,
            name: row.text_or("name", ""),
            output_template_id: row.int_or("output_template_id", 0),
            output_quantity: row.int_or("output_quantity", 1),
            craft_seconds: row.float_or("craft_seconds", 0.0),
            output: None,
        })
    }
}

impl CatalogEntry for Recipe {
    fn id(&self) -> i64 {
        self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
}

/// One required item template (and count) for a recipe
#[derive(Debug, Clone)]
pub struct RecipeIngredient {
    pub id: i64,
    pub recipe_id: i64,
    pub item_template_id: i64,
    pub quantity: i64,
    pub ingredient: Option<Arc<ItemTemplate>>,
}

impl RecipeIngredient {
    fn from_row(row: &Row) -> Result<Self, DataError> {
        let id = row.id("id").ok_or_else(|| {
            DataError::mapping("recipe_ingredients", "id", "missing or invalid ID")
        })?;
        Ok(Self {
            id,
            recipe_id: row.int_or("recipe_id", 0),
            item_template_id: row.int_or("item_template_id", 0),
            quantity: row.int_or("quantity", 1),
            ingredient: None,
        })
    }
}

impl CatalogEntry for RecipeIngredient {
    fn id(&self) -> i64 {
        self.id
    }
}

fn recipes_schema() -> TableSchema {
    TableSchema::new("recipes")
        .column("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
        .column("name", "TEXT NOT NULL DEFAULT ''")
        .column("output_template_id", "INTEGER NOT NULL")
        .column("output_quantity", "INTEGER NOT NULL DEFAULT 1")
        .column("craft_seconds", "REAL NOT NULL DEFAULT 0")
}

fn ingredients_schema() -> TableSchema {
    TableSchema::new("recipe_ingredients")
        .column("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
        .column("recipe_id", "INTEGER NOT NULL")
        .column("item_template_id", "INTEGER NOT NULL")
        .column("quantity", "INTEGER NOT NULL DEFAULT 1")
}

pub struct CraftingManager {
    core: ManagerCore,
    items: Arc<ItemManager>,
    recipes: RwLock<Catalog<Recipe>>,
    ingredients: RwLock<Catalog<RecipeIngredient>>,
}

impl CraftingManager {
    pub fn new(database: Arc<DatabaseManager>, items: Arc<ItemManager>) -> Arc<Self> {
        Arc::new(Self {
            core: ManagerCore::new("crafting", Some(database)),
            items,
            recipes: RwLock::new(Catalog::new()),
            ingredients: RwLock::new(Catalog::new()),
        })
    }

    fn guard(&self, request: &str) -> bool {
        if !self.core.is_initialized() {
            warn!(manager = "crafting", request, "catalog queried before initialization");
            return false;
        }
        true
    }

    pub fn recipe(&self, id: i64) -> Option<Arc<Recipe>> {
        if !self.guard("recipe") {
            return None;
        }
        self.recipes.read().get(id)
    }

    pub fn recipe_by_name(&self, name: &str) -> Option<Arc<Recipe>> {
        if !self.guard("recipe_by_name") {
            return None;
        }
        self.recipes.read().get_by_name(name)
    }

    pub fn recipes(&self) -> Vec<Arc<Recipe>> {
        if !self.guard("recipes") {
            return Vec::new();
        }
        self.recipes.read().all()
    }

    /// Requirement rows for one recipe, in load order
    pub fn ingredients_for(&self, recipe_id: i64) -> Vec<Arc<RecipeIngredient>> {
        if !self.guard("ingredients_for") {
            return Vec::new();
        }
        self.ingredients
            .read()
            .all()
            .into_iter()
            .filter(|i| i.recipe_id == recipe_id)
            .collect()
    }

    pub async fn create_recipe(
        &self,
        name: &str,
        output_template_id: i64,
        output_quantity: i64,
        craft_seconds: f64,
    ) -> Option<Arc<Recipe>> {
        if !self.guard("create_recipe") {
            return None;
        }
        let output = self.items.template(output_template_id);
        if output.is_none() {
            warn!(output_template_id, "recipe output references unknown item template");
        }
        let row = Row::new()
            .with("name", name)
            .with("output_template_id", output_template_id)
            .with("output_quantity", output_quantity)
            .with("craft_seconds", craft_seconds);
        let id = self.core.insert_row("recipes", &row).await?;
        let recipe = Arc::new(Recipe {
            id,
            name: name.to_string(),
            output_template_id,
            output_quantity,
            craft_seconds,
            output,
        });
        self.recipes.write().insert(Arc::clone(&recipe));
        info!(id, name, "recipe created");
        Some(recipe)
    }

    pub async fn add_ingredient(
        &self,
        recipe_id: i64,
        item_template_id: i64,
        quantity: i64,
    ) -> Option<Arc<RecipeIngredient>> {
        if !self.guard("add_ingredient") {
            return None;
        }
        if self.recipes.read().get(recipe_id).is_none() {
            warn!(recipe_id, "adding ingredient to unknown recipe");
        }
        let ingredient = self.items.template(item_template_id);
        if ingredient.is_none() {
            warn!(item_template_id, "ingredient references unknown item template");
        }
        let row = Row::new()
            .with("recipe_id", recipe_id)
            .with("item_template_id", item_template_id)
            .with("quantity", quantity);
        let id = self.core.insert_row("recipe_ingredients", &row).await?;
        let ingredient = Arc::new(RecipeIngredient {
            id,
            recipe_id,
            item_template_id,
            quantity,
            ingredient,
        });
        self.ingredients.write().insert(Arc::clone(&ingredient));
        Some(ingredient)
    }

    /// Delete a recipe row. Its ingredient rows are orphaned, not cascaded.
    pub async fn delete_recipe(&self, id: i64) -> bool {
        if !self.guard("delete_recipe") {
            return false;
        }
        if !self.core.delete_rows("recipes", "id = ?", &[id.into()]).await {
            return false;
        }
        self.recipes.write().remove(id);
        true
    }
}

#[async_trait]
impl ManagedSystem for CraftingManager {
    fn core(&self) -> &ManagerCore {
        &self.core
    }

    async fn initialize(self: Arc<Self>) -> Result<(), DataError> {
        for schema in [recipes_schema(), ingredients_schema()] {
            if !self.core.ensure_table(&schema).await {
                return Err(DataError::Schema {
                    table: schema.table().to_string(),
                    detail: "table could not be ensured".to_string(),
                });
            }
        }

        let rows = self
            .core
            .query_rows("SELECT * FROM recipes ORDER BY id", &[])
            .await
            .ok_or_else(|| DataError::QueryExecution {
                detail: "recipe load failed".to_string(),
            })?;
        let recipes = map_rows("recipes", &rows, Recipe::from_row);
        {
            let mut catalog = self.recipes.write();
            catalog.clear();
            for mut recipe in recipes {
                recipe.output = self.items.template(recipe.output_template_id);
                if recipe.output.is_none() {
                    warn!(
                        recipe_id = recipe.id,
                        output_template_id = recipe.output_template_id,
                        "recipe output references missing item template"
                    );
                }
                catalog.insert(Arc::new(recipe));
            }
        }

        let rows = self
            .core
            .query_rows("SELECT * FROM recipe_ingredients ORDER BY id", &[])
            .await
            .ok_or_else(|| DataError::QueryExecution {
                detail: "recipe ingredient load failed".to_string(),
            })?;
        let ingredients = map_rows("recipe_ingredients", &rows, RecipeIngredient::from_row);
        {
            let mut catalog = self.ingredients.write();
            catalog.clear();
            for mut row in ingredients {
                row.ingredient = self.items.template(row.item_template_id);
                if row.ingredient.is_none() {
                    warn!(
                        ingredient_id = row.id,
                        item_template_id = row.item_template_id,
                        "ingredient references missing item template"
                    );
                }
                catalog.insert(Arc::new(row));
            }
        }

        info!(
            recipes = self.recipes.read().len(),
            ingredients = self.ingredients.read().len(),
            "crafting catalogs loaded"
        );
        self.core.notify_data_loaded();
        Ok(())
    }
}
