//! Concrete catalog managers
//!
//! Each manager is one parameterization of the bootstrap-and-catalog
//! pattern: declare schemas, bulk load, map rows to typed entities, link
//! foreign keys in memory, publish readiness.

pub mod accounts;
pub mod characters;
pub mod crafting;
pub mod inventory;
pub mod items;
pub mod resources;

pub use accounts::{Account, AccountManager};
pub use characters::{Character, CharacterManager};
pub use crafting::{CraftingManager, Recipe, RecipeIngredient};
pub use inventory::{InventoryManager, InventorySlot};
pub use items::{ItemInstance, ItemManager, ItemTemplate};
pub use resources::{ResourceManager, ResourceNode, ResourceTemplate};
