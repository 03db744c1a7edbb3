//! Character catalog manager
//!
//! Characters are instances without a template table; the linking pass
//! resolves their owning account instead. An unknown account is a
//! data-quality warning, not a load failure.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::db::{Row, TableSchema};
use crate::error::DataError;
use crate::manager::{
    map_rows, Catalog, CatalogEntry, DatabaseManager, ManagedSystem, ManagerCore,
};

use super::accounts::{Account, AccountManager};

#[derive(Debug, Clone)]
pub struct Character {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub level: i64,
    pub health: f64,
    pub max_health: f64,
    pub pos_x: f64,
    pub pos_y: f64,
    pub pos_z: f64,
    pub last_seen: Option<chrono::DateTime<chrono::Utc>>,
    pub account: Option<Arc<Account>>,
}

impl Character {
    fn from_row(row: &Row) -> Result<Self, DataError> {
        let id = row
            .id("id")
            .ok_or_else(|| DataError::mapping("characters", "id", "missing or invalid ID"))?;
        Ok(Self {
            id,
            account_id: row.int_or("account_id", 0),
            name: row.text_or("name", ""),
            level: row.int_or("level", 1),
            health: row.float_or("health", 100.0),
            max_health: row.float_or("max_health", 100.0),
            pos_x: row.float_or("pos_x", 0.0),
            pos_y: row.float_or("pos_y", 0.0),
            pos_z: row.float_or("pos_z", 0.0),
            last_seen: row.timestamp("last_seen"),
            account: None,
        })
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("account_id", self.account_id)
            .with("name", self.name.as_str())
            .with("level", self.level)
            .with("health", self.health)
            .with("max_health", self.max_health)
            .with("pos_x", self.pos_x)
            .with("pos_y", self.pos_y)
            .with("pos_z", self.pos_z)
    }
}

impl CatalogEntry for Character {
    fn id(&self) -> i64 {
        self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
}

fn characters_schema() -> TableSchema {
    TableSchema::new("characters")
        .column("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
        .column("account_id", "INTEGER NOT NULL")
        .column("name", "TEXT NOT NULL DEFAULT ''")
        .column("level", "INTEGER NOT NULL DEFAULT 1")
        .column("health", "REAL NOT NULL DEFAULT 100")
        .column("max_health", "REAL NOT NULL DEFAULT 100")
        .column("pos_x", "REAL NOT NULL DEFAULT 0")
        .column("pos_y", "REAL NOT NULL DEFAULT 0")
        .column("pos_z", "REAL NOT NULL DEFAULT 0")
        .column("last_seen", "DATETIME")
}

pub struct CharacterManager {
    core: ManagerCore,
    accounts: Arc<AccountManager>,
    characters: RwLock<Catalog<Character>>,
}

impl CharacterManager {
    pub fn new(database: Arc<DatabaseManager>, accounts: Arc<AccountManager>) -> Arc<Self> {
        Arc::new(Self {
            core: ManagerCore::new("characters", Some(database)),
            accounts,
            characters: RwLock::new(Catalog::new()),
        })
    }

    fn guard(&self, request: &str) -> bool {
        if !self.core.is_initialized() {
            warn!(manager = "characters", request, "catalog queried before initialization");
            return false;
        }
        true
    }

    pub fn character(&self, id: i64) -> Option<Arc<Character>> {
        if !self.guard("character") {
            return None;
        }
        self.characters.read().get(id)
    }

    pub fn character_by_name(&self, name: &str) -> Option<Arc<Character>> {
        if !self.guard("character_by_name") {
            return None;
        }
        self.characters.read().get_by_name(name)
    }

    pub fn characters(&self) -> Vec<Arc<Character>> {
        if !self.guard("characters") {
            return Vec::new();
        }
        self.characters.read().all()
    }

    pub fn characters_for_account(&self, account_id: i64) -> Vec<Arc<Character>> {
        if !self.guard("characters_for_account") {
            return Vec::new();
        }
        self.characters
            .read()
            .all()
            .into_iter()
            .filter(|c| c.account_id == account_id)
            .collect()
    }

    pub async fn create_character(&self, account_id: i64, name: &str) -> Option<Arc<Character>> {
        if !self.guard("create_character") {
            return None;
        }
        let account = self.accounts.account(account_id);
        if account.is_none() {
            warn!(account_id, "creating character for unknown account");
        }
        let character = Character {
            id: 0,
            account_id,
            name: name.to_string(),
            level: 1,
            health: 100.0,
            max_health: 100.0,
            pos_x: 0.0,
            pos_y: 0.0,
            pos_z: 0.0,
            last_seen: None,
            account,
        };
        let id = self
            .core
            .insert_row("characters", &character.to_row())
            .await?;
        let character = Arc::new(Character { id, ..character });
        self.characters.write().insert(Arc::clone(&character));
        info!(id, name, "character created");
        Some(character)
    }

    /// Persist changed character fields and replace the catalog entry
    pub async fn update_character(&self, mut character: Character) -> bool {
        if !self.guard("update_character") {
            return false;
        }
        if !self.characters.read().contains(character.id) {
            warn!(character_id = character.id, "update_character on unknown character");
            return false;
        }
        let ok = self
            .core
            .update_rows(
                "characters",
                &character.to_row(),
                "id = ?",
                &[character.id.into()],
            )
            .await;
        if !ok {
            return false;
        }
        character.account = self.accounts.account(character.account_id);
        self.characters.write().insert(Arc::new(character));
        true
    }

    pub async fn delete_character(&self, id: i64) -> bool {
        if !self.guard("delete_character") {
            return false;
        }
        if !self
            .core
            .delete_rows("characters", "id = ?", &[id.into()])
            .await
        {
            return false;
        }
        self.characters.write().remove(id);
        true
    }
}

#[async_trait]
impl ManagedSystem for CharacterManager {
    fn core(&self) -> &ManagerCore {
        &self.core
    }

    async fn initialize(self: Arc<Self>) -> Result<(), DataError> {
        let schema = characters_schema();
        if !self.core.ensure_table(&schema).await {
            return Err(DataError::Schema {
                table: schema.table().to_string(),
                detail: "table could not be ensured".to_string(),
            });
        }

        let rows = self
            .core
            .query_rows("SELECT * FROM characters ORDER BY id", &[])
            .await
            .ok_or_else(|| DataError::QueryExecution {
                detail: "character load failed".to_string(),
            })?;
        let characters = map_rows("characters", &rows, Character::from_row);

        {
            let mut catalog = self.characters.write();
            catalog.clear();
            for mut character in characters {
                character.account = self.accounts.account(character.account_id);
                if character.account.is_none() {
                    warn!(
                        character_id = character.id,
                        account_id = character.account_id,
                        "character references missing account"
                    );
                }
                catalog.insert(Arc::new(character));
            }
        }

        info!(
            characters = self.characters.read().len(),
            "character catalog loaded"
        );
        self.core.notify_data_loaded();
        Ok(())
    }
}
