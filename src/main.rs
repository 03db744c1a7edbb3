//! Demo boot binary
//!
//! Opens (or creates) the configured database, boots every catalog manager
//! in dependency order, and prints a catalog summary.

use tracing::info;
use tracing_subscriber::EnvFilter;

use realm_server_data::{GameData, StorageConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = StorageConfig::from_env();
    if let Some(dir) = std::path::Path::new(&config.database_path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let data = GameData::new(config);
    data.boot().await?;

    info!(
        accounts = data.accounts.accounts().len(),
        resource_templates = data.resources.templates().len(),
        item_templates = data.items.template_count(),
        items = data.items.item_count(),
        characters = data.characters.characters().len(),
        recipes = data.crafting.recipes().len(),
        "realm data layer ready"
    );
    Ok(())
}
