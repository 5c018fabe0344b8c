//! Walks a category through its lifecycle against the configured backend.
//!
//! Configuration comes from `CARTE_CONFIG` or `CARTE_*` environment
//! variables; without either, everything runs in memory.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use carte_core::logging::init_tracing;
use carte_core::{CarteConfig, CategoryImage, ImageUpload, NewCategory};
use carte_db::{Backend, InMemoryDocumentStore};
use carte_state::{CategoryChanges, CategoryManager, CategoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CarteConfig::load().context("failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging).context("failed to initialize logging")?;

    let backend = Backend::from_config(&config, Arc::new(InMemoryDocumentStore::new()))
        .context("failed to build backend")?;
    info!(
        subsystem = "demo",
        missing_name_policy = ?config.categories.missing_name_on_update,
        "Backend ready"
    );

    let store = CategoryStore::new(backend.categories.clone());
    let manager = CategoryManager::mount_with_config(store, &config.categories).await;

    let drinks = manager
        .add_category(
            NewCategory::new("Drinks")
                .with_description("Hot and cold")
                .with_image(CategoryImage::Pending(ImageUpload::new(
                    "drinks.png",
                    b"\x89PNG".to_vec(),
                ))),
        )
        .await?;
    println!("added {} ({})", drinks.name, drinks.image);

    let renamed = manager
        .update_category(&drinks.id, CategoryChanges::default().name("Beverages"))
        .await?;
    println!("renamed to {}", renamed.name);

    let removed = manager.delete_category(&renamed.id, false).await?;
    println!("deleted {}", removed);

    let state = manager.state();
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
