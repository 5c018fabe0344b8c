//! # carte-db
//!
//! Document-store layer for the carte restaurant back-office.
//!
//! This crate provides:
//! - Repository implementations for categories and menu items
//! - Slide image, restaurant info, user and auth services
//! - In-memory document store, object storage and auth provider
//! - Filesystem object storage
//!
//! ## Example
//!
//! ```rust,ignore
//! use carte_db::{Backend, CategoryRepository, CategoryImage, NewCategory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Backend::in_memory();
//!
//!     let drinks = backend.categories.add(
//!         NewCategory::new("Drinks").with_image(CategoryImage::resolved("https://cdn/drinks.png")),
//!     ).await?;
//!
//!     println!("Created category: {}", drinks.id);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod categories;
pub mod file_storage;
pub mod images;
pub mod memory;
pub mod menu_items;
pub mod restaurant_info;
pub mod slide_images;
pub mod users;

// Always compiled so integration tests (in tests/) can use the fixtures
pub mod test_fixtures;

// Re-export core types
pub use carte_core::*;

pub use auth::AuthService;
pub use categories::DocCategoryRepository;
pub use file_storage::FilesystemStorage;
pub use memory::{InMemoryAuthProvider, InMemoryDocumentStore, InMemoryObjectStorage, StoreOp};
pub use menu_items::DocMenuItemRepository;
pub use restaurant_info::RestaurantInfoService;
pub use slide_images::SlideImageService;
pub use users::UserManager;

use std::sync::Arc;

use tracing::info;

/// Every repository and service, sharing one store and one object storage.
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn DocumentStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub categories: Arc<DocCategoryRepository>,
    pub menu_items: Arc<DocMenuItemRepository>,
    pub slide_images: Arc<SlideImageService>,
    pub restaurant_info: Arc<RestaurantInfoService>,
    pub users: Arc<UserManager>,
}

impl Backend {
    pub fn new(store: Arc<dyn DocumentStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            categories: Arc::new(DocCategoryRepository::new(store.clone(), storage.clone())),
            menu_items: Arc::new(DocMenuItemRepository::new(store.clone(), storage.clone())),
            slide_images: Arc::new(SlideImageService::new(store.clone(), storage.clone())),
            restaurant_info: Arc::new(RestaurantInfoService::new(store.clone())),
            users: Arc::new(UserManager::new(store.clone())),
            store,
            storage,
        }
    }

    /// Backend over fresh in-memory store and storage.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(InMemoryObjectStorage::default()),
        )
    }

    /// Backend over `store`, with object storage chosen by configuration:
    /// the filesystem when `storage.root` is set, in memory otherwise.
    pub fn from_config(config: &CarteConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        config.storage.validate()?;

        let storage: Arc<dyn ObjectStorage> = match config.storage.root {
            Some(_) => Arc::new(FilesystemStorage::from_config(&config.storage)?),
            None => Arc::new(InMemoryObjectStorage::new(
                config.storage.public_base_url.clone(),
            )),
        };
        info!(
            subsystem = "storage",
            filesystem = config.storage.root.is_some(),
            base_url = %config.storage.public_base_url,
            "Object storage configured"
        );

        Ok(Self::new(store, storage))
    }

    /// Authentication service over `provider`, sharing this backend's store.
    pub fn auth(&self, provider: Arc<dyn AuthProvider>) -> AuthService {
        AuthService::new(provider, self.store.clone())
    }
}
