//! Test fixtures for repository and state tests.
//!
//! Provides an in-memory backend with handles to the concrete fakes (for
//! fault injection and inspection) and a builder for seed data.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use carte_db::test_fixtures::{TestBackend, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let test = TestBackend::new();
//!     let data = TestDataBuilder::new(&test)
//!         .with_category("Drinks")
//!         .await
//!         .with_menu_item("Espresso", 0)
//!         .await
//!         .build();
//!
//!     test.store.fail_on(StoreOp::Transaction);
//!     // Run your tests...
//! }
//! ```

use std::sync::Arc;

use crate::memory::{InMemoryAuthProvider, InMemoryDocumentStore, InMemoryObjectStorage};
use crate::{
    Backend, Category, CategoryImage, CategoryRepository, MenuItem, MenuItemRepository,
    NewCategory, NewMenuItem,
};

/// Public base URL of the fake object storage.
pub const TEST_STORAGE_BASE_URL: &str = "https://storage.test/o";

/// In-memory backend plus typed handles to its fakes.
pub struct TestBackend {
    pub store: Arc<InMemoryDocumentStore>,
    pub storage: Arc<InMemoryObjectStorage>,
    pub auth: Arc<InMemoryAuthProvider>,
    pub backend: Backend,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::with_store(InMemoryDocumentStore::new())
    }

    /// Use a preconfigured store, e.g. one with latency.
    pub fn with_store(store: InMemoryDocumentStore) -> Self {
        let store = Arc::new(store);
        let storage = Arc::new(InMemoryObjectStorage::new(TEST_STORAGE_BASE_URL));
        let backend = Backend::new(store.clone(), storage.clone());
        Self {
            store,
            storage,
            auth: Arc::new(InMemoryAuthProvider::new()),
            backend,
        }
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Seeds categories and menu items through the repositories.
pub struct TestDataBuilder<'a> {
    test: &'a TestBackend,
    categories: Vec<Category>,
    menu_items: Vec<MenuItem>,
}

impl<'a> TestDataBuilder<'a> {
    pub fn new(test: &'a TestBackend) -> Self {
        Self {
            test,
            categories: Vec::new(),
            menu_items: Vec::new(),
        }
    }

    /// Add a category with a resolved image URL.
    pub async fn with_category(mut self, name: &str) -> Self {
        let image = format!("{}/{}.png", TEST_STORAGE_BASE_URL, name.to_lowercase());
        let category = self
            .test
            .backend
            .categories
            .add(NewCategory::new(name).with_image(CategoryImage::resolved(image)))
            .await
            .expect("Failed to seed category");
        self.categories.push(category);
        self
    }

    /// Add a menu item in the category seeded at `category_index`.
    pub async fn with_menu_item(mut self, name: &str, category_index: usize) -> Self {
        let category_id = self.categories[category_index].id.clone();
        let item = self
            .test
            .backend
            .menu_items
            .add(NewMenuItem {
                name: name.to_string(),
                description: String::new(),
                price: 4.0,
                category_id,
                images: Vec::new(),
            })
            .await
            .expect("Failed to seed menu item");
        self.menu_items.push(item);
        self
    }

    pub fn build(self) -> TestData {
        TestData {
            categories: self.categories,
            menu_items: self.menu_items,
        }
    }
}

/// Seeded records, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TestData {
    pub categories: Vec<Category>,
    pub menu_items: Vec<MenuItem>,
}

/// Two categories; the first has two menu items, the second none.
pub async fn seed_menu(test: &TestBackend) -> TestData {
    TestDataBuilder::new(test)
        .with_category("Drinks")
        .await
        .with_category("Desserts")
        .await
        .with_menu_item("Espresso", 0)
        .await
        .with_menu_item("Lemonade", 0)
        .await
        .build()
}
