//! Category view-model.
//!
//! [`CategoryManager`] is what a category screen binds to: reactive state plus
//! imperative operations that resolve to the settled value or a [`Rejection`].

use tokio::sync::watch;
use tracing::{info, warn};

use carte_core::config::CategoryConfig;
use carte_core::defaults::UPDATE_CATEGORY_REJECTION;
use carte_core::{Category, CategoryId, CategoryImage, CategoryUpdate, MissingNamePolicy, NewCategory};

use crate::async_phase::Rejection;
use crate::categories::CategoriesState;
use crate::container::CategoryStore;

/// Edits to a category from a form. Omitted fields keep their stored value,
/// except `name`, which is governed by [`MissingNamePolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<CategoryImage>,
}

impl CategoryChanges {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn image(mut self, image: CategoryImage) -> Self {
        self.image = Some(image);
        self
    }
}

#[derive(Clone)]
pub struct CategoryManager {
    store: CategoryStore,
    missing_name: MissingNamePolicy,
}

impl CategoryManager {
    /// Bind to `store` and load the categories once.
    ///
    /// A failed initial load is recorded in the state's `error`.
    pub async fn mount(store: CategoryStore) -> Self {
        Self::mount_with_config(store, &CategoryConfig::default()).await
    }

    pub async fn mount_with_config(store: CategoryStore, config: &CategoryConfig) -> Self {
        let manager = Self {
            store,
            missing_name: config.missing_name_on_update,
        };
        if let Ok(categories) = manager.store.fetch_categories().await {
            info!(
                subsystem = "state",
                component = "manager",
                result_count = categories.len(),
                "Category manager mounted"
            );
        }
        manager
    }

    pub fn categories(&self) -> Vec<Category> {
        self.store.with_state(|s| s.categories.clone())
    }

    pub fn loading(&self) -> bool {
        self.store.with_state(|s| s.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.store.with_state(|s| s.error.clone())
    }

    pub fn state(&self) -> CategoriesState {
        self.store.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<CategoriesState> {
        self.store.subscribe()
    }

    /// Re-run the fetch, e.g. after another editor changed the menu.
    pub async fn refresh(&self) -> Result<Vec<Category>, Rejection> {
        self.store.fetch_categories().await
    }

    pub async fn add_category(&self, category: NewCategory) -> Result<Category, Rejection> {
        self.store.create_category(category).await
    }

    pub async fn update_category(
        &self,
        id: &str,
        changes: CategoryChanges,
    ) -> Result<Category, Rejection> {
        let name = match (changes.name, self.missing_name) {
            (Some(name), _) => name,
            (None, MissingNamePolicy::DefaultToEmpty) => String::new(),
            (None, MissingNamePolicy::Reject) => {
                warn!(
                    subsystem = "state",
                    component = "manager",
                    doc_id = %id,
                    "Category update without a name rejected"
                );
                return Err(self.store.reject_update(UPDATE_CATEGORY_REJECTION));
            }
        };

        let update = CategoryUpdate {
            id: Some(id.to_string()),
            name: Some(name),
            description: changes.description,
            image: changes.image,
        };
        self.store.modify_category(update).await
    }

    pub async fn delete_category(
        &self,
        id: &str,
        delete_associated_items: bool,
    ) -> Result<CategoryId, Rejection> {
        self.store.remove_category(id, delete_associated_items).await
    }
}
