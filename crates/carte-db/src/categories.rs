//! Category repository implementation.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, instrument, warn};

use carte_core::defaults::{
    CATEGORIES_COLLECTION, CATEGORY_ID_FIELD, CATEGORY_IMAGES_NAMESPACE,
    DELETE_FAILED_MESSAGE, DELETE_HAS_DEPENDENTS_MESSAGE, MENU_ITEMS_COLLECTION,
};
use carte_core::{
    Category, CategoryImage, CategoryRepository, CategoryUpdate, DeleteOutcome, Document,
    DocumentStore, Error, Fields, NewCategory, ObjectStorage, Result, WriteOp,
};

use crate::images::{storage_path, upload_image};

/// Document-store implementation of [`CategoryRepository`].
pub struct DocCategoryRepository {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl DocCategoryRepository {
    /// Create a new repository over the given store and object storage.
    pub fn new(store: Arc<dyn DocumentStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    /// Turn a category image into a URL, uploading it when still pending.
    async fn resolve_image(&self, image: CategoryImage) -> Result<String> {
        match image {
            CategoryImage::Resolved(url) => Ok(url),
            CategoryImage::Pending(upload) => {
                let path = storage_path(CATEGORY_IMAGES_NAMESPACE, &upload.file_name);
                upload_image(self.storage.as_ref(), &path, &upload).await
            }
        }
    }

    async fn read_all(&self) -> Result<Vec<Category>> {
        let start = Instant::now();
        let docs = self.store.get_all(CATEGORIES_COLLECTION).await?;
        let categories: Vec<Category> = docs.iter().filter_map(decode_category).collect();

        debug!(
            subsystem = "store",
            component = "categories",
            op = "list",
            result_count = categories.len(),
            skipped = docs.len() - categories.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Categories listed"
        );
        Ok(categories)
    }
}

/// Decode a stored category, skipping documents with a missing name or image.
fn decode_category(doc: &Document) -> Option<Category> {
    match doc.decode::<Category>() {
        Ok(category) => Some(category),
        Err(e) => {
            warn!(
                subsystem = "store",
                component = "categories",
                doc_id = %doc.id,
                error = %e,
                "Skipping malformed category document"
            );
            None
        }
    }
}

fn category_fields(
    name: Option<String>,
    description: Option<String>,
    image: Option<String>,
) -> Fields {
    let mut fields = Fields::new();
    if let Some(name) = name {
        fields.insert("name".to_string(), JsonValue::String(name));
    }
    if let Some(description) = description {
        fields.insert("description".to_string(), JsonValue::String(description));
    }
    if let Some(image) = image {
        fields.insert("image".to_string(), JsonValue::String(image));
    }
    fields
}

#[async_trait]
impl CategoryRepository for DocCategoryRepository {
    #[instrument(skip(self, category), fields(subsystem = "store", component = "categories", op = "add"))]
    async fn add(&self, category: NewCategory) -> Result<Category> {
        if category.name.trim().is_empty() {
            warn!("Rejected category without a name");
            return Err(Error::Validation("Category name is required".to_string()));
        }
        let Some(image) = category.image else {
            warn!(name = %category.name, "Rejected category without an image");
            return Err(Error::Validation("Category image is required".to_string()));
        };

        let image = self.resolve_image(image).await?;
        let fields = category_fields(
            Some(category.name.clone()),
            category.description.clone(),
            Some(image.clone()),
        );

        let id = self
            .store
            .add(CATEGORIES_COLLECTION, fields)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to add category");
                e
            })?;

        info!(doc_id = %id, name = %category.name, "Category created");
        Ok(Category {
            id,
            name: category.name,
            description: category.description,
            image,
        })
    }

    #[instrument(skip(self, category), fields(subsystem = "store", component = "categories", op = "update", doc_id = ?category.id))]
    async fn update(&self, category: CategoryUpdate) -> Result<Category> {
        let Some(id) = category.id else {
            warn!("Rejected category update without an id");
            return Err(Error::Validation(
                "Category ID is required for update".to_string(),
            ));
        };

        let image = match category.image {
            Some(image) => Some(self.resolve_image(image).await?),
            None => None,
        };
        let fields = category_fields(category.name, category.description, image);

        self.store
            .update(CATEGORIES_COLLECTION, &id, fields)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update category");
                e
            })?;

        let doc = self
            .store
            .get(CATEGORIES_COLLECTION, &id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{}/{}", CATEGORIES_COLLECTION, id)))?;
        let updated: Category = doc.decode().map_err(|e| {
            error!(error = %e, "Updated category could not be decoded");
            e
        })?;

        info!("Category updated");
        Ok(updated)
    }

    #[instrument(skip(self, id), fields(subsystem = "store", component = "categories", op = "delete", doc_id = %id))]
    async fn delete(&self, id: &str, cascade: bool) -> DeleteOutcome {
        let dependents = match self
            .store
            .query(
                MENU_ITEMS_COLLECTION,
                CATEGORY_ID_FIELD,
                &JsonValue::String(id.to_string()),
            )
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                error!(error = %e, "Failed to delete category: dependent lookup failed");
                return DeleteOutcome::failed(DELETE_FAILED_MESSAGE);
            }
        };

        if !dependents.is_empty() && !cascade {
            info!(dependents = dependents.len(), "Category delete needs confirmation");
            return DeleteOutcome::refused(DELETE_HAS_DEPENDENTS_MESSAGE, dependents.len());
        }

        let mut ops: Vec<WriteOp> = dependents
            .iter()
            .map(|doc| WriteOp::delete(MENU_ITEMS_COLLECTION, doc.id.clone()))
            .collect();
        ops.push(WriteOp::delete(CATEGORIES_COLLECTION, id));

        match self.store.run_transaction(ops).await {
            Ok(()) => {
                info!(dependents = dependents.len(), "Category deleted");
                DeleteOutcome::deleted(dependents.len())
            }
            Err(e) => {
                error!(
                    dependents = dependents.len(),
                    error = %e,
                    "Failed to delete category"
                );
                DeleteOutcome::failed(DELETE_FAILED_MESSAGE)
            }
        }
    }

    async fn list(&self) -> Vec<Category> {
        match self.read_all().await {
            Ok(categories) => categories,
            Err(e) => {
                error!(
                    subsystem = "store",
                    component = "categories",
                    op = "list",
                    error = %e,
                    "Failed to get categories"
                );
                Vec::new()
            }
        }
    }

    async fn try_list(&self) -> Result<Vec<Category>> {
        self.read_all().await.map_err(|e| {
            error!(
                subsystem = "store",
                component = "categories",
                op = "try_list",
                error = %e,
                "Failed to get categories"
            );
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryDocumentStore, InMemoryObjectStorage, StoreOp};
    use carte_core::{to_fields, ImageUpload};
    use serde_json::json;

    struct Fixture {
        store: Arc<InMemoryDocumentStore>,
        storage: Arc<InMemoryObjectStorage>,
        repo: DocCategoryRepository,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDocumentStore::new());
        let storage = Arc::new(InMemoryObjectStorage::new("https://cdn.test/o"));
        let repo = DocCategoryRepository::new(store.clone(), storage.clone());
        Fixture {
            store,
            storage,
            repo,
        }
    }

    fn seed_menu_item(store: &InMemoryDocumentStore, id: &str, category_id: &str) {
        let data = to_fields(&json!({
            "name": format!("item {}", id),
            "price": 3.0,
            "categoryId": category_id,
        }))
        .unwrap();
        store.insert(MENU_ITEMS_COLLECTION, id, data).unwrap();
    }

    fn seed_category(store: &InMemoryDocumentStore, id: &str, name: &str) {
        let data = to_fields(&json!({ "name": name, "image": "https://cdn.test/x.png" })).unwrap();
        store.insert(CATEGORIES_COLLECTION, id, data).unwrap();
    }

    #[tokio::test]
    async fn test_add_then_list() {
        let f = fixture();

        let created = f
            .repo
            .add(
                NewCategory::new("Drinks")
                    .with_description("Cold and hot")
                    .with_image(CategoryImage::resolved("https://cdn.test/drinks.png")),
            )
            .await
            .unwrap();

        let listed = f.repo.list().await;
        assert_eq!(listed, vec![created.clone()]);
        assert!(!created.id.is_empty());
        assert_eq!(created.name, "Drinks");
        assert_eq!(created.description.as_deref(), Some("Cold and hot"));
    }

    #[tokio::test]
    async fn test_add_uploads_pending_image() {
        let f = fixture();
        let upload = ImageUpload::new("pasta.jpg", b"jpeg".to_vec()).with_content_type("image/jpeg");

        let created = f
            .repo
            .add(NewCategory::new("Pasta").with_image(CategoryImage::Pending(upload)))
            .await
            .unwrap();

        assert_eq!(
            created.image,
            "https://cdn.test/o/categories%2Fpasta.jpg?alt=media"
        );
        assert_eq!(f.storage.paths(), vec!["categories/pasta.jpg".to_string()]);
        let doc = f
            .store
            .get(CATEGORIES_COLLECTION, &created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.get_str("image"), Some(created.image.as_str()));
    }

    #[tokio::test]
    async fn test_add_requires_name_and_image() {
        let f = fixture();
        f.store.fail_on(StoreOp::Add);

        let no_name = f
            .repo
            .add(NewCategory::new("  ").with_image(CategoryImage::resolved("u")))
            .await;
        let no_image = f.repo.add(NewCategory::new("Drinks")).await;

        assert!(matches!(no_name, Err(Error::Validation(_))));
        assert!(matches!(no_image, Err(Error::Validation(_))));
        assert!(f.store.is_empty(CATEGORIES_COLLECTION));
    }

    #[tokio::test]
    async fn test_add_store_failure() {
        let f = fixture();
        f.store.fail_on(StoreOp::Add);

        let result = f
            .repo
            .add(NewCategory::new("Drinks").with_image(CategoryImage::resolved("u")))
            .await;

        assert!(matches!(result, Err(Error::Store(_))));
        assert!(f.store.is_empty(CATEGORIES_COLLECTION));
    }

    #[tokio::test]
    async fn test_add_upload_failure_writes_nothing() {
        let f = fixture();
        f.storage.set_fail_uploads(true);

        let result = f
            .repo
            .add(NewCategory::new("Pasta").with_image(CategoryImage::Pending(ImageUpload::new(
                "pasta.jpg",
                vec![1, 2, 3],
            ))))
            .await;

        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(f.store.is_empty(CATEGORIES_COLLECTION));
    }

    #[tokio::test]
    async fn test_update_merges_provided_fields() {
        let f = fixture();
        seed_category(&f.store, "1", "Drinks");

        let updated = f
            .repo
            .update(CategoryUpdate::for_id("1").name("Beverages"))
            .await
            .unwrap();

        assert_eq!(updated.id, "1");
        assert_eq!(updated.name, "Beverages");
        assert_eq!(updated.image, "https://cdn.test/x.png");
    }

    #[tokio::test]
    async fn test_update_replaces_image() {
        let f = fixture();
        seed_category(&f.store, "1", "Drinks");

        let updated = f
            .repo
            .update(
                CategoryUpdate::for_id("1").image(CategoryImage::Pending(ImageUpload::new(
                    "new.png",
                    vec![9],
                ))),
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Drinks");
        assert_eq!(updated.image, "https://cdn.test/o/categories%2Fnew.png?alt=media");
    }

    #[tokio::test]
    async fn test_update_requires_id() {
        let f = fixture();

        let result = f
            .repo
            .update(CategoryUpdate::default().name("Beverages"))
            .await;

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_missing_category_is_not_found() {
        let f = fixture();

        let result = f
            .repo
            .update(CategoryUpdate::for_id("ghost").name("Beverages"))
            .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(f.store.is_empty(CATEGORIES_COLLECTION));
    }

    #[tokio::test]
    async fn test_delete_refuses_with_dependents() {
        let f = fixture();
        seed_category(&f.store, "c1", "Drinks");
        seed_menu_item(&f.store, "m1", "c1");
        seed_menu_item(&f.store, "m2", "c1");

        let outcome = f.repo.delete("c1", false).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.dependents, 2);
        assert_eq!(
            outcome.message.as_deref(),
            Some(DELETE_HAS_DEPENDENTS_MESSAGE)
        );
        assert!(f.store.contains(CATEGORIES_COLLECTION, "c1"));
        assert_eq!(f.store.len(MENU_ITEMS_COLLECTION), 2);
    }

    #[tokio::test]
    async fn test_delete_cascade_removes_dependents() {
        let f = fixture();
        seed_category(&f.store, "c1", "Drinks");
        seed_category(&f.store, "c2", "Desserts");
        seed_menu_item(&f.store, "m1", "c1");
        seed_menu_item(&f.store, "m2", "c1");
        seed_menu_item(&f.store, "m3", "c2");

        let outcome = f.repo.delete("c1", true).await;

        assert_eq!(outcome, DeleteOutcome::deleted(2));
        assert!(!f.store.contains(CATEGORIES_COLLECTION, "c1"));
        assert!(!f.store.contains(MENU_ITEMS_COLLECTION, "m1"));
        assert!(!f.store.contains(MENU_ITEMS_COLLECTION, "m2"));
        assert!(f.store.contains(MENU_ITEMS_COLLECTION, "m3"));
        assert!(f.store.contains(CATEGORIES_COLLECTION, "c2"));
    }

    #[tokio::test]
    async fn test_delete_without_dependents_ignores_cascade_flag() {
        for cascade in [false, true] {
            let f = fixture();
            seed_category(&f.store, "c1", "Drinks");

            let outcome = f.repo.delete("c1", cascade).await;

            assert!(outcome.succeeded);
            assert_eq!(outcome.message, None);
            assert!(f.store.is_empty(CATEGORIES_COLLECTION));
        }
    }

    #[tokio::test]
    async fn test_delete_transaction_failure_leaves_everything() {
        let f = fixture();
        seed_category(&f.store, "c1", "Drinks");
        seed_menu_item(&f.store, "m1", "c1");
        seed_menu_item(&f.store, "m2", "c1");
        f.store.abort_next_transaction_after(2);

        let outcome = f.repo.delete("c1", true).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.message.as_deref(), Some(DELETE_FAILED_MESSAGE));
        assert!(f.store.contains(CATEGORIES_COLLECTION, "c1"));
        assert_eq!(f.store.len(MENU_ITEMS_COLLECTION), 2);
    }

    #[tokio::test]
    async fn test_delete_query_failure() {
        let f = fixture();
        seed_category(&f.store, "c1", "Drinks");
        f.store.fail_on(StoreOp::Query);

        let outcome = f.repo.delete("c1", true).await;

        assert_eq!(outcome, DeleteOutcome::failed(DELETE_FAILED_MESSAGE));
        assert!(f.store.contains(CATEGORIES_COLLECTION, "c1"));
    }

    #[tokio::test]
    async fn test_list_failure_is_empty_but_try_list_errors() {
        let f = fixture();
        seed_category(&f.store, "c1", "Drinks");
        f.store.fail_on(StoreOp::GetAll);

        assert!(f.repo.list().await.is_empty());
        assert!(matches!(f.repo.try_list().await, Err(Error::Store(_))));
    }

    #[tokio::test]
    async fn test_list_skips_malformed_documents() {
        let f = fixture();
        seed_category(&f.store, "c1", "Drinks");
        f.store
            .insert(
                CATEGORIES_COLLECTION,
                "c2",
                to_fields(&json!({ "name": "No image" })).unwrap(),
            )
            .unwrap();

        let listed = f.repo.try_list().await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "c1");
    }
}
