//! Menu item repository implementation.
//!
//! Menu item images are uploaded to `menuImages/<millis>_<tag>_<file name>` and the
//! resolved URLs stored on the item in upload order. Uploads and removals of
//! an item's images run concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, error, info, instrument, warn};

use carte_core::defaults::{CATEGORY_ID_FIELD, MENU_IMAGES_NAMESPACE, MENU_ITEMS_COLLECTION};
use carte_core::{
    to_fields, Document, DocumentStore, Error, Fields, ImageUpload, MenuItem,
    MenuItemRepository, MenuItemUpdate, NewMenuItem, ObjectStorage, Result,
};

use crate::images::{storage_path, timestamped_file_name, upload_image};

/// Document-store implementation of [`MenuItemRepository`].
pub struct DocMenuItemRepository {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl DocMenuItemRepository {
    pub fn new(store: Arc<dyn DocumentStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    async fn upload_all(&self, images: &[ImageUpload]) -> Result<Vec<String>> {
        try_join_all(images.iter().map(|image| async move {
            let path = storage_path(
                MENU_IMAGES_NAMESPACE,
                &timestamped_file_name(&image.file_name),
            );
            upload_image(self.storage.as_ref(), &path, image).await
        }))
        .await
    }

    async fn delete_all(&self, urls: &[String]) -> Result<()> {
        // an object referenced twice is deleted once
        let mut unique: Vec<&String> = urls.iter().collect();
        unique.sort();
        unique.dedup();
        try_join_all(unique.into_iter().map(|url| self.storage.delete_url(url))).await?;
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<MenuItem> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{}/{}", MENU_ITEMS_COLLECTION, id)))
    }
}

fn decode_items(docs: Vec<Document>) -> Vec<MenuItem> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<MenuItem>() {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(
                    subsystem = "store",
                    component = "menu_items",
                    doc_id = %doc.id,
                    error = %e,
                    "Skipping malformed menu item document"
                );
                None
            }
        })
        .collect()
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::Validation(format!(
            "Price must be a positive number, got {}",
            price
        )));
    }
    Ok(())
}

#[async_trait]
impl MenuItemRepository for DocMenuItemRepository {
    async fn list(&self) -> Result<Vec<MenuItem>> {
        let docs = self.store.get_all(MENU_ITEMS_COLLECTION).await.map_err(|e| {
            error!(component = "menu_items", error = %e, "Failed to fetch menu items");
            e
        })?;
        Ok(decode_items(docs))
    }

    async fn get(&self, id: &str) -> Result<Option<MenuItem>> {
        let doc = self.store.get(MENU_ITEMS_COLLECTION, id).await.map_err(|e| {
            error!(component = "menu_items", doc_id = %id, error = %e, "Failed to fetch menu item");
            e
        })?;
        doc.map(|d| d.decode()).transpose()
    }

    async fn list_by_category(&self, category_id: &str) -> Result<Vec<MenuItem>> {
        let docs = self
            .store
            .query(
                MENU_ITEMS_COLLECTION,
                CATEGORY_ID_FIELD,
                &JsonValue::String(category_id.to_string()),
            )
            .await?;
        let items = decode_items(docs);
        debug!(
            component = "menu_items",
            category_id,
            result_count = items.len(),
            "Menu items listed by category"
        );
        Ok(items)
    }

    #[instrument(skip(self, item), fields(subsystem = "store", component = "menu_items", op = "add"))]
    async fn add(&self, item: NewMenuItem) -> Result<MenuItem> {
        if item.name.trim().is_empty() || item.category_id.trim().is_empty() {
            warn!("Rejected menu item without name or category");
            return Err(Error::Validation(
                "Name, price, and categoryId are required fields".to_string(),
            ));
        }
        validate_price(item.price)?;

        let images = self.upload_all(&item.images).await?;

        let fields = to_fields(&json!({
            "name": item.name,
            "description": item.description,
            "price": item.price,
            "categoryId": item.category_id,
            "images": images,
        }))?;

        let id = self.store.add(MENU_ITEMS_COLLECTION, fields).await.map_err(|e| {
            error!(error = %e, "Failed to add menu item");
            e
        })?;

        info!(doc_id = %id, image_count = images.len(), "Menu item created");
        Ok(MenuItem {
            id,
            name: item.name,
            description: item.description,
            price: item.price,
            category_id: item.category_id,
            images,
        })
    }

    #[instrument(skip(self, changes), fields(subsystem = "store", component = "menu_items", op = "update"))]
    async fn update(&self, id: &str, changes: MenuItemUpdate) -> Result<MenuItem> {
        if let Some(price) = changes.price {
            validate_price(price)?;
        }
        let current = self.fetch(id).await?;

        let mut fields = Fields::new();
        if let Some(name) = changes.name {
            fields.insert("name".to_string(), JsonValue::String(name));
        }
        if let Some(description) = changes.description {
            fields.insert("description".to_string(), JsonValue::String(description));
        }
        if let Some(price) = changes.price {
            fields.insert("price".to_string(), json!(price));
        }
        if let Some(category_id) = changes.category_id {
            fields.insert(CATEGORY_ID_FIELD.to_string(), JsonValue::String(category_id));
        }

        let replaced = !changes.images.is_empty();
        if replaced {
            let urls = self.upload_all(&changes.images).await?;
            fields.insert("images".to_string(), json!(urls));
        }

        self.store
            .update(MENU_ITEMS_COLLECTION, id, fields)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update menu item");
                e
            })?;

        if replaced {
            if let Err(e) = self.delete_all(&current.images).await {
                warn!(error = %e, count = current.images.len(), "Old menu images were not removed");
            }
        }

        let updated = self.fetch(id).await?;
        info!(images_replaced = replaced, "Menu item updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "menu_items", op = "delete"))]
    async fn delete(&self, id: &str) -> Result<()> {
        let current = self.fetch(id).await?;

        self.delete_all(&current.images).await.map_err(|e| {
            error!(error = %e, "Failed to delete menu item images");
            e
        })?;
        self.store.delete(MENU_ITEMS_COLLECTION, id).await.map_err(|e| {
            error!(error = %e, "Failed to delete menu item");
            e
        })?;

        info!(image_count = current.images.len(), "Menu item deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryDocumentStore, InMemoryObjectStorage, StoreOp};

    struct Fixture {
        store: Arc<InMemoryDocumentStore>,
        storage: Arc<InMemoryObjectStorage>,
        repo: DocMenuItemRepository,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDocumentStore::new());
        let storage = Arc::new(InMemoryObjectStorage::new("https://cdn.test/o"));
        let repo = DocMenuItemRepository::new(store.clone(), storage.clone());
        Fixture {
            store,
            storage,
            repo,
        }
    }

    fn espresso(images: Vec<ImageUpload>) -> NewMenuItem {
        NewMenuItem {
            name: "Espresso".to_string(),
            description: "Short and strong".to_string(),
            price: 2.5,
            category_id: "c1".to_string(),
            images,
        }
    }

    #[tokio::test]
    async fn test_add_uploads_images_in_order() {
        let f = fixture();

        let item = f
            .repo
            .add(espresso(vec![
                ImageUpload::new("front.png", vec![1]),
                ImageUpload::new("side.png", vec![2]),
            ]))
            .await
            .unwrap();

        assert_eq!(item.images.len(), 2);
        assert!(item.images[0].contains("front.png"));
        assert!(item.images[1].contains("side.png"));
        assert!(item.images[0].starts_with("https://cdn.test/o/menuImages%2F"));
        assert_eq!(f.storage.paths().len(), 2);

        let stored = f.repo.get(&item.id).await.unwrap().unwrap();
        assert_eq!(stored, item);
    }

    #[tokio::test]
    async fn test_add_validation() {
        let f = fixture();

        let mut no_name = espresso(vec![]);
        no_name.name = String::new();
        let mut free = espresso(vec![]);
        free.price = 0.0;
        let mut nan = espresso(vec![]);
        nan.price = f64::NAN;
        let mut no_category = espresso(vec![]);
        no_category.category_id = " ".to_string();

        for item in [no_name, free, nan, no_category] {
            assert!(matches!(f.repo.add(item).await, Err(Error::Validation(_))));
        }
        assert!(f.store.is_empty(MENU_ITEMS_COLLECTION));
    }

    #[tokio::test]
    async fn test_add_upload_failure_writes_nothing() {
        let f = fixture();
        f.storage.set_fail_uploads(true);

        let result = f
            .repo
            .add(espresso(vec![ImageUpload::new("a.png", vec![1])]))
            .await;

        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(f.store.is_empty(MENU_ITEMS_COLLECTION));
    }

    #[tokio::test]
    async fn test_list_by_category() {
        let f = fixture();
        f.repo.add(espresso(vec![])).await.unwrap();
        let mut tea = espresso(vec![]);
        tea.name = "Tea".to_string();
        tea.category_id = "c2".to_string();
        f.repo.add(tea).await.unwrap();

        let c1 = f.repo.list_by_category("c1").await.unwrap();

        assert_eq!(c1.len(), 1);
        assert_eq!(c1[0].name, "Espresso");
        assert_eq!(f.repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_replaces_images() {
        let f = fixture();
        let item = f
            .repo
            .add(espresso(vec![ImageUpload::new("old.png", vec![1])]))
            .await
            .unwrap();

        let updated = f
            .repo
            .update(
                &item.id,
                MenuItemUpdate {
                    price: Some(3.0),
                    images: vec![ImageUpload::new("new.png", vec![2])],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price, 3.0);
        assert_eq!(updated.name, "Espresso");
        assert_eq!(updated.images.len(), 1);
        assert!(updated.images[0].contains("new.png"));
        let paths = f.storage.paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("_new.png"));
    }

    #[tokio::test]
    async fn test_update_without_images_keeps_them() {
        let f = fixture();
        let item = f
            .repo
            .add(espresso(vec![ImageUpload::new("a.png", vec![1])]))
            .await
            .unwrap();

        let updated = f
            .repo
            .update(
                &item.id,
                MenuItemUpdate {
                    name: Some("Ristretto".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Ristretto");
        assert_eq!(updated.images, item.images);
        assert_eq!(f.storage.paths().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_item() {
        let f = fixture();

        let result = f.repo.update("ghost", MenuItemUpdate::default()).await;

        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_images_and_document() {
        let f = fixture();
        let item = f
            .repo
            .add(espresso(vec![
                ImageUpload::new("a.png", vec![1]),
                ImageUpload::new("b.png", vec![2]),
            ]))
            .await
            .unwrap();

        f.repo.delete(&item.id).await.unwrap();

        assert!(f.storage.paths().is_empty());
        assert!(f.store.is_empty(MENU_ITEMS_COLLECTION));
        assert!(matches!(
            f.repo.delete(&item.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_same_file_name_images_stay_distinct() {
        let f = fixture();
        let item = f
            .repo
            .add(espresso(vec![
                ImageUpload::new("image.jpg", vec![1]),
                ImageUpload::new("image.jpg", vec![2]),
            ]))
            .await
            .unwrap();

        assert_ne!(item.images[0], item.images[1]);
        assert_eq!(f.storage.paths().len(), 2);

        f.repo.delete(&item.id).await.unwrap();

        assert!(f.storage.paths().is_empty());
        assert!(f.store.is_empty(MENU_ITEMS_COLLECTION));
    }

    #[tokio::test]
    async fn test_delete_with_repeated_image_url() {
        let f = fixture();
        let item = f
            .repo
            .add(espresso(vec![ImageUpload::new("a.png", vec![1])]))
            .await
            .unwrap();
        let url = item.images[0].clone();
        let fields = to_fields(&json!({
            "name": "Espresso",
            "description": "",
            "price": 2.5,
            "categoryId": "c1",
            "images": [url.clone(), url],
        }))
        .unwrap();
        f.store.insert(MENU_ITEMS_COLLECTION, &item.id, fields).unwrap();

        f.repo.delete(&item.id).await.unwrap();

        assert!(f.storage.paths().is_empty());
        assert!(f.store.is_empty(MENU_ITEMS_COLLECTION));
    }

    #[tokio::test]
    async fn test_list_propagates_store_failure() {
        let f = fixture();
        f.store.fail_on(StoreOp::GetAll);

        assert!(matches!(f.repo.list().await, Err(Error::Store(_))));
    }
}
