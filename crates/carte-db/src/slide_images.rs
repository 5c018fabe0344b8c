//! Promotional slide images.
//!
//! The public site shows a carousel of [`SLIDE_SLOT_COUNT`] slots. Each slot
//! has one object at `slideImages/<slot>` (re-uploads overwrite it) and one
//! document `slideImage/<slot>` holding its `imageUrl`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use carte_core::defaults::{
    IMAGE_URL_FIELD, SLIDE_IMAGES_COLLECTION, SLIDE_IMAGES_NAMESPACE, SLIDE_SLOT_COUNT,
};
use carte_core::{slide_slot_index, DocumentStore, Error, Fields, ImageUpload, ObjectStorage, Result};

use crate::images::upload_image;

/// Uploads slide images and keeps their URLs in the document store.
pub struct SlideImageService {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
}

fn check_slot(slot: &str) -> Result<()> {
    if slide_slot_index(slot).is_none() {
        return Err(Error::Validation(format!(
            "Unknown slide slot: {} (expected image1..image{})",
            slot, SLIDE_SLOT_COUNT
        )));
    }
    Ok(())
}

impl SlideImageService {
    pub fn new(store: Arc<dyn DocumentStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    /// Upload the image for `slot` and return its download URL.
    pub async fn upload(&self, slot: &str, image: &ImageUpload) -> Result<String> {
        check_slot(slot)?;
        let path = format!("{}/{}", SLIDE_IMAGES_NAMESPACE, slot);
        upload_image(self.storage.as_ref(), &path, image).await
    }

    /// Record `url` as the image of `slot`, keeping other fields of the document.
    pub async fn save_url(&self, slot: &str, url: &str) -> Result<()> {
        check_slot(slot)?;
        let mut fields = Fields::new();
        fields.insert(IMAGE_URL_FIELD.to_string(), JsonValue::String(url.to_string()));

        self.store
            .set(SLIDE_IMAGES_COLLECTION, slot, fields, true)
            .await
            .map_err(|e| {
                error!(
                    subsystem = "store",
                    component = "slide_images",
                    doc_id = %slot,
                    error = %e,
                    "Failed to save slide image URL"
                );
                e
            })?;
        info!(component = "slide_images", doc_id = %slot, "Slide image saved");
        Ok(())
    }

    /// Upload and record in one step.
    pub async fn replace(&self, slot: &str, image: &ImageUpload) -> Result<String> {
        let url = self.upload(slot, image).await?;
        self.save_url(slot, &url).await?;
        Ok(url)
    }

    /// Slot id to URL for every slot that has an image.
    pub async fn fetch_all(&self) -> Result<BTreeMap<String, String>> {
        let docs = self.store.get_all(SLIDE_IMAGES_COLLECTION).await?;

        let mut urls = BTreeMap::new();
        for doc in docs {
            match doc.get_str(IMAGE_URL_FIELD) {
                Some(url) => {
                    urls.insert(doc.id.clone(), url.to_string());
                }
                None => warn!(
                    component = "slide_images",
                    doc_id = %doc.id,
                    "Slide image document has no imageUrl"
                ),
            }
        }

        debug!(component = "slide_images", result_count = urls.len(), "Slide images fetched");
        Ok(urls)
    }
}
