//! Slide carousel state, and the controller that loads it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use carte_core::defaults::SLIDE_SLOT_COUNT;
use carte_core::{slide_slot_index, ImageUpload};
use carte_db::SlideImageService;

use crate::async_phase::Rejection;
use crate::store::StateStore;

/// One URL per carousel slot; empty string for an empty slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideImagesState {
    pub images: Vec<String>,
}

impl Default for SlideImagesState {
    fn default() -> Self {
        Self {
            images: vec![String::new(); SLIDE_SLOT_COUNT],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlideImagesAction {
    /// Replace every slot.
    SetImages(Vec<String>),
    /// Set the slot named by `slot` (`image1` is index 0).
    AddImage { slot: String, url: String },
}

pub fn reduce(mut state: SlideImagesState, action: SlideImagesAction) -> SlideImagesState {
    match action {
        SlideImagesAction::SetImages(images) => state.images = images,
        SlideImagesAction::AddImage { slot, url } => {
            // out-of-range slots are ignored
            if let Some(index) = slide_slot_index(&slot).filter(|i| *i < state.images.len()) {
                state.images[index] = url;
            }
        }
    }
    state
}

/// Keeps [`SlideImagesState`] in sync with the slide image service.
#[derive(Clone)]
pub struct SlideImagesController {
    state: StateStore<SlideImagesState, SlideImagesAction>,
    service: Arc<SlideImageService>,
}

impl SlideImagesController {
    pub fn new(service: Arc<SlideImageService>) -> Self {
        Self {
            state: StateStore::new(reduce),
            service,
        }
    }

    pub fn state(&self) -> &StateStore<SlideImagesState, SlideImagesAction> {
        &self.state
    }

    /// Load every slot from the store.
    pub async fn load(&self) -> Result<Vec<String>, Rejection> {
        let urls = self.service.fetch_all().await.map_err(|e| {
            error!(subsystem = "state", component = "slide_images", error = %e, "Failed to fetch slide images");
            Rejection::new("Failed to fetch slide images")
        })?;

        let mut images = vec![String::new(); SLIDE_SLOT_COUNT];
        for (slot, url) in urls {
            if let Some(index) = slide_slot_index(&slot) {
                images[index] = url;
            }
        }
        self.state.dispatch(SlideImagesAction::SetImages(images.clone()));
        Ok(images)
    }

    /// Upload a new image for `slot`, save it, and show it.
    pub async fn replace(&self, slot: &str, image: &ImageUpload) -> Result<String, Rejection> {
        let url = self.service.replace(slot, image).await.map_err(|e| {
            error!(subsystem = "state", component = "slide_images", slot, error = %e, "Failed to replace slide image");
            Rejection::new("Failed to upload slide image")
        })?;

        self.state.dispatch(SlideImagesAction::AddImage {
            slot: slot.to_string(),
            url: url.clone(),
        });
        Ok(url)
    }
}
