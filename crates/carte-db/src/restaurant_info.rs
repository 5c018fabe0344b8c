//! Restaurant contact information, stored as the single document
//! `restaurantInfo/info`.

use std::sync::Arc;

use tracing::{error, info};

use carte_core::defaults::{RESTAURANT_INFO_COLLECTION, RESTAURANT_INFO_DOCUMENT};
use carte_core::{to_fields, DocumentStore, Error, RestaurantInfo, Result};

pub struct RestaurantInfoService {
    store: Arc<dyn DocumentStore>,
}

impl RestaurantInfoService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Current information. Fails with `NotFound` until the document exists.
    pub async fn get(&self) -> Result<RestaurantInfo> {
        let doc = self
            .store
            .get(RESTAURANT_INFO_COLLECTION, RESTAURANT_INFO_DOCUMENT)
            .await
            .map_err(|e| {
                error!(component = "restaurant_info", error = %e, "Failed to get restaurant info");
                e
            })?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "{}/{}",
                    RESTAURANT_INFO_COLLECTION, RESTAURANT_INFO_DOCUMENT
                ))
            })?;
        doc.decode()
    }

    /// Overwrite every field of the existing document.
    pub async fn update(&self, info: &RestaurantInfo) -> Result<()> {
        if info.name.trim().is_empty() {
            return Err(Error::Validation("Restaurant name is required".to_string()));
        }

        self.store
            .update(
                RESTAURANT_INFO_COLLECTION,
                RESTAURANT_INFO_DOCUMENT,
                to_fields(info)?,
            )
            .await
            .map_err(|e| {
                error!(component = "restaurant_info", error = %e, "Failed to update restaurant info");
                e
            })?;

        info!(component = "restaurant_info", name = %info.name, "Restaurant info updated");
        Ok(())
    }
}
