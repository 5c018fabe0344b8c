//! Domain models for the restaurant back-office.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults::{SLIDE_SLOT_COUNT, SLIDE_SLOT_PREFIX};
use crate::error::Error;

// =============================================================================
// IMAGES
// =============================================================================

/// Binary image content waiting to be uploaded to object storage.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Original file name; becomes the last path segment in storage.
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A category image: either pending upload or already resolved to a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryImage {
    Pending(ImageUpload),
    Resolved(String),
}

impl CategoryImage {
    pub fn resolved(url: impl Into<String>) -> Self {
        CategoryImage::Resolved(url.into())
    }
}

// =============================================================================
// CATEGORIES
// =============================================================================

/// Store-assigned category identifier.
pub type CategoryId = String;

/// A persisted menu category. The image is always a resolved URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image: String,
}

/// A category that has not been created yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<CategoryImage>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image(mut self, image: CategoryImage) -> Self {
        self.image = Some(image);
        self
    }
}

/// Changes to an existing category. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryUpdate {
    pub id: Option<CategoryId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<CategoryImage>,
}

impl CategoryUpdate {
    pub fn for_id(id: impl Into<CategoryId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

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

/// Result of a category delete request.
///
/// A refused or failed delete is reported here rather than as an error so the
/// caller can show the message and offer to confirm the cascade.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DeleteOutcome {
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Menu items found referencing the category.
    pub dependents: usize,
}

impl DeleteOutcome {
    pub fn deleted(dependents: usize) -> Self {
        Self {
            succeeded: true,
            message: None,
            dependents,
        }
    }

    pub fn refused(message: impl Into<String>, dependents: usize) -> Self {
        Self {
            succeeded: false,
            message: Some(message.into()),
            dependents,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: Some(message.into()),
            dependents: 0,
        }
    }
}

// =============================================================================
// MENU ITEMS
// =============================================================================

/// A dish or drink on the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub category_id: CategoryId,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A menu item that has not been created yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewMenuItem {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: CategoryId,
    pub images: Vec<ImageUpload>,
}

/// Changes to an existing menu item. New uploads replace every stored image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MenuItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_id: Option<CategoryId>,
    pub images: Vec<ImageUpload>,
}

// =============================================================================
// SLIDES
// =============================================================================

/// Zero-based index of a slide slot id such as `image3`.
///
/// Returns `None` for malformed ids and slots outside the carousel.
pub fn slide_slot_index(slot: &str) -> Option<usize> {
    let number: usize = slot.strip_prefix(SLIDE_SLOT_PREFIX)?.parse().ok()?;
    let index = number.checked_sub(1)?;
    (index < SLIDE_SLOT_COUNT).then_some(index)
}

// =============================================================================
// RESTAURANT
// =============================================================================

/// Contact details shown on the public site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantInfo {
    pub name: String,
    pub city: String,
    pub address: String,
    pub zip: u32,
    pub phone: u64,
}

// =============================================================================
// USERS
// =============================================================================

/// Staff role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(Error::Validation(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// A staff profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A user as reported by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slide_slot_index() {
        assert_eq!(slide_slot_index("image1"), Some(0));
        assert_eq!(slide_slot_index("image4"), Some(3));
        assert_eq!(slide_slot_index("image5"), None);
        assert_eq!(slide_slot_index("image0"), None);
        assert_eq!(slide_slot_index("banner1"), None);
        assert_eq!(slide_slot_index("imagex"), None);
    }

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" user ".parse::<Role>().unwrap(), Role::User);
        assert!(matches!("chef".parse::<Role>(), Err(Error::Validation(_))));
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn test_menu_item_uses_camel_case_fields() {
        let item: MenuItem = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "name": "Espresso",
            "price": 2.5,
            "categoryId": "c1"
        }))
        .unwrap();

        assert_eq!(item.category_id, "c1");
        assert!(item.images.is_empty());
        assert_eq!(item.description, "");
    }

    #[test]
    fn test_category_description_is_optional() {
        let category: Category = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "name": "Drinks",
            "image": "https://cdn/drinks.jpg"
        }))
        .unwrap();

        assert_eq!(category.description, None);
        let value = serde_json::to_value(&category).unwrap();
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_image_upload_debug_hides_bytes() {
        let upload = ImageUpload::new("a.png", vec![0u8; 2048]);
        let debug = format!("{:?}", upload);
        assert!(debug.contains("len: 2048"));
        assert!(!debug.contains("0, 0, 0"));
    }
}
