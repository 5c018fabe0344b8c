//! Centralized default constants for the carte back-office.
//!
//! Collection names and storage namespaces are part of the persisted data
//! layout shared with the public menu site, so they must not change without a
//! data migration.

// =============================================================================
// DOCUMENT COLLECTIONS
// =============================================================================

/// Collection holding one document per menu category.
pub const CATEGORIES_COLLECTION: &str = "categories";

/// Collection holding one document per menu item.
pub const MENU_ITEMS_COLLECTION: &str = "menuItems";

/// Collection holding the promotional slide image URLs, keyed by slot.
pub const SLIDE_IMAGES_COLLECTION: &str = "slideImage";

/// Collection holding the single restaurant information document.
pub const RESTAURANT_INFO_COLLECTION: &str = "restaurantInfo";

/// Document id of the restaurant information record.
pub const RESTAURANT_INFO_DOCUMENT: &str = "info";

/// Collection holding staff profiles, keyed by auth uid.
pub const USERS_COLLECTION: &str = "users";

// =============================================================================
// DOCUMENT FIELDS
// =============================================================================

/// Foreign key from a menu item to its category.
pub const CATEGORY_ID_FIELD: &str = "categoryId";

/// URL field of a slide image document.
pub const IMAGE_URL_FIELD: &str = "imageUrl";

// =============================================================================
// OBJECT STORAGE NAMESPACES
// =============================================================================

/// Storage prefix for category images.
pub const CATEGORY_IMAGES_NAMESPACE: &str = "categories";

/// Storage prefix for menu item images.
pub const MENU_IMAGES_NAMESPACE: &str = "menuImages";

/// Storage prefix for slide images.
pub const SLIDE_IMAGES_NAMESPACE: &str = "slideImages";

/// Public base URL used when no storage configuration is provided.
pub const STORAGE_PUBLIC_BASE_URL: &str = "http://localhost:9199/v0/b/carte/o";

// =============================================================================
// SLIDES
// =============================================================================

/// Number of slide slots shown on the public site.
pub const SLIDE_SLOT_COUNT: usize = 4;

/// Prefix of slide slot ids (`image1` .. `image4`).
pub const SLIDE_SLOT_PREFIX: &str = "image";

// =============================================================================
// USER-FACING MESSAGES
// =============================================================================

/// Delete refused because menu items still reference the category.
pub const DELETE_HAS_DEPENDENTS_MESSAGE: &str =
    "Category has associated menu items. Confirm deletion to proceed.";

/// Delete failed in the store; nothing was removed.
pub const DELETE_FAILED_MESSAGE: &str = "An error occurred while deleting the category.";

/// Rejection reason surfaced when fetching categories fails.
pub const FETCH_CATEGORIES_REJECTION: &str = "Failed to fetch categories";

/// Rejection reason surfaced when adding a category fails.
pub const ADD_CATEGORY_REJECTION: &str = "Failed to add category";

/// Rejection reason surfaced when updating a category fails.
pub const UPDATE_CATEGORY_REJECTION: &str = "Failed to update category";

/// Rejection reason surfaced when deleting a category fails without a message.
pub const DELETE_CATEGORY_REJECTION: &str = "Failed to delete category";

// =============================================================================
// LOGGING
// =============================================================================

/// Default `EnvFilter` directive when `RUST_LOG` is unset.
pub const LOG_FILTER: &str = "carte_core=info,carte_db=info,carte_state=info";

/// Default log file name when only a directory is configured.
pub const LOG_FILE_NAME: &str = "carte.log";
