//! Identifier generation for store-assigned document ids.
//!
//! Ids are UUIDv7 rendered as 32 lowercase hex characters, so ids created
//! later sort after earlier ones.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a new document id.
///
/// # Example
///
/// ```
/// use carte_core::ids::new_document_id;
///
/// let id = new_document_id();
/// assert_eq!(id.len(), 32);
/// ```
pub fn new_document_id() -> String {
    new_v7().simple().to_string()
}
