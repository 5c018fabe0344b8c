//! Core traits for carte abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability. Backends are
//! passed into repositories as explicit handles; nothing here is a global.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::document::{Document, Fields, StorageRef, WriteOp};
use crate::error::Result;
use crate::models::*;

// =============================================================================
// BACKEND COLLABORATORS
// =============================================================================

/// Hosted document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document of a collection, in store iteration order.
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>>;

    /// A single document, or `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Documents whose top-level `field` equals `value`.
    async fn query(&self, collection: &str, field: &str, value: &JsonValue)
        -> Result<Vec<Document>>;

    /// Create a document with a store-assigned id and return the id.
    async fn add(&self, collection: &str, data: Fields) -> Result<String>;

    /// Create or overwrite a document. With `merge`, untouched fields survive.
    async fn set(&self, collection: &str, id: &str, data: Fields, merge: bool) -> Result<()>;

    /// Replace the given fields of an existing document.
    ///
    /// Fails with `NotFound` when the document does not exist.
    async fn update(&self, collection: &str, id: &str, data: Fields) -> Result<()>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Apply every write or none of them.
    ///
    /// Fails with `Transaction` when the batch is aborted; the store is then
    /// left exactly as before the call.
    async fn run_transaction(&self, ops: Vec<WriteOp>) -> Result<()>;
}

/// Hosted blob store.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store bytes at `path`, replacing any previous object there.
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<StorageRef>;

    /// Publicly fetchable URL for an uploaded object.
    async fn resolve_url(&self, reference: &StorageRef) -> Result<String>;

    /// Remove the object a previously resolved URL points at.
    async fn delete_url(&self, url: &str) -> Result<()>;
}

/// Hosted authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Sign in with email and password; fails with `Unauthorized`.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn sign_out(&self) -> Result<()>;

    /// Permanently remove the account of a signed-in user.
    async fn delete_user(&self, user: &AuthUser) -> Result<()>;

    /// The currently signed-in user, if any.
    fn current_user(&self) -> Option<AuthUser>;
}

// =============================================================================
// REPOSITORIES
// =============================================================================

/// Repository for menu categories.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a category, uploading a pending image first.
    async fn add(&self, category: NewCategory) -> Result<Category>;

    /// Merge the provided fields into an existing category and return it as stored.
    async fn update(&self, category: CategoryUpdate) -> Result<Category>;

    /// Delete a category, refusing when menu items reference it unless `cascade`.
    async fn delete(&self, id: &str, cascade: bool) -> DeleteOutcome;

    /// All categories. Failures are logged and yield an empty list.
    async fn list(&self) -> Vec<Category>;

    /// All categories, propagating store failures.
    async fn try_list(&self) -> Result<Vec<Category>>;
}

/// Repository for menu items.
#[async_trait]
pub trait MenuItemRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<MenuItem>>;

    async fn get(&self, id: &str) -> Result<Option<MenuItem>>;

    /// Menu items referencing a category.
    async fn list_by_category(&self, category_id: &str) -> Result<Vec<MenuItem>>;

    async fn add(&self, item: NewMenuItem) -> Result<MenuItem>;

    async fn update(&self, id: &str, changes: MenuItemUpdate) -> Result<MenuItem>;

    /// Delete a menu item and its stored images.
    async fn delete(&self, id: &str) -> Result<()>;
}
