//! In-memory backends for tests, demos, and embedding.
//!
//! Each backend mirrors the observable behavior of the hosted service it
//! stands in for, including all-or-nothing transactions, and supports fault
//! injection so failure paths can be exercised deterministically.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use carte_core::{
    new_document_id, AuthProvider, AuthUser, Document, DocumentStore, Error, Fields,
    ObjectStorage, Result, StorageRef, WriteOp,
};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, trace, warn};

use crate::images::{object_url, path_from_url};

type Collections = HashMap<String, BTreeMap<String, Fields>>;

/// Document store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetAll,
    Get,
    Query,
    Add,
    Set,
    Update,
    Delete,
    Transaction,
}

#[derive(Debug, Default)]
struct StoreFaults {
    failing: HashSet<StoreOp>,
    /// Abort the next transaction after staging this many writes.
    transaction_abort_after: Option<usize>,
    latency: Option<Duration>,
}

/// `HashMap`-based document store.
///
/// Documents within a collection iterate in id order. Store-assigned ids are
/// UUIDv7 hex strings, so added documents iterate in creation order.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<Collections>,
    faults: Mutex<StoreFaults>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`, to interleave concurrent operations.
    pub fn with_latency(self, latency: Duration) -> Self {
        if let Ok(mut faults) = self.faults.lock() {
            faults.latency = Some(latency);
        }
        self
    }

    /// Seed a document with a caller-chosen id.
    pub fn insert(&self, collection: &str, id: &str, data: Fields) -> Result<()> {
        self.write()?
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        Ok(())
    }

    /// Whether a document exists.
    pub fn contains(&self, collection: &str, id: &str) -> bool {
        self.read()
            .map(|c| c.get(collection).is_some_and(|docs| docs.contains_key(id)))
            .unwrap_or(false)
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.read()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Returns `true` if the collection holds no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Make every call of `op` fail until [`clear_faults`](Self::clear_faults).
    pub fn fail_on(&self, op: StoreOp) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.failing.insert(op);
        }
    }

    /// Abort the next transaction after `applied` of its writes were staged.
    ///
    /// With `applied` at or beyond the batch size the abort happens at commit.
    pub fn abort_next_transaction_after(&self, applied: usize) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.transaction_abort_after = Some(applied);
        }
    }

    /// Remove every injected failure.
    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.failing.clear();
            faults.transaction_abort_after = None;
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|_| Error::Store("document store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|_| Error::Store("document store lock poisoned".to_string()))
    }

    fn faults(&self) -> Result<MutexGuard<'_, StoreFaults>> {
        self.faults
            .lock()
            .map_err(|_| Error::Store("fault table lock poisoned".to_string()))
    }

    async fn enter(&self, op: StoreOp, collection: &str) -> Result<()> {
        let (failing, latency) = {
            let faults = self.faults()?;
            (faults.failing.contains(&op), faults.latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if failing {
            warn!(
                subsystem = "store",
                component = "memory_store",
                op = ?op,
                collection,
                "Injected store failure"
            );
            return Err(Error::Store(format!(
                "injected failure on {:?} in {}",
                op, collection
            )));
        }

        Ok(())
    }
}

fn apply_op(collections: &mut Collections, op: &WriteOp) -> Result<()> {
    match op {
        WriteOp::Set {
            collection,
            id,
            data,
            merge,
        } => {
            let docs = collections.entry(collection.clone()).or_default();
            match docs.get_mut(id) {
                Some(existing) if *merge => {
                    for (field, value) in data {
                        existing.insert(field.clone(), value.clone());
                    }
                }
                _ => {
                    docs.insert(id.clone(), data.clone());
                }
            }
            Ok(())
        }
        WriteOp::Update {
            collection,
            id,
            data,
        } => {
            let existing = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| Error::NotFound(format!("{}/{}", collection, id)))?;
            for (field, value) in data {
                existing.insert(field.clone(), value.clone());
            }
            Ok(())
        }
        WriteOp::Delete { collection, id } => {
            if let Some(docs) = collections.get_mut(collection) {
                docs.remove(id);
            }
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>> {
        self.enter(StoreOp::GetAll, collection).await?;
        let collections = self.read()?;
        let docs: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default();
        trace!(collection, result_count = docs.len(), "memory_store: get_all");
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.enter(StoreOp::Get, collection).await?;
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<Document>> {
        self.enter(StoreOp::Query, collection).await?;
        let collections = self.read()?;
        let docs: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| data.get(field) == Some(value))
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default();
        trace!(collection, field, result_count = docs.len(), "memory_store: query");
        Ok(docs)
    }

    async fn add(&self, collection: &str, data: Fields) -> Result<String> {
        self.enter(StoreOp::Add, collection).await?;
        let id = new_document_id();
        self.write()?
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data);
        debug!(collection, doc_id = %id, "memory_store: add");
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Fields, merge: bool) -> Result<()> {
        self.enter(StoreOp::Set, collection).await?;
        let op = WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
            merge,
        };
        let mut collections = self.write()?;
        apply_op(&mut collections, &op)
    }

    async fn update(&self, collection: &str, id: &str, data: Fields) -> Result<()> {
        self.enter(StoreOp::Update, collection).await?;
        let mut collections = self.write()?;
        apply_op(&mut collections, &WriteOp::update(collection, id, data))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.enter(StoreOp::Delete, collection).await?;
        let mut collections = self.write()?;
        apply_op(&mut collections, &WriteOp::delete(collection, id))
    }

    async fn run_transaction(&self, ops: Vec<WriteOp>) -> Result<()> {
        let scope = ops.first().map(|op| op.collection().to_string());
        self.enter(StoreOp::Transaction, scope.as_deref().unwrap_or(""))
            .await
            .map_err(|e| Error::Transaction(e.to_string()))?;
        let abort_after = self.faults()?.transaction_abort_after.take();

        let mut collections = self.write()?;
        let mut staged = collections.clone();

        for (applied, op) in ops.iter().enumerate() {
            if abort_after == Some(applied) {
                warn!(applied, total = ops.len(), "memory_store: injected transaction abort");
                return Err(Error::Transaction(format!(
                    "transaction aborted after {} of {} writes",
                    applied,
                    ops.len()
                )));
            }
            apply_op(&mut staged, op).map_err(|e| Error::Transaction(e.to_string()))?;
        }

        if abort_after.is_some_and(|n| n >= ops.len()) {
            warn!(total = ops.len(), "memory_store: injected abort at commit");
            return Err(Error::Transaction("transaction aborted at commit".to_string()));
        }

        *collections = staged;
        debug!(writes = ops.len(), "memory_store: transaction committed");
        Ok(())
    }
}

// =============================================================================
// OBJECT STORAGE
// =============================================================================

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: Option<String>,
    uploaded_at: DateTime<Utc>,
}

/// `BTreeMap`-based object storage that resolves URLs under a fixed base.
#[derive(Debug)]
pub struct InMemoryObjectStorage {
    base_url: String,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    fail_uploads: Mutex<bool>,
}

impl InMemoryObjectStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(BTreeMap::new()),
            fail_uploads: Mutex::new(false),
        }
    }

    /// Make uploads fail (or succeed again).
    pub fn set_fail_uploads(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_uploads.lock() {
            *flag = fail;
        }
    }

    /// Sorted paths of every stored object.
    pub fn paths(&self) -> Vec<String> {
        self.objects
            .read()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Bytes stored at `path`.
    pub fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(path).map(|o| o.bytes.clone()))
    }

    /// Content type recorded for `path`.
    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(path).and_then(|o| o.content_type.clone()))
    }

    /// Upload time recorded for `path`.
    pub fn uploaded_at(&self, path: &str) -> Option<DateTime<Utc>> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(path).map(|o| o.uploaded_at))
    }

    fn lock_poisoned() -> Error {
        Error::Storage("object storage lock poisoned".to_string())
    }
}

impl Default for InMemoryObjectStorage {
    fn default() -> Self {
        Self::new(carte_core::defaults::STORAGE_PUBLIC_BASE_URL)
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<StorageRef> {
        if *self.fail_uploads.lock().map_err(|_| Self::lock_poisoned())? {
            return Err(Error::Storage(format!("injected upload failure: {}", path)));
        }

        self.objects.write().map_err(|_| Self::lock_poisoned())?.insert(
            path.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.map(str::to_string),
                uploaded_at: Utc::now(),
            },
        );
        Ok(StorageRef::new(path))
    }

    async fn resolve_url(&self, reference: &StorageRef) -> Result<String> {
        let objects = self.objects.read().map_err(|_| Self::lock_poisoned())?;
        if !objects.contains_key(&reference.path) {
            return Err(Error::Storage(format!(
                "object does not exist: {}",
                reference.path
            )));
        }
        Ok(object_url(&self.base_url, &reference.path))
    }

    async fn delete_url(&self, url: &str) -> Result<()> {
        let path = path_from_url(&self.base_url, url)
            .ok_or_else(|| Error::Storage(format!("not a storage URL: {}", url)))?;
        let removed = self
            .objects
            .write()
            .map_err(|_| Self::lock_poisoned())?
            .remove(&path);
        if removed.is_none() {
            return Err(Error::Storage(format!("object does not exist: {}", path)));
        }
        Ok(())
    }
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    password: String,
}

/// Email/password accounts held in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuthProvider {
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<AuthUser>>,
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account and return its uid.
    pub fn register(&self, email: &str, password: &str) -> Result<String> {
        let uid = new_document_id();
        self.accounts
            .write()
            .map_err(|_| Error::Unauthorized("account table lock poisoned".to_string()))?
            .insert(
                email.to_string(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                },
            );
        Ok(uid)
    }

    /// Whether an account exists for `email`.
    pub fn has_account(&self, email: &str) -> bool {
        self.accounts
            .read()
            .map(|accounts| accounts.contains_key(email))
            .unwrap_or(false)
    }

    fn set_current(&self, user: Option<AuthUser>) -> Result<()> {
        *self
            .current
            .write()
            .map_err(|_| Error::Unauthorized("session lock poisoned".to_string()))? = user;
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let account = self
            .accounts
            .read()
            .map_err(|_| Error::Unauthorized("account table lock poisoned".to_string()))?
            .get(email)
            .cloned();

        match account {
            Some(account) if account.password == password => {
                let user = AuthUser {
                    uid: account.uid,
                    email: Some(email.to_string()),
                };
                self.set_current(Some(user.clone()))?;
                Ok(user)
            }
            _ => Err(Error::Unauthorized("Invalid email or password.".to_string())),
        }
    }

    async fn sign_out(&self) -> Result<()> {
        self.set_current(None)
    }

    async fn delete_user(&self, user: &AuthUser) -> Result<()> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| Error::Unauthorized("account table lock poisoned".to_string()))?;
        let before = accounts.len();
        accounts.retain(|_, account| account.uid != user.uid);
        if accounts.len() == before {
            return Err(Error::NotFound(format!("user {}", user.uid)));
        }
        drop(accounts);
        self.set_current(None)
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.current.read().ok().and_then(|current| current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use carte_core::to_fields;
    use serde_json::json;

    fn fields(value: JsonValue) -> Fields {
        to_fields(&value).unwrap()
    }

    #[tokio::test]
    async fn test_add_assigns_unique_ids() {
        let store = InMemoryDocumentStore::new();

        let a = store.add("categories", fields(json!({"name": "A"}))).await.unwrap();
        let b = store.add("categories", fields(json!({"name": "B"}))).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.len("categories"), 2);
    }

    #[tokio::test]
    async fn test_query_matches_field_value() {
        let store = InMemoryDocumentStore::new();
        store.insert("menuItems", "m1", fields(json!({"categoryId": "c1"}))).unwrap();
        store.insert("menuItems", "m2", fields(json!({"categoryId": "c2"}))).unwrap();
        store.insert("menuItems", "m3", fields(json!({"categoryId": "c1"}))).unwrap();

        let docs = store.query("menuItems", "categoryId", &json!("c1")).await.unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3"]);
    }

    #[tokio::test]
    async fn test_set_update_delete_through_trait_object() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());

        store
            .set("restaurantInfo", "info", fields(json!({"name": "Chez Nous"})), false)
            .await
            .unwrap();
        store
            .update("restaurantInfo", "info", fields(json!({"city": "Lyon"})))
            .await
            .unwrap();
        let doc = store.get("restaurantInfo", "info").await.unwrap().unwrap();
        assert_eq!(doc.get_str("name"), Some("Chez Nous"));
        assert_eq!(doc.get_str("city"), Some("Lyon"));

        store.delete("restaurantInfo", "info").await.unwrap();
        assert!(store.get("restaurantInfo", "info").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let store = InMemoryDocumentStore::new();

        let result = store.update("categories", "nope", Fields::new()).await;

        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = InMemoryDocumentStore::new();
        store
            .insert("categories", "c1", fields(json!({"name": "A", "image": "u"})))
            .unwrap();

        store
            .update("categories", "c1", fields(json!({"name": "B"})))
            .await
            .unwrap();

        let doc = store.get("categories", "c1").await.unwrap().unwrap();
        assert_eq!(doc.get_str("name"), Some("B"));
        assert_eq!(doc.get_str("image"), Some("u"));
    }

    #[tokio::test]
    async fn test_set_merge_and_overwrite() {
        let store = InMemoryDocumentStore::new();
        store
            .insert("slideImage", "image1", fields(json!({"imageUrl": "a", "alt": "x"})))
            .unwrap();

        store
            .set("slideImage", "image1", fields(json!({"imageUrl": "b"})), true)
            .await
            .unwrap();
        let doc = store.get("slideImage", "image1").await.unwrap().unwrap();
        assert_eq!(doc.get_str("alt"), Some("x"));
        assert_eq!(doc.get_str("imageUrl"), Some("b"));

        store
            .set("slideImage", "image1", fields(json!({"imageUrl": "c"})), false)
            .await
            .unwrap();
        let doc = store.get("slideImage", "image1").await.unwrap().unwrap();
        assert_eq!(doc.get_str("alt"), None);
    }

    #[tokio::test]
    async fn test_transaction_commits_all_writes() {
        let store = InMemoryDocumentStore::new();
        store.insert("menuItems", "m1", Fields::new()).unwrap();
        store.insert("categories", "c1", Fields::new()).unwrap();

        store
            .run_transaction(vec![
                WriteOp::delete("menuItems", "m1"),
                WriteOp::delete("categories", "c1"),
            ])
            .await
            .unwrap();

        assert!(store.is_empty("menuItems"));
        assert!(store.is_empty("categories"));
    }

    #[tokio::test]
    async fn test_transaction_abort_leaves_store_untouched() {
        let store = InMemoryDocumentStore::new();
        store.insert("menuItems", "m1", Fields::new()).unwrap();
        store.insert("menuItems", "m2", Fields::new()).unwrap();
        store.insert("categories", "c1", Fields::new()).unwrap();
        store.abort_next_transaction_after(2);

        let result = store
            .run_transaction(vec![
                WriteOp::delete("menuItems", "m1"),
                WriteOp::delete("menuItems", "m2"),
                WriteOp::delete("categories", "c1"),
            ])
            .await;

        assert!(matches!(result, Err(Error::Transaction(_))));
        assert_eq!(store.len("menuItems"), 2);
        assert!(store.contains("categories", "c1"));
    }

    #[tokio::test]
    async fn test_transaction_failed_update_rolls_back_earlier_writes() {
        let store = InMemoryDocumentStore::new();
        store.insert("menuItems", "m1", Fields::new()).unwrap();

        let result = store
            .run_transaction(vec![
                WriteOp::delete("menuItems", "m1"),
                WriteOp::update("categories", "missing", Fields::new()),
            ])
            .await;

        assert!(matches!(result, Err(Error::Transaction(_))));
        assert!(store.contains("menuItems", "m1"));
    }

    #[tokio::test]
    async fn test_abort_fault_is_consumed() {
        let store = InMemoryDocumentStore::new();
        store.insert("categories", "c1", Fields::new()).unwrap();
        store.abort_next_transaction_after(5);

        let first = store
            .run_transaction(vec![WriteOp::delete("categories", "c1")])
            .await;
        let second = store
            .run_transaction(vec![WriteOp::delete("categories", "c1")])
            .await;

        assert!(first.is_err());
        assert!(second.is_ok());
        assert!(!store.contains("categories", "c1"));
    }

    #[tokio::test]
    async fn test_injected_failures_and_clear() {
        let store = InMemoryDocumentStore::new();
        store.fail_on(StoreOp::GetAll);

        assert!(matches!(
            store.get_all("categories").await,
            Err(Error::Store(_))
        ));

        store.clear_faults();
        assert!(store.get_all("categories").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_object_storage_upload_resolve_delete() {
        let storage = InMemoryObjectStorage::new("https://cdn.test/o");

        let reference = storage
            .upload("categories/a.png", b"png", Some("image/png"))
            .await
            .unwrap();
        let url = storage.resolve_url(&reference).await.unwrap();

        assert_eq!(url, "https://cdn.test/o/categories%2Fa.png?alt=media");
        assert_eq!(storage.bytes("categories/a.png"), Some(b"png".to_vec()));
        assert_eq!(
            storage.content_type("categories/a.png").as_deref(),
            Some("image/png")
        );
        assert!(storage.uploaded_at("categories/a.png").is_some());

        storage.delete_url(&url).await.unwrap();
        assert!(storage.paths().is_empty());
    }

    #[tokio::test]
    async fn test_object_storage_injected_upload_failure() {
        let storage = InMemoryObjectStorage::default();
        storage.set_fail_uploads(true);

        let result = storage.upload("categories/a.png", b"png", None).await;

        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(storage.paths().is_empty());
    }

    #[tokio::test]
    async fn test_auth_provider_sign_in_and_out() {
        let auth = InMemoryAuthProvider::new();
        let uid = auth.register("chef@example.com", "s3cret").unwrap();

        let bad = auth.sign_in("chef@example.com", "wrong").await;
        assert!(matches!(bad, Err(Error::Unauthorized(_))));
        assert!(auth.current_user().is_none());

        let user = auth.sign_in("chef@example.com", "s3cret").await.unwrap();
        assert_eq!(user.uid, uid);
        assert_eq!(auth.current_user(), Some(user));

        auth.sign_out().await.unwrap();
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_auth_provider_delete_user() {
        let auth = InMemoryAuthProvider::new();
        auth.register("chef@example.com", "s3cret").unwrap();
        let user = auth.sign_in("chef@example.com", "s3cret").await.unwrap();

        auth.delete_user(&user).await.unwrap();

        assert!(!auth.has_account("chef@example.com"));
        assert!(auth.current_user().is_none());
        assert!(matches!(
            auth.delete_user(&user).await,
            Err(Error::NotFound(_))
        ));
    }
}
