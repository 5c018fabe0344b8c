//! Schemaless document types exchanged with the document store.
//!
//! A [`Document`] is an id plus a JSON object body, the same shape the hosted
//! document database returns. Typed models are decoded from documents with
//! [`Document::decode`], which folds the id into the body under `"id"`.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A document body: field name to JSON value.
pub type Fields = serde_json::Map<String, Value>;

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Fields) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// String value of a top-level field, if present and a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    /// Decode the document into a typed model, with the id merged into the body.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let mut body = self.data.clone();
        body.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(body))?)
    }
}

/// Serialize a value into a document body.
///
/// Fails with [`Error::Serialization`] when the value is not a JSON object.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::Serialization(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// One write inside an atomic transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or overwrite a document. With `merge`, only the given fields are replaced.
    Set {
        collection: String,
        id: String,
        data: Fields,
        merge: bool,
    },
    /// Replace the given fields of an existing document. Aborts the
    /// transaction when the document does not exist.
    Update {
        collection: String,
        id: String,
        data: Fields,
    },
    /// Delete a document. Deleting a missing document is not an error.
    Delete { collection: String, id: String },
}

impl WriteOp {
    pub fn delete(collection: impl Into<String>, id: impl Into<String>) -> Self {
        WriteOp::Delete {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn update(collection: impl Into<String>, id: impl Into<String>, data: Fields) -> Self {
        WriteOp::Update {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Set { collection, .. }
            | WriteOp::Update { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Set { id, .. } | WriteOp::Update { id, .. } | WriteOp::Delete { id, .. } => id,
        }
    }
}

/// Reference to an uploaded object, as returned by object storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageRef {
    /// Namespaced object path, e.g. `categories/pasta.jpg`.
    pub path: String,
}

impl StorageRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}
