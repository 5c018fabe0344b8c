//! The three phases of an asynchronous operation's effect on shared state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of one asynchronous operation, as seen by a reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "payload", rename_all = "snake_case")]
pub enum AsyncPhase<T> {
    /// Issued, not settled yet.
    Pending,
    /// Settled with a value.
    Fulfilled(T),
    /// Settled with a user-facing reason.
    Rejected(String),
}

impl<T> From<Result<T, Rejection>> for AsyncPhase<T> {
    fn from(result: Result<T, Rejection>) -> Self {
        match result {
            Ok(value) => AsyncPhase::Fulfilled(value),
            Err(rejection) => AsyncPhase::Rejected(rejection.0),
        }
    }
}

/// The reason an operation was rejected, as shown to the user.
///
/// Only this string reaches the view layer; the underlying error is logged
/// where it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{0}")]
pub struct Rejection(pub String);

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        let ok: AsyncPhase<u8> = Ok(1).into();
        let err: AsyncPhase<u8> = Err(Rejection::new("nope")).into();

        assert_eq!(ok, AsyncPhase::Fulfilled(1));
        assert_eq!(err, AsyncPhase::Rejected("nope".to_string()));
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(AsyncPhase::Fulfilled("c1")).unwrap();
        assert_eq!(value, serde_json::json!({ "phase": "fulfilled", "payload": "c1" }));

        let value = serde_json::to_value(AsyncPhase::<String>::Pending).unwrap();
        assert_eq!(value, serde_json::json!({ "phase": "pending" }));
    }

    #[test]
    fn test_rejection_display() {
        assert_eq!(Rejection::new("Failed to add category").to_string(), "Failed to add category");
    }
}
