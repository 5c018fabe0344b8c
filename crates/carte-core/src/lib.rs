//! # carte-core
//!
//! Core types, traits, and abstractions for the carte restaurant back-office.
//!
//! This crate provides the domain models, the error taxonomy, and the trait
//! definitions for the hosted backends (document store, object storage,
//! authentication) that the other carte crates depend on.

pub mod config;
pub mod defaults;
pub mod document;
pub mod error;
pub mod ids;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{CarteConfig, ConfigError, LogFormat, LoggingConfig, MissingNamePolicy};
pub use document::{to_fields, Document, Fields, StorageRef, WriteOp};
pub use error::{Error, Result};
pub use ids::new_document_id;
pub use models::*;
pub use traits::*;
