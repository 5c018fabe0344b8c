//! # carte-state
//!
//! Async state containers for the carte back-office.
//!
//! Each container owns one slice of shared state, applies actions through a
//! pure reducer, and publishes every change over a watch channel. Async
//! operations move through `Pending` and then `Fulfilled` or `Rejected`.
//!
//! ```no_run
//! use carte_db::Backend;
//! use carte_state::{CategoryManager, CategoryStore};
//!
//! # async fn demo() {
//! let backend = Backend::in_memory();
//! let manager = CategoryManager::mount(CategoryStore::new(backend.categories.clone())).await;
//! println!("{} categories", manager.categories().len());
//! # }
//! ```

pub mod async_phase;
pub mod auth;
pub mod categories;
pub mod container;
pub mod manager;
pub mod slide_images;
pub mod store;

pub use async_phase::{AsyncPhase, Rejection};
pub use auth::{AuthAction, AuthController, AuthState, AuthStatus};
pub use categories::{CategoriesState, CategoryAction};
pub use container::CategoryStore;
pub use manager::{CategoryChanges, CategoryManager};
pub use slide_images::{SlideImagesAction, SlideImagesController, SlideImagesState};
pub use store::{Reducer, StateStore};
