//! The category state container.
//!
//! [`CategoryStore`] is the only writer of [`CategoriesState`]. Each operation
//! dispatches `Pending`, awaits the repository with no lock held, then
//! dispatches the settlement. Operations are not serialized against each
//! other: the last one to settle decides `loading` and `error`, while the
//! list accumulates every fulfilled change.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, warn};

use carte_core::defaults::{
    ADD_CATEGORY_REJECTION, DELETE_CATEGORY_REJECTION, FETCH_CATEGORIES_REJECTION,
    UPDATE_CATEGORY_REJECTION,
};
use carte_core::{Category, CategoryId, CategoryRepository, CategoryUpdate, NewCategory};

use crate::async_phase::{AsyncPhase, Rejection};
use crate::categories::{reduce, CategoriesState, CategoryAction};
use crate::store::StateStore;

#[derive(Clone)]
pub struct CategoryStore {
    state: StateStore<CategoriesState, CategoryAction>,
    repository: Arc<dyn CategoryRepository>,
}

impl CategoryStore {
    pub fn new(repository: Arc<dyn CategoryRepository>) -> Self {
        Self {
            state: StateStore::new(reduce),
            repository,
        }
    }

    /// Apply an action directly.
    pub fn dispatch(&self, action: CategoryAction) {
        debug!(subsystem = "state", component = "container", action = action.name(), "Dispatch");
        self.state.dispatch(action);
    }

    pub fn state(&self) -> CategoriesState {
        self.state.current()
    }

    pub fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CategoriesState) -> R,
    {
        self.state.with_state_ref(f)
    }

    pub fn subscribe(&self) -> watch::Receiver<CategoriesState> {
        self.state.subscribe()
    }

    /// Dispatch the settlement of `result` and hand it back to the caller.
    fn settle<T: Clone>(
        &self,
        started: Instant,
        result: Result<T, Rejection>,
        wrap: fn(AsyncPhase<T>) -> CategoryAction,
    ) -> Result<T, Rejection> {
        let action = wrap(result.clone().into());
        match &result {
            Ok(_) => debug!(
                subsystem = "state",
                component = "container",
                action = action.name(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Fulfilled"
            ),
            Err(rejection) => warn!(
                subsystem = "state",
                component = "container",
                action = action.name(),
                reason = %rejection,
                "Rejected"
            ),
        }
        self.dispatch(action);
        result
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, Rejection> {
        let started = Instant::now();
        self.dispatch(CategoryAction::FetchAll(AsyncPhase::Pending));

        let result = self
            .repository
            .try_list()
            .await
            .map_err(|_| Rejection::new(FETCH_CATEGORIES_REJECTION));
        self.settle(started, result, CategoryAction::FetchAll)
    }

    pub async fn create_category(&self, category: NewCategory) -> Result<Category, Rejection> {
        let started = Instant::now();
        self.dispatch(CategoryAction::Create(AsyncPhase::Pending));

        let result = self
            .repository
            .add(category)
            .await
            .map_err(|_| Rejection::new(ADD_CATEGORY_REJECTION));
        self.settle(started, result, CategoryAction::Create)
    }

    pub async fn modify_category(&self, update: CategoryUpdate) -> Result<Category, Rejection> {
        let started = Instant::now();
        self.dispatch(CategoryAction::Update(AsyncPhase::Pending));

        let result = self
            .repository
            .update(update)
            .await
            .map_err(|_| Rejection::new(UPDATE_CATEGORY_REJECTION));
        self.settle(started, result, CategoryAction::Update)
    }

    /// Delete a category; a refused or failed delete rejects with the
    /// repository's message.
    pub async fn remove_category(
        &self,
        id: &str,
        delete_associated_items: bool,
    ) -> Result<CategoryId, Rejection> {
        let started = Instant::now();
        self.dispatch(CategoryAction::Delete(AsyncPhase::Pending));

        let outcome = self.repository.delete(id, delete_associated_items).await;
        let result = if outcome.succeeded {
            Ok(id.to_string())
        } else {
            Err(Rejection::new(
                outcome
                    .message
                    .unwrap_or_else(|| DELETE_CATEGORY_REJECTION.to_string()),
            ))
        };
        self.settle(started, result, CategoryAction::Delete)
    }

    /// Record a rejection for an operation refused before reaching the repository.
    pub(crate) fn reject_update(&self, reason: &str) -> Rejection {
        let rejection = Rejection::new(reason);
        self.dispatch(CategoryAction::Update(AsyncPhase::Pending));
        self.dispatch(CategoryAction::Update(AsyncPhase::Rejected(
            rejection.0.clone(),
        )));
        rejection
    }
}
