//! Category list state and its reducer.

use serde::{Deserialize, Serialize};

use carte_core::{Category, CategoryId};

use crate::async_phase::AsyncPhase;

/// Categories as shown by the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoriesState {
    pub categories: Vec<Category>,
    /// Set by any `Pending`, cleared by any settlement.
    pub loading: bool,
    /// Reason of the most recent rejection, cleared by the next `Pending`.
    pub error: Option<String>,
}

/// A phase of one category operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CategoryAction {
    FetchAll(AsyncPhase<Vec<Category>>),
    Create(AsyncPhase<Category>),
    Update(AsyncPhase<Category>),
    Delete(AsyncPhase<CategoryId>),
}

impl CategoryAction {
    pub fn name(&self) -> &'static str {
        match self {
            CategoryAction::FetchAll(_) => "categories/fetchAll",
            CategoryAction::Create(_) => "categories/add",
            CategoryAction::Update(_) => "categories/update",
            CategoryAction::Delete(_) => "categories/delete",
        }
    }
}

/// Apply the loading/error part of a phase, yielding the fulfilled value.
fn settle<T>(state: &mut CategoriesState, phase: AsyncPhase<T>) -> Option<T> {
    match phase {
        AsyncPhase::Pending => {
            state.loading = true;
            state.error = None;
            None
        }
        AsyncPhase::Rejected(reason) => {
            state.loading = false;
            state.error = Some(reason);
            None
        }
        AsyncPhase::Fulfilled(value) => {
            state.loading = false;
            Some(value)
        }
    }
}

/// Apply one action to the state.
///
/// Fulfilled updates for an id that is not in the list and deletes of an
/// absent id leave the list unchanged.
pub fn reduce(mut state: CategoriesState, action: CategoryAction) -> CategoriesState {
    match action {
        CategoryAction::FetchAll(phase) => {
            if let Some(fetched) = settle(&mut state, phase) {
                state.categories = fetched;
            }
        }
        CategoryAction::Create(phase) => {
            if let Some(created) = settle(&mut state, phase) {
                state.categories.push(created);
            }
        }
        CategoryAction::Update(phase) => {
            if let Some(updated) = settle(&mut state, phase) {
                if let Some(slot) = state.categories.iter_mut().find(|c| c.id == updated.id) {
                    *slot = updated;
                }
            }
        }
        CategoryAction::Delete(phase) => {
            if let Some(id) = settle(&mut state, phase) {
                state.categories.retain(|c| c.id != id);
            }
        }
    }
    state
}
