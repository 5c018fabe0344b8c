//! Single-writer state store over a watch channel.
//!
//! Readers borrow the latest state without locking the writer out; every
//! write goes through [`StateStore::dispatch`], which applies the reducer.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

/// Pure state transition function.
pub type Reducer<S, A> = fn(S, A) -> S;

/// Owns one piece of state and applies actions to it.
pub struct StateStore<S, A> {
    sender: Arc<watch::Sender<S>>,
    reducer: Reducer<S, A>,
}

impl<S, A> Clone for StateStore<S, A> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
            reducer: self.reducer,
        }
    }
}

impl<S: fmt::Debug, A> fmt::Debug for StateStore<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &*self.sender.borrow())
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl<S: Clone + Default, A> StateStore<S, A> {
    /// Create a store holding `S::default()`.
    pub fn new(reducer: Reducer<S, A>) -> Self {
        Self::with_state(S::default(), reducer)
    }

    pub fn with_state(initial: S, reducer: Reducer<S, A>) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
            reducer,
        }
    }

    /// Apply `action` and notify subscribers.
    ///
    /// Succeeds whether or not anyone is subscribed.
    pub fn dispatch(&self, action: A) {
        let reducer = self.reducer;
        self.sender.send_modify(|state| {
            let previous = std::mem::take(state);
            *state = reducer(previous, action);
        });
        trace!(
            subsystem = "state",
            subscribers = self.sender.receiver_count(),
            "Action dispatched"
        );
    }

    /// A copy of the current state.
    pub fn current(&self) -> S {
        self.sender.borrow().clone()
    }

    /// Read the current state without cloning it.
    pub fn with_state_ref<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        f(&self.sender.borrow())
    }

    /// Receiver that observes every dispatched change.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.sender.subscribe()
    }
}
