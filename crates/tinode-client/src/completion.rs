//! Completion registry.
//!
//! Maps ids of unacknowledged requests to the one-shot callback that runs
//! when the server accepts them.
//!
//! # Invariants
//!
//! - An id holds at most one callback; re-registering a live id is refused
//!   and the existing entry is kept.
//! - Resolving an id always removes its entry, so a callback runs at most
//!   once. It runs only for success-range codes; a failure discards it.

use std::collections::HashMap;

use tinode_proto::{Params, is_success_code};

use crate::error::CompletionError;

/// Callback invoked with the ack's parameters.
pub type Completion = Box<dyn FnOnce(&Params) + Send>;

/// Pending callbacks keyed by request id.
#[derive(Default)]
pub struct Completions {
    pending: HashMap<String, Completion>,
}

impl Completions {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `callback` to `id`.
    ///
    /// # Errors
    ///
    /// - `CompletionError::AlreadyRegistered` if `id` is still pending
    pub fn register(&mut self, id: impl Into<String>, callback: Completion) -> Result<(), CompletionError> {
        let id = id.into();
        if self.pending.contains_key(&id) {
            return Err(CompletionError::AlreadyRegistered(id));
        }
        self.pending.insert(id, callback);
        Ok(())
    }

    /// Settle `id` with an ack status.
    ///
    /// Returns true if a callback ran.
    pub fn resolve(&mut self, id: &str, code: u16, params: &Params) -> bool {
        let Some(callback) = self.pending.remove(id) else {
            return false;
        };

        if is_success_code(code) {
            callback(params);
            true
        } else {
            tracing::debug!(id, code, "request failed, dropping completion");
            false
        }
    }

    /// Whether `id` has a pending callback.
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    /// Number of pending callbacks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl std::fmt::Debug for Completions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completions").field("pending", &self.pending.keys().collect::<Vec<_>>()).finish()
    }
}
