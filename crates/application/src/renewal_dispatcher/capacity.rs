use std::collections::HashSet;
use std::sync::PoisonError;

use super::*;

/// Concurrency budget shared by all jobs of one dispatcher.
///
/// Tracks the ids of records whose jobs hold a token, so the same record can
/// never be claimed twice while a job for it is alive.
#[derive(Debug)]
pub struct CapacityBudget {
    max: usize,
    held: std::sync::Mutex<HashSet<AccountId>>,
}

impl CapacityBudget {
    /// Creates an empty budget.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            max,
            held: std::sync::Mutex::new(HashSet::new()),
        }
    }

    /// Takes a token for `id`, or `None` when full or `id` is already held.
    pub fn try_acquire(self: &Arc<Self>, id: AccountId) -> Option<CapacityToken> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if held.len() >= self.max || !held.insert(id) {
            return None;
        }

        Some(CapacityToken {
            budget: Arc::clone(self),
            id,
        })
    }

    /// Tokens currently held.
    #[must_use]
    pub fn active(&self) -> usize {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Tokens still available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.max.saturating_sub(self.active())
    }

    fn release(&self, id: AccountId) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// Capacity held by one job; released when dropped.
#[derive(Debug)]
pub struct CapacityToken {
    budget: Arc<CapacityBudget>,
    id: AccountId,
}

impl CapacityToken {
    /// Record the token was taken for.
    #[must_use]
    pub fn record_id(&self) -> AccountId {
        self.id
    }
}

impl Drop for CapacityToken {
    fn drop(&mut self) {
        self.budget.release(self.id);
    }
}
