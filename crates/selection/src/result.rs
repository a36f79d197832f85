//! Selection outcomes.

use vault_store::StoreError;
use vault_types::{LedgerState, StateRef};

/// Why an attempt did not end in a reservation.
///
/// Diagnostic only: every variant is retried the same way and all of them
/// surface to the caller as an unsatisfied result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Matching unlocked value fell short of the target.
    Insufficient {
        /// Total value found.
        available: u64,
    },

    /// A concurrent reservation claimed some rows between query and reserve.
    LockConflict {
        /// Number of rows that were no longer available.
        unavailable: usize,
    },

    /// The store failed during query or reserve.
    Store(StoreError),
}

/// Outcome of a selection.
///
/// When `satisfied` is true every state in `states` is soft-locked to the
/// request's reservation. When false, nothing was locked by this selection
/// and `states` is the candidate set seen by the final attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    /// Selected states in store order.
    pub states: Vec<LedgerState>,

    /// Sum of the selected quantities.
    pub total: u64,

    /// Whether `total` covers the target and the states were reserved.
    pub satisfied: bool,

    /// Attempts consumed.
    pub attempts: u32,

    /// Cause of the last failed attempt, if any attempt failed.
    pub last_failure: Option<AttemptFailure>,
}

impl SelectionResult {
    /// The trivially satisfied result for a zero target.
    pub fn empty() -> Self {
        Self {
            states: Vec::new(),
            total: 0,
            satisfied: true,
            attempts: 0,
            last_failure: None,
        }
    }

    /// References of the selected states.
    pub fn state_refs(&self) -> Vec<StateRef> {
        self.states.iter().map(|s| s.state_ref).collect()
    }

    /// Whether no states were selected.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
