//! Error types for store access and reservation.

use thiserror::Error;
use vault_types::{ReservationId, StateRef};

/// Errors raised by a state store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or the operation timed out.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store aborted the operation because of a concurrent update.
    #[error("Serialization conflict: {0}")]
    Serialization(String),

    /// A state with this reference has already been recorded.
    #[error("State already recorded: {0}")]
    DuplicateState(StateRef),

    /// No state with this reference exists.
    #[error("Unknown state: {0}")]
    UnknownState(StateRef),
}

/// One or more requested states could not be soft-locked.
///
/// Raised when a state is locked by a different reservation, has been
/// consumed, or does not exist. No lock from the batch was applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} of {requested} states unavailable to {reservation}", .unavailable.len())]
pub struct LockConflict {
    /// Reservation that attempted the lock.
    pub reservation: ReservationId,

    /// Number of states in the batch.
    pub requested: usize,

    /// States whose precondition failed.
    pub unavailable: Vec<StateRef>,
}

/// Outcome of a failed reservation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReserveError {
    /// Routine race: another reservation holds at least one state.
    #[error(transparent)]
    Conflict(#[from] LockConflict),

    /// The store itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
