//! Store seams used by the selection engine.

use crate::{ReserveError, SpendCandidate, StateQuery, StoreError};
use async_trait::async_trait;
use vault_types::{ReservationId, StateRef};

/// Read side of the ledger state repository.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Return matching states in a stable, deterministic order with running
    /// cumulative totals.
    ///
    /// When `query.stop_at` is set a store may stop after the first row whose
    /// cumulative total reaches it. A store that cannot stop early returns
    /// every matching row. Callers must handle both.
    async fn query_unconsumed(&self, query: &StateQuery)
        -> Result<Vec<SpendCandidate>, StoreError>;
}

/// Soft-lock assignment over a state store.
#[async_trait]
pub trait ReservationManager: Send + Sync {
    /// Atomically lock every state in `refs` to `reservation`.
    ///
    /// Each state must be unconsumed and either unlocked or already held by
    /// `reservation`. If any state fails that check nothing is locked and
    /// [`ReserveError::Conflict`] lists the offenders. Repeating a call with
    /// the same reservation over states it already holds succeeds and
    /// changes nothing.
    async fn reserve(&self, refs: &[StateRef], reservation: ReservationId)
        -> Result<(), ReserveError>;

    /// Clear locks held by `reservation`.
    ///
    /// With `Some(refs)` only those states are considered; states held by
    /// another reservation are left untouched. With `None` every state held
    /// by `reservation` is released. Returns how many locks were cleared.
    async fn release(
        &self,
        reservation: ReservationId,
        refs: Option<&[StateRef]>,
    ) -> Result<usize, StoreError>;

    /// States currently soft-locked by `reservation`, in store order.
    async fn locked_by(&self, reservation: ReservationId) -> Result<Vec<StateRef>, StoreError>;
}
