//! Ledger state and its soft-lock marker.

use crate::{Amount, Currency, IssuerRef, Party, ReservationId, StateRef};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a ledger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateStatus {
    /// Not yet spent. Eligible for selection.
    Unconsumed,
    /// Spent by a finalized transaction.
    Consumed,
}

/// An output of a prior transaction denominated in fungible value.
///
/// A lock owner may only be present while the state is unconsumed. The
/// store enforces this when it transitions a state to
/// [`StateStatus::Consumed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Key of this state.
    pub state_ref: StateRef,

    /// Current owner of the value.
    pub owner: Party,

    /// Value carried by the state.
    pub amount: Amount,

    /// Party that issued the value.
    pub issuer: Party,

    /// Issuer-assigned reference.
    pub issuer_ref: IssuerRef,

    /// Notary responsible for the state.
    pub notary: Party,

    /// Lifecycle status.
    pub status: StateStatus,

    /// Current soft-lock owner, if any.
    pub lock_owner: Option<ReservationId>,
}

impl LedgerState {
    /// Create a freshly issued, unconsumed and unlocked state.
    pub fn issued(
        state_ref: StateRef,
        owner: Party,
        amount: Amount,
        issuer: Party,
        issuer_ref: IssuerRef,
        notary: Party,
    ) -> Self {
        Self {
            state_ref,
            owner,
            amount,
            issuer,
            issuer_ref,
            notary,
            status: StateStatus::Unconsumed,
            lock_owner: None,
        }
    }

    /// Provisionally lock this state to the reservation that produced it.
    pub fn locked_to(mut self, reservation: ReservationId) -> Self {
        self.lock_owner = Some(reservation);
        self
    }

    /// Mark this state as spent, dropping any lock.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn consumed(mut self) -> Self {
        self.status = StateStatus::Consumed;
        self.lock_owner = None;
        self
    }

    /// Quantity in minor units.
    pub fn quantity(&self) -> u64 {
        self.amount.quantity
    }

    /// Currency of the carried value.
    pub fn currency(&self) -> &Currency {
        &self.amount.currency
    }

    /// Whether the state is still unspent.
    pub fn is_unconsumed(&self) -> bool {
        self.status == StateStatus::Unconsumed
    }

    /// Whether the given reservation may claim this state.
    ///
    /// True for unconsumed states that are unlocked or already locked by
    /// `reservation`.
    pub fn is_claimable_by(&self, reservation: ReservationId) -> bool {
        self.is_unconsumed()
            && match self.lock_owner {
                None => true,
                Some(owner) => owner == reservation,
            }
    }
}
