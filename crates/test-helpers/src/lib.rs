//! Shared fixtures for state selection tests.
//!
//! Every fixture is deterministic: the same index always yields the same
//! [`StateRef`], so tests can name expected states by position.

use vault_store::InMemoryStateStore;
use vault_types::{
    Amount, Currency, Hash, IssuerRef, LedgerState, Party, ReservationId, StateRef,
};

/// An amount of pounds sterling in pennies.
pub fn gbp(quantity: u64) -> Amount {
    Amount::new(quantity, Currency::new("GBP"))
}

/// An amount of US dollars in cents.
pub fn usd(quantity: u64) -> Amount {
    Amount::new(quantity, Currency::new("USD"))
}

/// Reservation ids `1..=n`.
pub fn reservations(n: u128) -> Vec<ReservationId> {
    (1..=n).map(ReservationId::new).collect()
}

/// Well-known parties and state builders.
#[derive(Debug, Clone)]
pub struct Fixtures {
    /// Owner of every fixture state.
    pub owner: Party,
    /// Default issuer.
    pub bank: Party,
    /// A second issuer that fixture states never use unless asked.
    pub other_bank: Party,
    /// Default notary.
    pub notary: Party,
    /// Default issuer reference.
    pub issuer_ref: IssuerRef,
}

impl Default for Fixtures {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixtures {
    /// Create the standard fixture parties.
    pub fn new() -> Self {
        Self {
            owner: Party::from_name("Alice Corp"),
            bank: Party::from_name("Bank of London"),
            other_bank: Party::from_name("Bank of Zurich"),
            notary: Party::from_name("Notary Service"),
            issuer_ref: IssuerRef::new(vec![0x01]),
        }
    }

    /// Reference of the `index`-th fixture GBP state.
    pub fn gbp_ref(&self, index: u32) -> StateRef {
        StateRef::new(Hash::from_bytes(b"gbp-issuance"), index)
    }

    /// Reference of the `index`-th fixture USD state.
    pub fn usd_ref(&self, index: u32) -> StateRef {
        StateRef::new(Hash::from_bytes(b"usd-issuance"), index)
    }

    /// A GBP state issued by [`Self::bank`].
    pub fn gbp_state(&self, index: u32, quantity: u64) -> LedgerState {
        self.state(self.gbp_ref(index), gbp(quantity), &self.bank)
    }

    /// A USD state issued by [`Self::bank`].
    pub fn usd_state(&self, index: u32, quantity: u64) -> LedgerState {
        self.state(self.usd_ref(index), usd(quantity), &self.bank)
    }

    /// A state with the fixture owner, reference and notary.
    pub fn state(&self, state_ref: StateRef, amount: Amount, issuer: &Party) -> LedgerState {
        LedgerState::issued(
            state_ref,
            self.owner.clone(),
            amount,
            issuer.clone(),
            self.issuer_ref.clone(),
            self.notary.clone(),
        )
    }

    /// A store holding one unlocked GBP state per quantity, in order.
    pub fn store_with_gbp(&self, quantities: &[u64]) -> InMemoryStateStore {
        let store = InMemoryStateStore::new();
        for (i, quantity) in quantities.iter().enumerate() {
            store
                .record(self.gbp_state(i as u32, *quantity))
                .expect("fixture refs are unique");
        }
        store
    }
}
