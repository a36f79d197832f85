//! Core types for ledger state selection.
//!
//! This crate holds the data model shared by the store contract, the
//! selection engine and the simulator:
//!
//! - [`LedgerState`]: one unspent (or spent) output of a prior transaction
//! - [`StateRef`]: the `(transaction hash, output index)` key of a state
//! - [`ReservationId`]: the soft-lock owner correlating a lock to a flow
//! - [`Amount`], [`Currency`], [`IssuerRef`]: fungible value and its origin
//! - [`Party`]: owner, issuer and notary identities

mod amount;
mod hash;
mod identifiers;
mod party;
mod state;

pub use amount::{Amount, Currency, IssuerRef};
pub use hash::Hash;
pub use identifiers::{ReservationId, StateRef};
pub use party::Party;
pub use state::{LedgerState, StateStatus};
