//! State store and soft-lock reservation contracts.
//!
//! The selection engine never talks to a concrete database. It sees two
//! seams:
//!
//! - [`StateStore`]: filtered query of unconsumed states with a running
//!   cumulative total in a stable order, optionally terminating as soon as
//!   the total reaches a target.
//! - [`ReservationManager`]: atomic, all-or-nothing conditional assignment
//!   of a soft-lock owner over a batch of states.
//!
//! ```text
//!   SelectionEngine
//!        │ query_unconsumed(StateQuery)        reserve(refs, R)
//!        ▼                                          ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │ InMemoryStateStore                                       │
//! │   IndexMap<StateRef, LedgerState>  (insertion order)     │
//! │   RwLock: reserve checks + applies under one write guard │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Stores that cannot compute running totals server-side can build the
//! same rows client-side with [`running_totals`].

mod error;
mod fault;
mod memory;
mod query;
mod traits;

pub use error::{LockConflict, ReserveError, StoreError};
pub use fault::FaultInjector;
pub use memory::InMemoryStateStore;
pub use query::{running_totals, SpendCandidate, StateQuery};
pub use traits::{ReservationManager, StateStore};
