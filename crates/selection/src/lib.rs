//! Soft-lock state selection.
//!
//! Given a target amount and filters, the [`SelectionEngine`] picks
//! unconsumed states whose combined value covers the target and soft-locks
//! them to the caller's reservation, such that no two concurrent flows ever
//! hold the same state.
//!
//! # Algorithm
//!
//! ```text
//! for attempt in 1..=max_attempts
//!   ┌──────────── SelectionGate (one per process) ────────────┐
//!   │ query_unconsumed(filters, stop_at = target)             │
//!   │ accumulate rows in store order until total >= target    │
//!   │ total >= target ? reserve(refs, R) : fail attempt       │
//!   └─────────────────────────────────────────────────────────┘
//!   reserved      -> return satisfied
//!   failed        -> sleep min(base << attempt, cap / 2) * [1.0, 2.0)
//! return last partial selection, satisfied = false
//! ```
//!
//! The gate serializes the query-and-decide step between every attempt in
//! the process, so two local attempts never pick the same unlocked rows.
//! Races with other processes surface as a lock conflict from `reserve` and
//! are absorbed by the retry loop.
//!
//! # Components
//!
//! - [`SelectionEngine`] - retry loop, aggregation and reservation
//! - [`SelectionGate`] - the named mutual-exclusion region
//! - [`RetryPolicy`] - attempt budget and backoff parameters
//! - [`JitterSource`] / [`Sleeper`] - injectable randomness and clock

mod backoff;
mod clock;
mod config;
mod engine;
mod error;
mod gate;
mod request;
mod result;

pub use backoff::{FixedJitter, JitterSource, SeededJitter};
pub use clock::{Sleeper, TokioSleeper, VirtualClock};
pub use config::RetryPolicy;
pub use engine::SelectionEngine;
pub use error::SelectionError;
pub use gate::{GateGuard, SelectionGate};
pub use request::{SelectionCriteria, SelectionRequest};
pub use result::{AttemptFailure, SelectionResult};
