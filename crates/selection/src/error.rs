//! Error types for state selection.

use std::time::Duration;
use thiserror::Error;

/// A malformed selection request.
///
/// These are the only errors `select` returns. Shortfalls, lock conflicts and
/// store failures are reported through [`crate::SelectionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The currency code is empty.
    #[error("Currency code is empty")]
    EmptyCurrency,

    /// The currency code contains characters other than ASCII letters and digits.
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// An issuer reference in the filter carries no bytes.
    #[error("Issuer reference filter contains an empty reference")]
    EmptyIssuerRef,

    /// The retry policy allows no attempts.
    #[error("Retry policy must allow at least one attempt")]
    NoAttempts,

    /// The backoff base delay exceeds the cap.
    #[error("Backoff base delay {base:?} exceeds cap {cap:?}")]
    BaseExceedsCap {
        /// Configured base delay.
        base: Duration,
        /// Configured cap.
        cap: Duration,
    },
}
