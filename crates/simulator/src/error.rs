//! Simulator errors.

use thiserror::Error;
use vault_selection::SelectionError;
use vault_store::StoreError;

/// Errors that abort a simulation run.
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// The configuration file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`crate::SimulatorConfig`].
    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// The configuration is inconsistent.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// A flow built a malformed selection request.
    #[error("Selection rejected: {0}")]
    Selection(#[from] SelectionError),

    /// The store failed outside the selection retry loop.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The attempts histogram could not be created.
    #[error("Metrics error: {0}")]
    Metrics(#[from] hdrhistogram::CreationError),

    /// A flow task panicked or was cancelled.
    #[error("Flow task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
