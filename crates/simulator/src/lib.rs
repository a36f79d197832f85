//! Vault selection simulator
//!
//! Drives many concurrent flows against one shared state store and checks
//! that soft-lock reservations never overlap, however hard they contend.
//!
//! # Architecture
//!
//! - **Store seeding**: `num_states` unlocked states of one currency
//! - **Processes**: each simulated process owns one [`SelectionGate`];
//!   flows are assigned round-robin, so flows in different processes race
//!   through reserve conflicts instead of the gate
//! - **Flow lifecycle**: select, hold the reservation, then either spend it
//!   (consume and record change) or release it
//! - **Audit**: a live-reservation map flags any state held by two
//!   reservations at once
//!
//! # Example
//!
//! ```ignore
//! use vault_simulator::{Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::default().with_flows(64).with_processes(2);
//! let report = Simulator::new(config).run().await?;
//! report.print();
//! ```
//!
//! [`SelectionGate`]: vault_selection::SelectionGate

pub mod config;
pub mod error;
pub mod metrics;
pub mod runner;

pub use config::SimulatorConfig;
pub use error::SimulatorError;
pub use metrics::{MetricsCollector, SimulationReport};
pub use runner::Simulator;
