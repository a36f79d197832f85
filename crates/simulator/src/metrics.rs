//! Outcome collection and reporting.

use hdrhistogram::{CreationError, Histogram};
use vault_selection::{AttemptFailure, SelectionResult};

/// What a flow did with its selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowDisposition {
    /// Reserved, then spent.
    Spent,
    /// Reserved, then released.
    Released,
    /// Never reserved.
    Unsatisfied,
}

/// Accumulates per-flow outcomes during a run.
pub struct MetricsCollector {
    attempts: Histogram<u64>,
    spent: u64,
    released: u64,
    unsatisfied: u64,
    value_spent: u64,
    last_conflicts: u64,
    last_store_errors: u64,
    overlaps: u64,
}

impl MetricsCollector {
    /// Create an empty collector.
    pub fn new() -> Result<Self, CreationError> {
        Ok(Self {
            attempts: Histogram::new_with_bounds(1, 1024, 2)?,
            spent: 0,
            released: 0,
            unsatisfied: 0,
            value_spent: 0,
            last_conflicts: 0,
            last_store_errors: 0,
            overlaps: 0,
        })
    }

    /// Record one flow's selection and what it did next.
    pub fn record(&mut self, result: &SelectionResult, disposition: FlowDisposition, spent: u64) {
        self.attempts.saturating_record(u64::from(result.attempts.max(1)));

        match disposition {
            FlowDisposition::Spent => {
                self.spent += 1;
                self.value_spent += spent;
            }
            FlowDisposition::Released => self.released += 1,
            FlowDisposition::Unsatisfied => {
                self.unsatisfied += 1;
                match result.last_failure {
                    Some(AttemptFailure::LockConflict { .. }) => self.last_conflicts += 1,
                    Some(AttemptFailure::Store(_)) => self.last_store_errors += 1,
                    _ => {}
                }
            }
        }
    }

    /// Record a state observed under two live reservations.
    pub fn record_overlap(&mut self) {
        self.overlaps += 1;
    }

    /// Produce the final report.
    pub fn report(&self, flows: u32, value_remaining: u64) -> SimulationReport {
        SimulationReport {
            flows,
            spent: self.spent,
            released: self.released,
            unsatisfied: self.unsatisfied,
            value_spent: self.value_spent,
            value_remaining,
            unsatisfied_by_conflict: self.last_conflicts,
            unsatisfied_by_store_error: self.last_store_errors,
            overlaps: self.overlaps,
            attempts_p50: self.attempts.value_at_quantile(0.5),
            attempts_p99: self.attempts.value_at_quantile(0.99),
            attempts_max: self.attempts.max(),
        }
    }
}

/// Summary of a simulation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationReport {
    /// Flows started.
    pub flows: u32,
    /// Flows that reserved and spent.
    pub spent: u64,
    /// Flows that reserved and released.
    pub released: u64,
    /// Flows that never reserved.
    pub unsatisfied: u64,
    /// Value handed to payees by spending flows.
    pub value_spent: u64,
    /// Unconsumed value left in the store, change included.
    pub value_remaining: u64,
    /// Unsatisfied flows whose last attempt hit a lock conflict.
    pub unsatisfied_by_conflict: u64,
    /// Unsatisfied flows whose last attempt hit a store error.
    pub unsatisfied_by_store_error: u64,
    /// States observed under two live reservations. Must be zero.
    pub overlaps: u64,
    /// Median attempts per selection.
    pub attempts_p50: u64,
    /// 99th percentile attempts per selection.
    pub attempts_p99: u64,
    /// Most attempts any selection used.
    pub attempts_max: u64,
}

impl SimulationReport {
    /// Flows that obtained a reservation.
    pub fn satisfied(&self) -> u64 {
        self.spent + self.released
    }

    /// Print a human-readable summary.
    pub fn print(&self) {
        println!("flows:           {}", self.flows);
        println!(
            "satisfied:       {} (spent {}, released {})",
            self.satisfied(),
            self.spent,
            self.released
        );
        println!(
            "unsatisfied:     {} (last conflict {}, last store error {})",
            self.unsatisfied, self.unsatisfied_by_conflict, self.unsatisfied_by_store_error
        );
        println!(
            "attempts:        p50 {} p99 {} max {}",
            self.attempts_p50, self.attempts_p99, self.attempts_max
        );
        println!("value spent:     {}", self.value_spent);
        println!("value remaining: {}", self.value_remaining);
        println!("overlaps:        {}", self.overlaps);
    }
}
