//! Configuration types for the simulator.

use crate::SimulatorError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use vault_selection::RetryPolicy;
use vault_types::Currency;

/// Configuration for a simulation run.
///
/// Every field has a default, so a TOML file only needs the values it
/// changes:
///
/// ```toml
/// flows = 128
/// processes = 2
///
/// [retry]
/// max_attempts = 4
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Number of states seeded into the store.
    pub num_states: u32,

    /// Quantity of each seeded state.
    pub state_value: u64,

    /// Currency of every seeded state and request.
    pub currency: String,

    /// Number of concurrent flows.
    pub flows: u32,

    /// Number of simulated processes, each with its own selection gate.
    pub processes: u32,

    /// Smallest amount a flow requests.
    pub min_amount: u64,

    /// Largest amount a flow requests.
    pub max_amount: u64,

    /// Probability that a satisfied flow spends rather than releases.
    pub spend_ratio: f64,

    /// Longest time a flow holds its reservation, in milliseconds.
    pub max_hold_ms: u64,

    /// Use instant virtual time instead of tokio timers.
    pub virtual_time: bool,

    /// Random seed for deterministic flow behaviour.
    pub seed: u64,

    /// Retry policy used by every flow.
    pub retry: RetryPolicy,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            num_states: 200,
            state_value: 100,
            currency: "GBP".to_string(),
            flows: 64,
            processes: 1,
            min_amount: 50,
            max_amount: 500,
            spend_ratio: 0.5,
            max_hold_ms: 50,
            virtual_time: true,
            seed: 12345,
            retry: RetryPolicy::default(),
        }
    }
}

impl SimulatorConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, SimulatorError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, SimulatorError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), SimulatorError> {
        if self.processes == 0 {
            return Err(SimulatorError::Invalid("processes must be at least 1".into()));
        }
        if self.min_amount > self.max_amount {
            return Err(SimulatorError::Invalid(format!(
                "min_amount {} exceeds max_amount {}",
                self.min_amount, self.max_amount
            )));
        }
        if !(0.0..=1.0).contains(&self.spend_ratio) {
            return Err(SimulatorError::Invalid(format!(
                "spend_ratio {} outside [0, 1]",
                self.spend_ratio
            )));
        }
        Ok(())
    }

    /// Currency as a domain type.
    pub fn currency(&self) -> Currency {
        Currency::new(self.currency.clone())
    }

    /// Maximum hold time.
    pub fn max_hold(&self) -> Duration {
        Duration::from_millis(self.max_hold_ms)
    }

    /// Total value seeded into the store.
    pub fn total_value(&self) -> u64 {
        u64::from(self.num_states).saturating_mul(self.state_value)
    }

    /// Set the number of seeded states.
    pub fn with_states(mut self, num_states: u32, state_value: u64) -> Self {
        self.num_states = num_states;
        self.state_value = state_value;
        self
    }

    /// Set the number of flows.
    pub fn with_flows(mut self, flows: u32) -> Self {
        self.flows = flows;
        self
    }

    /// Set the number of simulated processes.
    pub fn with_processes(mut self, processes: u32) -> Self {
        self.processes = processes;
        self
    }

    /// Set the requested amount range.
    pub fn with_amount_range(mut self, min_amount: u64, max_amount: u64) -> Self {
        self.min_amount = min_amount;
        self.max_amount = max_amount;
        self
    }

    /// Set the spend probability.
    pub fn with_spend_ratio(mut self, ratio: f64) -> Self {
        self.spend_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Use tokio timers instead of virtual time.
    pub fn with_real_time(mut self) -> Self {
        self.virtual_time = false;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulatorConfig::from_toml_str(
            r#"
            flows = 8
            processes = 3

            [retry]
            max_attempts = 2
            cap_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.flows, 8);
        assert_eq!(config.processes, 3);
        assert_eq!(config.num_states, 200);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.cap, Duration::from_millis(500));
        assert_eq!(config.retry.base_delay, Duration::from_millis(100));
        assert_eq!(config.max_hold(), Duration::from_millis(50));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(matches!(
            SimulatorConfig::from_toml_str("processes = 0"),
            Err(SimulatorError::Invalid(_))
        ));
        assert!(matches!(
            SimulatorConfig::from_toml_str("min_amount = 10\nmax_amount = 5"),
            Err(SimulatorError::Invalid(_))
        ));
        assert!(matches!(
            SimulatorConfig::from_toml_str("flows = \"many\""),
            Err(SimulatorError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.toml");
        std::fs::write(&path, "seed = 7\nvirtual_time = false").unwrap();

        let config = SimulatorConfig::load(&path).unwrap();
        assert_eq!(config.seed, 7);
        assert!(!config.virtual_time);
    }
}
