//! Simulation runner.

use crate::metrics::FlowDisposition;
use crate::{MetricsCollector, SimulationReport, SimulatorConfig, SimulatorError};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use vault_selection::{
    SeededJitter, SelectionCriteria, SelectionEngine, SelectionGate, SelectionRequest,
    SelectionResult, Sleeper, TokioSleeper, VirtualClock,
};
use vault_store::{InMemoryStateStore, ReservationManager};
use vault_types::{Amount, Hash, IssuerRef, LedgerState, Party, ReservationId, StateRef};

/// Parties shared by every simulated state.
#[derive(Debug, Clone)]
struct SimParties {
    owner: Party,
    issuer: Party,
    issuer_ref: IssuerRef,
    notary: Party,
}

impl SimParties {
    fn new() -> Self {
        Self {
            owner: Party::from_name("Sim Owner"),
            issuer: Party::from_name("Sim Bank"),
            issuer_ref: IssuerRef::new(vec![0x01]),
            notary: Party::from_name("Sim Notary"),
        }
    }

    fn state(&self, state_ref: StateRef, amount: Amount) -> LedgerState {
        LedgerState::issued(
            state_ref,
            self.owner.clone(),
            amount,
            self.issuer.clone(),
            self.issuer_ref.clone(),
            self.notary.clone(),
        )
    }
}

/// Which reservation currently holds each state, as seen by the flows.
///
/// Flows claim here after a satisfied selection and withdraw before
/// releasing or spending, so any state claimed twice is an overlap.
#[derive(Debug, Default)]
struct LiveReservations {
    holders: Mutex<HashMap<StateRef, ReservationId>>,
}

impl LiveReservations {
    /// Claim `refs` for `reservation`. Returns how many were already held.
    fn claim(&self, reservation: ReservationId, refs: &[StateRef]) -> u64 {
        let mut holders = self.holders.lock();
        let mut overlaps = 0;
        for state_ref in refs {
            if let Some(previous) = holders.insert(*state_ref, reservation) {
                if previous != reservation {
                    error!(state = %state_ref, %previous, %reservation, "State reserved twice");
                    overlaps += 1;
                }
            }
        }
        overlaps
    }

    fn withdraw(&self, refs: &[StateRef]) {
        let mut holders = self.holders.lock();
        for state_ref in refs {
            holders.remove(state_ref);
        }
    }
}

/// Everything a flow task needs.
struct FlowContext {
    store: Arc<InMemoryStateStore>,
    engine: SelectionEngine,
    sleeper: Arc<dyn Sleeper>,
    live: Arc<LiveReservations>,
    parties: Arc<SimParties>,
    config: Arc<SimulatorConfig>,
}

/// Outcome of one flow.
struct FlowReport {
    result: SelectionResult,
    disposition: FlowDisposition,
    spent: u64,
    overlaps: u64,
}

/// Runs concurrent flows against one store.
pub struct Simulator {
    config: Arc<SimulatorConfig>,
    parties: Arc<SimParties>,
}

impl Simulator {
    /// Create a simulator.
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config: Arc::new(config),
            parties: Arc::new(SimParties::new()),
        }
    }

    /// Build a store holding the configured seed states.
    pub fn seed_store(&self) -> Result<Arc<InMemoryStateStore>, SimulatorError> {
        let store = InMemoryStateStore::new();
        let issuance = Hash::from_bytes(b"sim-issuance");
        let currency = self.config.currency();

        for index in 0..self.config.num_states {
            let amount = Amount::new(self.config.state_value, currency.clone());
            store.record(self.parties.state(StateRef::new(issuance, index), amount))?;
        }
        Ok(Arc::new(store))
    }

    /// Seed a store and run every flow to completion.
    pub async fn run(&self) -> Result<SimulationReport, SimulatorError> {
        let store = self.seed_store()?;
        self.run_on(store).await
    }

    /// Run every flow to completion against `store`.
    pub async fn run_on(
        &self,
        store: Arc<InMemoryStateStore>,
    ) -> Result<SimulationReport, SimulatorError> {
        self.config.validate()?;
        info!(
            flows = self.config.flows,
            processes = self.config.processes,
            states = store.len(),
            seed = self.config.seed,
            "Starting simulation"
        );

        let gates: Vec<SelectionGate> = (0..self.config.processes)
            .map(|_| SelectionGate::new())
            .collect();
        let sleeper: Arc<dyn Sleeper> = if self.config.virtual_time {
            Arc::new(VirtualClock::new())
        } else {
            Arc::new(TokioSleeper)
        };
        let live = Arc::new(LiveReservations::default());

        let mut tasks = Vec::with_capacity(self.config.flows as usize);
        for index in 0..self.config.flows {
            let gate = gates[(index % self.config.processes) as usize].clone();
            let engine = SelectionEngine::over(store.clone(), gate)
                .with_sleeper(sleeper.clone())
                .with_jitter(SeededJitter::new(self.config.seed ^ u64::from(index)));

            let ctx = FlowContext {
                store: store.clone(),
                engine,
                sleeper: sleeper.clone(),
                live: live.clone(),
                parties: self.parties.clone(),
                config: self.config.clone(),
            };
            tasks.push(tokio::spawn(run_flow(index, ctx)));
        }

        let mut metrics = MetricsCollector::new()?;
        for task in tasks {
            let flow = task.await??;
            metrics.record(&flow.result, flow.disposition, flow.spent);
            for _ in 0..flow.overlaps {
                metrics.record_overlap();
            }
        }

        let value_remaining = store
            .snapshot()
            .iter()
            .filter(|s| s.is_unconsumed())
            .map(|s| s.quantity())
            .sum();
        let report = metrics.report(self.config.flows, value_remaining);
        info!(
            satisfied = report.satisfied(),
            unsatisfied = report.unsatisfied,
            overlaps = report.overlaps,
            "Simulation complete"
        );
        Ok(report)
    }
}

async fn run_flow(index: u32, ctx: FlowContext) -> Result<FlowReport, SimulatorError> {
    let config = &ctx.config;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(u64::from(index)));
    let quantity = rng.gen_range(config.min_amount..=config.max_amount);
    let hold = rng.gen_range(Duration::ZERO..=config.max_hold());
    let spend = rng.gen_bool(config.spend_ratio);

    let reservation = ReservationId::from_name(&format!("flow-{index}"));
    let criteria = SelectionCriteria::new(Amount::new(quantity, config.currency()))
        .with_issuers([ctx.parties.issuer.clone()])
        .with_notary(ctx.parties.notary.clone());
    let request = SelectionRequest::new(criteria, reservation).with_retry_policy(config.retry);

    let result = ctx.engine.select(&request).await?;
    if !result.satisfied {
        return Ok(FlowReport {
            result,
            disposition: FlowDisposition::Unsatisfied,
            spent: 0,
            overlaps: 0,
        });
    }

    let refs = result.state_refs();
    let overlaps = ctx.live.claim(reservation, &refs);
    ctx.sleeper.sleep(hold).await;
    ctx.live.withdraw(&refs);

    if !spend {
        ctx.store.release(reservation, Some(&refs)).await?;
        debug!(index, %reservation, "Flow released its reservation");
        return Ok(FlowReport {
            result,
            disposition: FlowDisposition::Released,
            spent: 0,
            overlaps,
        });
    }

    ctx.store.consume(&refs)?;
    let change = result.total.saturating_sub(quantity);
    if change > 0 {
        let id = reservation.get().to_le_bytes();
        let change_ref = StateRef::new(Hash::from_parts(&[b"change:", &id]), 0);
        let amount = Amount::new(change, config.currency());
        ctx.store.record(ctx.parties.state(change_ref, amount))?;
    }
    debug!(index, %reservation, quantity, change, "Flow spent its reservation");

    Ok(FlowReport {
        result,
        disposition: FlowDisposition::Spent,
        spent: quantity,
        overlaps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;
    use vault_selection::RetryPolicy;

    #[traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_has_no_overlaps_and_conserves_value() {
        let config = SimulatorConfig::default()
            .with_states(100, 100)
            .with_flows(48)
            .with_processes(2)
            .with_amount_range(100, 400);
        let total = config.total_value();

        let report = Simulator::new(config).run().await.unwrap();

        assert_eq!(report.overlaps, 0);
        assert_eq!(report.satisfied() + report.unsatisfied, 48);
        assert_eq!(report.value_spent + report.value_remaining, total);
        assert!(report.satisfied() > 0);
        assert!(logs_contain("Simulation complete"));
    }

    #[tokio::test]
    async fn test_starved_store_leaves_flows_unsatisfied() {
        let config = SimulatorConfig::default()
            .with_states(1, 100)
            .with_flows(4)
            .with_amount_range(500, 500)
            .with_retry(RetryPolicy::default().with_max_attempts(2));

        let report = Simulator::new(config).run().await.unwrap();

        assert_eq!(report.unsatisfied, 4);
        assert_eq!(report.attempts_max, 2);
        assert_eq!(report.value_remaining, 100);
    }

    #[tokio::test]
    async fn test_release_only_keeps_all_value() {
        let config = SimulatorConfig::default()
            .with_states(50, 100)
            .with_flows(16)
            .with_spend_ratio(0.0);
        let total = config.total_value();

        let report = Simulator::new(config).run().await.unwrap();

        assert_eq!(report.spent, 0);
        assert_eq!(report.value_remaining, total);
    }

    #[test]
    fn test_live_reservations_flag_double_claims() {
        let live = LiveReservations::default();
        let s = StateRef::new(Hash::from_bytes(b"tx"), 0);
        let r1 = ReservationId::new(1);
        let r2 = ReservationId::new(2);

        assert_eq!(live.claim(r1, &[s]), 0);
        assert_eq!(live.claim(r1, &[s]), 0);
        assert_eq!(live.claim(r2, &[s]), 1);

        live.withdraw(&[s]);
        assert_eq!(live.claim(r2, &[s]), 0);
    }
}
