//! Concurrent selection: disjoint reservations under contention.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use vault_selection::{
    RetryPolicy, SeededJitter, SelectionCriteria, SelectionEngine, SelectionGate,
    SelectionRequest, SelectionResult, VirtualClock,
};
use vault_store::InMemoryStateStore;
use vault_test_helpers::{gbp, reservations, Fixtures};
use vault_types::{ReservationId, StateRef};

fn engine(store: &Arc<InMemoryStateStore>, gate: &SelectionGate, seed: u64) -> SelectionEngine {
    SelectionEngine::over(store.clone(), gate.clone())
        .with_sleeper(Arc::new(VirtualClock::new()))
        .with_jitter(SeededJitter::new(seed))
}

/// Every reserved state appears in at most one satisfied result.
fn assert_disjoint(results: &[(ReservationId, SelectionResult)]) {
    let mut seen: HashSet<StateRef> = HashSet::new();
    for (_, result) in results.iter().filter(|(_, r)| r.satisfied) {
        for state_ref in result.state_refs() {
            assert!(seen.insert(state_ref), "{state_ref} reserved twice");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_b_single_state_two_flows() {
    let fx = Fixtures::new();
    let store = Arc::new(fx.store_with_gbp(&[600]));
    let gate = SelectionGate::new();
    let engine = Arc::new(engine(&store, &gate, 7));

    let tasks = reservations(2).into_iter().map(|reservation| {
        let engine = engine.clone();
        tokio::spawn(async move {
            let request = SelectionRequest::new(SelectionCriteria::new(gbp(500)), reservation);
            (reservation, engine.select(&request).await.unwrap())
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let winners: Vec<_> = results.iter().filter(|(_, r)| r.satisfied).collect();
    assert_eq!(winners.len(), 1);

    let (winner, _) = winners[0];
    assert_eq!(store.locks(), vec![(fx.gbp_ref(0), *winner)]);

    let (_, loser) = results.iter().find(|(_, r)| !r.satisfied).unwrap();
    assert_eq!(loser.attempts, 8);
    assert!(loser.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn many_flows_never_share_a_state() {
    let fx = Fixtures::new();
    let quantities: Vec<u64> = (0..60).map(|i| 50 + (i % 7) * 25).collect();
    let store = Arc::new(fx.store_with_gbp(&quantities));
    let gate = SelectionGate::new();

    let tasks = reservations(32).into_iter().map(|reservation| {
        // Separate engines sharing one gate, as flows on one node would
        let engine = engine(&store, &gate, reservation.get() as u64);
        tokio::spawn(async move {
            let request = SelectionRequest::new(SelectionCriteria::new(gbp(175)), reservation)
                .with_retry_policy(RetryPolicy::default().with_max_attempts(3));
            (reservation, engine.select(&request).await.unwrap())
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_disjoint(&results);

    for (reservation, result) in &results {
        if result.satisfied {
            assert!(result.total >= 175);
            for state_ref in result.state_refs() {
                assert_eq!(store.get(&state_ref).unwrap().lock_owner, Some(*reservation));
            }
        }
    }

    let satisfied = results.iter().filter(|(_, r)| r.satisfied).count();
    let locked = store.locks().len();
    let reserved: usize = results
        .iter()
        .filter(|(_, r)| r.satisfied)
        .map(|(_, r)| r.states.len())
        .sum();
    assert_eq!(locked, reserved);
    assert!(satisfied > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn separate_processes_resolve_through_reserve_conflicts() {
    // Two gates model two processes racing the same store
    let fx = Fixtures::new();
    let store = Arc::new(fx.store_with_gbp(&[100; 20]));
    let gate_a = SelectionGate::new();
    let gate_b = SelectionGate::new();

    let tasks = reservations(10).into_iter().map(|reservation| {
        let gate = if reservation.get() % 2 == 0 {
            &gate_a
        } else {
            &gate_b
        };
        let engine = engine(&store, gate, reservation.get() as u64);
        tokio::spawn(async move {
            let request = SelectionRequest::new(SelectionCriteria::new(gbp(200)), reservation);
            (reservation, engine.select(&request).await.unwrap())
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_disjoint(&results);
    // 2000 available, 10 x 200 requested; every flow eventually fits
    assert!(results.iter().all(|(_, r)| r.satisfied));
    assert_eq!(store.locks().len(), 20);
}
