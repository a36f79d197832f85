//! In-memory state store.

use crate::{
    running_totals, FaultInjector, LockConflict, ReservationManager, ReserveError,
    SpendCandidate, StateQuery, StateStore, StoreError,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, trace};
use vault_types::{LedgerState, ReservationId, StateRef, StateStatus};

/// Ledger states held in insertion order.
///
/// Query order is the order states were recorded, which is stable across
/// repeated queries. A reserve checks and applies every lock under one
/// write guard, so batches are all-or-nothing with respect to every other
/// caller of this store.
pub struct InMemoryStateStore {
    states: RwLock<IndexMap<StateRef, LedgerState>>,
    faults: FaultInjector,
    early_termination: bool,
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStateStore {
    /// Create an empty store that stops scanning once a target is reached.
    pub fn new() -> Self {
        Self {
            states: RwLock::new(IndexMap::new()),
            faults: FaultInjector::new(),
            early_termination: true,
        }
    }

    /// Create an empty store that always returns every matching row.
    ///
    /// Models a backend without early-terminating running totals.
    pub fn full_scan() -> Self {
        Self {
            early_termination: false,
            ..Self::new()
        }
    }

    /// Fault injection handle.
    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Record a newly produced state.
    ///
    /// The state may arrive pre-locked to the reservation that produced it.
    /// A consumed state never keeps a lock owner.
    pub fn record(&self, mut state: LedgerState) -> Result<(), StoreError> {
        if state.status == StateStatus::Consumed {
            state.lock_owner = None;
        }

        let mut states = self.states.write();
        if states.contains_key(&state.state_ref) {
            return Err(StoreError::DuplicateState(state.state_ref));
        }
        trace!(state = %state.state_ref, amount = %state.amount, "Recorded state");
        states.insert(state.state_ref, state);
        Ok(())
    }

    /// Record several states; stops at the first failure.
    pub fn record_all(
        &self,
        states: impl IntoIterator<Item = LedgerState>,
    ) -> Result<(), StoreError> {
        for state in states {
            self.record(state)?;
        }
        Ok(())
    }

    /// Mark states consumed by a finalized spend and drop their locks.
    ///
    /// Fails without changing anything if any reference is unknown.
    pub fn consume(&self, refs: &[StateRef]) -> Result<(), StoreError> {
        let mut states = self.states.write();
        if let Some(missing) = refs.iter().find(|r| !states.contains_key(*r)) {
            return Err(StoreError::UnknownState(*missing));
        }

        for state_ref in refs {
            if let Some(state) = states.get_mut(state_ref) {
                state.status = StateStatus::Consumed;
                state.lock_owner = None;
            }
        }
        debug!(count = refs.len(), "Consumed states");
        Ok(())
    }

    /// Look up a single state.
    pub fn get(&self, state_ref: &StateRef) -> Option<LedgerState> {
        self.states.read().get(state_ref).cloned()
    }

    /// Every state in store order.
    pub fn snapshot(&self) -> Vec<LedgerState> {
        self.states.read().values().cloned().collect()
    }

    /// Every current soft lock as `(state, owner)` pairs.
    pub fn locks(&self) -> Vec<(StateRef, ReservationId)> {
        self.states
            .read()
            .values()
            .filter_map(|s| s.lock_owner.map(|owner| (s.state_ref, owner)))
            .collect()
    }

    /// Number of recorded states.
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    /// Whether no states have been recorded.
    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn query_unconsumed(
        &self,
        query: &StateQuery,
    ) -> Result<Vec<SpendCandidate>, StoreError> {
        self.faults.on_query()?;

        let stop_at = if self.early_termination {
            query.stop_at
        } else {
            None
        };

        let states = self.states.read();
        let matching = states.values().filter(|s| query.matches(s)).cloned();
        Ok(running_totals(matching, stop_at))
    }
}

#[async_trait]
impl ReservationManager for InMemoryStateStore {
    async fn reserve(
        &self,
        refs: &[StateRef],
        reservation: ReservationId,
    ) -> Result<(), ReserveError> {
        self.faults.on_reserve()?;

        let mut states = self.states.write();

        if let Some(foreign) = self.faults.take_foreign_claim() {
            for state_ref in refs {
                if let Some(state) = states.get_mut(state_ref) {
                    if state.is_unconsumed() && state.lock_owner.is_none() {
                        state.lock_owner = Some(foreign);
                    }
                }
            }
        }

        let unavailable: Vec<StateRef> = refs
            .iter()
            .filter(|r| !states.get(*r).is_some_and(|s| s.is_claimable_by(reservation)))
            .copied()
            .collect();

        if !unavailable.is_empty() {
            return Err(LockConflict {
                reservation,
                requested: refs.len(),
                unavailable,
            }
            .into());
        }

        for state_ref in refs {
            if let Some(state) = states.get_mut(state_ref) {
                state.lock_owner = Some(reservation);
            }
        }
        Ok(())
    }

    async fn release(
        &self,
        reservation: ReservationId,
        refs: Option<&[StateRef]>,
    ) -> Result<usize, StoreError> {
        let mut states = self.states.write();
        let mut released = 0;

        let mut clear = |state: &mut LedgerState| {
            if state.lock_owner == Some(reservation) {
                state.lock_owner = None;
                released += 1;
            }
        };

        match refs {
            Some(refs) => {
                for state_ref in refs {
                    if let Some(state) = states.get_mut(state_ref) {
                        clear(state);
                    }
                }
            }
            None => states.values_mut().for_each(clear),
        }

        debug!(%reservation, released, "Released soft locks");
        Ok(released)
    }

    async fn locked_by(&self, reservation: ReservationId) -> Result<Vec<StateRef>, StoreError> {
        Ok(self
            .states
            .read()
            .values()
            .filter(|s| s.lock_owner == Some(reservation))
            .map(|s| s.state_ref)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_types::{Amount, Currency, Hash, IssuerRef, Party};

    fn gbp(index: u32, quantity: u64) -> LedgerState {
        LedgerState::issued(
            StateRef::new(Hash::from_bytes(b"issue"), index),
            Party::from_name("Alice"),
            Amount::new(quantity, Currency::new("GBP")),
            Party::from_name("Bank"),
            IssuerRef::new(vec![1]),
            Party::from_name("Notary"),
        )
    }

    fn store_with(quantities: &[u64]) -> (InMemoryStateStore, Vec<StateRef>) {
        let store = InMemoryStateStore::new();
        let mut refs = Vec::new();
        for (i, q) in quantities.iter().enumerate() {
            let state = gbp(i as u32, *q);
            refs.push(state.state_ref);
            store.record(state).unwrap();
        }
        (store, refs)
    }

    fn query(reservation: ReservationId) -> StateQuery {
        StateQuery::new(Currency::new("GBP"), reservation)
    }

    #[test]
    fn test_record_rejects_duplicates() {
        let (store, refs) = store_with(&[100]);
        assert_eq!(
            store.record(gbp(0, 100)),
            Err(StoreError::DuplicateState(refs[0]))
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_query_is_insertion_ordered_and_stops_early() {
        let (store, refs) = store_with(&[500, 300, 400]);
        let r1 = ReservationId::new(1);

        let rows = store
            .query_unconsumed(&query(r1).with_stop_at(700))
            .await
            .unwrap();
        let got: Vec<StateRef> = rows.iter().map(|r| r.state.state_ref).collect();
        assert_eq!(got, vec![refs[0], refs[1]]);
        assert_eq!(rows[1].cumulative, 800);

        let again = store
            .query_unconsumed(&query(r1).with_stop_at(700))
            .await
            .unwrap();
        assert_eq!(rows, again);
    }

    #[tokio::test]
    async fn test_full_scan_ignores_stop_at() {
        let store = InMemoryStateStore::full_scan();
        store.record_all((0..3).map(|i| gbp(i, 100))).unwrap();

        let rows = store
            .query_unconsumed(&query(ReservationId::new(1)).with_stop_at(100))
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_reserve_is_all_or_nothing() {
        let (store, refs) = store_with(&[100, 200, 300]);
        let r1 = ReservationId::new(1);
        let r2 = ReservationId::new(2);

        store.reserve(&refs[1..2], r2).await.unwrap();

        let err = store.reserve(&refs, r1).await.unwrap_err();
        assert_eq!(
            err,
            ReserveError::Conflict(LockConflict {
                reservation: r1,
                requested: 3,
                unavailable: vec![refs[1]],
            })
        );

        // Nothing from the rejected batch was applied
        assert_eq!(store.locks(), vec![(refs[1], r2)]);
    }

    #[tokio::test]
    async fn test_reserve_is_reentrant() {
        let (store, refs) = store_with(&[100, 200]);
        let r1 = ReservationId::new(1);

        store.reserve(&refs, r1).await.unwrap();
        let before = store.snapshot();

        store.reserve(&refs, r1).await.unwrap();
        store.reserve(&refs[..1], r1).await.unwrap();
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_reserve_rejects_consumed_and_unknown() {
        let (store, refs) = store_with(&[100]);
        let r1 = ReservationId::new(1);
        store.consume(&refs).unwrap();

        let unknown = StateRef::new(Hash::from_bytes(b"nope"), 0);
        let err = store.reserve(&[refs[0], unknown], r1).await.unwrap_err();
        match err {
            ReserveError::Conflict(conflict) => {
                assert_eq!(conflict.unavailable, vec![refs[0], unknown])
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_release_only_touches_own_locks() {
        let (store, refs) = store_with(&[100, 200, 300]);
        let r1 = ReservationId::new(1);
        let r2 = ReservationId::new(2);

        store.reserve(&refs[..2], r1).await.unwrap();
        store.reserve(&refs[2..], r2).await.unwrap();

        assert_eq!(store.release(r1, Some(&refs)).await.unwrap(), 2);
        assert_eq!(store.locks(), vec![(refs[2], r2)]);

        assert_eq!(store.release(r1, None).await.unwrap(), 0);
        assert_eq!(store.release(r2, None).await.unwrap(), 1);
        assert!(store.locks().is_empty());
    }

    #[tokio::test]
    async fn test_locked_by_lists_own_states() {
        let (store, refs) = store_with(&[100, 200, 300]);
        let r1 = ReservationId::new(1);
        store.reserve(&[refs[2], refs[0]], r1).await.unwrap();

        assert_eq!(store.locked_by(r1).await.unwrap(), vec![refs[0], refs[2]]);
        assert!(store
            .locked_by(ReservationId::new(9))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_consume_clears_lock() {
        let (store, refs) = store_with(&[100]);
        let r1 = ReservationId::new(1);
        store.reserve(&refs, r1).await.unwrap();

        store.consume(&refs).unwrap();
        let state = store.get(&refs[0]).unwrap();
        assert_eq!(state.status, StateStatus::Consumed);
        assert_eq!(state.lock_owner, None);

        let rows = store.query_unconsumed(&query(r1)).await.unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_consume_unknown_changes_nothing() {
        let (store, refs) = store_with(&[100]);
        let unknown = StateRef::new(Hash::from_bytes(b"nope"), 0);

        assert_eq!(
            store.consume(&[refs[0], unknown]),
            Err(StoreError::UnknownState(unknown))
        );
        assert!(store.get(&refs[0]).unwrap().is_unconsumed());
    }

    #[tokio::test]
    async fn test_pending_output_visible_to_producer_only() {
        let store = InMemoryStateStore::new();
        let r1 = ReservationId::new(1);
        store.record(gbp(0, 100).locked_to(r1)).unwrap();

        assert_eq!(store.query_unconsumed(&query(r1)).await.unwrap().len(), 1);
        assert!(store
            .query_unconsumed(&query(ReservationId::new(2)))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let (store, refs) = store_with(&[100]);
        let r1 = ReservationId::new(1);
        let foreign = ReservationId::new(99);

        store.faults().fail_next_queries(1);
        assert!(matches!(
            store.query_unconsumed(&query(r1)).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.query_unconsumed(&query(r1)).await.is_ok());

        store.faults().fail_next_reserves(1);
        assert!(matches!(
            store.reserve(&refs, r1).await,
            Err(ReserveError::Store(StoreError::Serialization(_)))
        ));

        store.faults().claim_before_next_reserve(foreign);
        assert!(matches!(
            store.reserve(&refs, r1).await,
            Err(ReserveError::Conflict(_))
        ));
        assert_eq!(store.locks(), vec![(refs[0], foreign)]);
    }
}
