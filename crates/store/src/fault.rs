//! Scripted failures for exercising retry paths.

use crate::StoreError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use vault_types::ReservationId;

/// Injects transient failures and foreign lock races into a store.
///
/// Every counter is consumed one call at a time, so "fail the next two
/// queries" affects exactly the next two `query_unconsumed` calls.
#[derive(Debug, Default)]
pub struct FaultInjector {
    /// Remaining query calls that must fail.
    query_failures: AtomicU32,
    /// Remaining reserve calls that must fail.
    reserve_failures: AtomicU32,
    /// Foreign reservations that grab free rows just before the next reserves.
    foreign_claims: Mutex<VecDeque<ReservationId>>,
    /// Total query calls observed.
    queries: AtomicU64,
    /// Total reserve calls observed.
    reserves: AtomicU64,
}

impl FaultInjector {
    /// Create an injector with no scripted faults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` queries with [`StoreError::Unavailable`].
    pub fn fail_next_queries(&self, n: u32) {
        self.query_failures.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` reserves with [`StoreError::Serialization`].
    pub fn fail_next_reserves(&self, n: u32) {
        self.reserve_failures.store(n, Ordering::SeqCst);
    }

    /// Before the next reserve call, let `foreign` lock every requested
    /// state that is still free, as another process racing the same rows.
    pub fn claim_before_next_reserve(&self, foreign: ReservationId) {
        self.foreign_claims.lock().push_back(foreign);
    }

    /// Number of queries seen so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of reserves seen so far.
    pub fn reserve_count(&self) -> u64 {
        self.reserves.load(Ordering::SeqCst)
    }

    pub(crate) fn on_query(&self) -> Result<(), StoreError> {
        let call = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
        if take_one(&self.query_failures) {
            return Err(StoreError::Unavailable(format!(
                "injected query failure on call {call}"
            )));
        }
        Ok(())
    }

    pub(crate) fn on_reserve(&self) -> Result<(), StoreError> {
        let call = self.reserves.fetch_add(1, Ordering::SeqCst) + 1;
        if take_one(&self.reserve_failures) {
            return Err(StoreError::Serialization(format!(
                "injected reserve failure on call {call}"
            )));
        }
        Ok(())
    }

    pub(crate) fn take_foreign_claim(&self) -> Option<ReservationId> {
        self.foreign_claims.lock().pop_front()
    }
}

/// Decrement a non-zero counter. Returns whether one was taken.
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_failures_are_consumed() {
        let faults = FaultInjector::new();
        faults.fail_next_queries(2);

        assert!(faults.on_query().is_err());
        assert!(faults.on_query().is_err());
        assert!(faults.on_query().is_ok());
        assert_eq!(faults.query_count(), 3);
    }

    #[test]
    fn test_foreign_claims_are_fifo() {
        let faults = FaultInjector::new();
        faults.claim_before_next_reserve(ReservationId::new(7));
        faults.claim_before_next_reserve(ReservationId::new(8));

        assert_eq!(faults.take_foreign_claim(), Some(ReservationId::new(7)));
        assert_eq!(faults.take_foreign_claim(), Some(ReservationId::new(8)));
        assert_eq!(faults.take_foreign_claim(), None);
    }
}
