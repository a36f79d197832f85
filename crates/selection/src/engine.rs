//! The selection retry loop.
//!
//! Each attempt runs inside the [`SelectionGate`]: query the store, sum rows
//! in the order returned until the target is covered, and if it is, reserve
//! exactly those rows. The gate is left before any backoff wait, so one
//! sleeping flow never holds up others.
//!
//! Every failure mode of an attempt (shortfall, lock conflict, store error)
//! consumes one attempt from the same budget and is followed by the same
//! randomized backoff. The last attempt is never followed by a wait.

use crate::{
    AttemptFailure, JitterSource, RetryPolicy, SeededJitter, SelectionCriteria, SelectionError,
    SelectionGate, SelectionRequest, SelectionResult, Sleeper, TokioSleeper,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use vault_store::{ReservationManager, ReserveError, SpendCandidate, StateQuery, StateStore};
use vault_types::{Amount, IssuerRef, LedgerState, Party, ReservationId, StateRef};

/// States gathered by one attempt.
#[derive(Debug, Default)]
struct Selection {
    states: Vec<LedgerState>,
    total: u64,
}

impl Selection {
    fn refs(&self) -> Vec<StateRef> {
        self.states.iter().map(|s| s.state_ref).collect()
    }
}

/// Result of a single attempt.
enum AttemptOutcome {
    Reserved(Selection),
    Failed(Selection, AttemptFailure),
}

/// Selects spendable states and soft-locks them to a reservation.
///
/// Engines hold no per-call state; one engine serves any number of
/// concurrent flows. The [`SelectionGate`] is named at construction; every
/// engine in a process over the same store shares one.
pub struct SelectionEngine {
    store: Arc<dyn StateStore>,
    reservations: Arc<dyn ReservationManager>,
    gate: SelectionGate,
    sleeper: Arc<dyn Sleeper>,
    jitter: Mutex<Box<dyn JitterSource>>,
}

impl SelectionEngine {
    /// Create an engine over separate query and reservation seams.
    ///
    /// Every attempt runs inside `gate`; engines in one process must be built
    /// from clones of the same gate. Uses tokio timers and entropy-seeded
    /// jitter.
    pub fn new(
        store: Arc<dyn StateStore>,
        reservations: Arc<dyn ReservationManager>,
        gate: SelectionGate,
    ) -> Self {
        Self {
            store,
            reservations,
            gate,
            sleeper: Arc::new(TokioSleeper),
            jitter: Mutex::new(Box::new(SeededJitter::from_entropy())),
        }
    }

    /// Create an engine over a store that implements both seams.
    pub fn over<S>(store: Arc<S>, gate: SelectionGate) -> Self
    where
        S: StateStore + ReservationManager + 'static,
    {
        Self::new(store.clone(), store, gate)
    }

    /// Use a custom clock for backoff waits.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Use a custom jitter source.
    pub fn with_jitter(mut self, jitter: impl JitterSource + 'static) -> Self {
        self.jitter = Mutex::new(Box::new(jitter));
        self
    }

    /// The gate this engine serializes attempts through.
    pub fn gate(&self) -> &SelectionGate {
        &self.gate
    }

    /// Select and reserve states covering `amount`.
    ///
    /// Convenience form of [`Self::select`]. Empty issuer sets and a `None`
    /// notary mean "no filter".
    #[allow(clippy::too_many_arguments)]
    pub async fn select_for_spending(
        &self,
        amount: Amount,
        issuers: BTreeSet<Party>,
        issuer_refs: BTreeSet<IssuerRef>,
        notary: Option<Party>,
        reservation: ReservationId,
        retry: RetryPolicy,
    ) -> Result<SelectionResult, SelectionError> {
        let criteria = SelectionCriteria {
            amount,
            issuers,
            issuer_refs,
            notary,
        };
        let request = SelectionRequest::new(criteria, reservation).with_retry_policy(retry);
        self.select(&request).await
    }

    /// Select and reserve states for `request`.
    ///
    /// Returns `Err` only for a malformed request, before any attempt is
    /// made. A zero target is satisfied immediately without touching the
    /// store. Otherwise the result is satisfied and reserved, or unsatisfied
    /// after the attempt budget is spent.
    pub async fn select(&self, request: &SelectionRequest) -> Result<SelectionResult, SelectionError> {
        request.validate()?;

        let reservation = request.reservation;
        if request.criteria.amount.is_zero() {
            debug!(%reservation, "Zero target, nothing to select");
            return Ok(SelectionResult::empty());
        }

        let policy = request.retry;
        let query = request.criteria.to_query(reservation);
        let mut last = SelectionResult {
            states: Vec::new(),
            total: 0,
            satisfied: false,
            attempts: 0,
            last_failure: None,
        };

        for attempt in 1..=policy.max_attempts {
            match self.attempt(request, &query, attempt).await {
                AttemptOutcome::Reserved(selection) => {
                    info!(
                        %reservation,
                        attempt,
                        total = selection.total,
                        states = selection.states.len(),
                        criteria = %request.criteria,
                        "Reserved states"
                    );
                    return Ok(SelectionResult {
                        states: selection.states,
                        total: selection.total,
                        satisfied: true,
                        attempts: attempt,
                        last_failure: None,
                    });
                }
                AttemptOutcome::Failed(selection, failure) => {
                    last = SelectionResult {
                        states: selection.states,
                        total: selection.total,
                        satisfied: false,
                        attempts: attempt,
                        last_failure: Some(failure),
                    };

                    if attempt < policy.max_attempts {
                        let jitter = self.jitter.lock().next_jitter();
                        let delay = policy.backoff(attempt, jitter);
                        debug!(
                            %reservation,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Selection attempt failed, backing off"
                        );
                        self.sleeper.sleep(delay).await;
                    }
                }
            }
        }

        warn!(
            %reservation,
            amount = %request.criteria.amount,
            criteria = %request.criteria,
            attempts = last.attempts,
            available = last.total,
            cause = ?last.last_failure,
            "Insufficient spendable states"
        );
        Ok(last)
    }

    async fn attempt(
        &self,
        request: &SelectionRequest,
        query: &StateQuery,
        attempt: u32,
    ) -> AttemptOutcome {
        let reservation = request.reservation;
        let target = request.target();

        let _guard = self.gate.enter().await;
        debug!(%reservation, attempt, "Entered selection gate");

        let rows = match self.store.query_unconsumed(query).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(
                    %reservation,
                    attempt,
                    criteria = %request.criteria,
                    error = %e,
                    "State query failed"
                );
                return AttemptOutcome::Failed(Selection::default(), AttemptFailure::Store(e));
            }
        };

        let selection = accumulate(rows, query, target);
        if selection.total < target {
            debug!(
                %reservation,
                attempt,
                available = selection.total,
                target,
                "Not enough unlocked value"
            );
            let available = selection.total;
            return AttemptOutcome::Failed(selection, AttemptFailure::Insufficient { available });
        }

        match self.reservations.reserve(&selection.refs(), reservation).await {
            Ok(()) => AttemptOutcome::Reserved(selection),
            Err(ReserveError::Conflict(conflict)) => {
                debug!(
                    %reservation,
                    attempt,
                    unavailable = conflict.unavailable.len(),
                    "States claimed concurrently"
                );
                let unavailable = conflict.unavailable.len();
                AttemptOutcome::Failed(selection, AttemptFailure::LockConflict { unavailable })
            }
            Err(ReserveError::Store(e)) => {
                error!(
                    %reservation,
                    attempt,
                    criteria = %request.criteria,
                    error = %e,
                    "Reservation failed"
                );
                AttemptOutcome::Failed(selection, AttemptFailure::Store(e))
            }
        }
    }
}

/// Take rows in order until their sum reaches `target`.
///
/// Rows that do not satisfy `query` are skipped, so the result only ever
/// holds matching states whatever the store returned.
fn accumulate(rows: Vec<SpendCandidate>, query: &StateQuery, target: u64) -> Selection {
    let mut selection = Selection::default();

    for row in rows {
        if !query.matches(&row.state) {
            warn!(state = %row.state.state_ref, "Store returned a state outside the query");
            continue;
        }
        trace!(state = %row.state.state_ref, quantity = row.state.quantity(), "Candidate");

        selection.total = selection.total.saturating_add(row.state.quantity());
        selection.states.push(row.state);
        if selection.total >= target {
            break;
        }
    }

    selection
}
