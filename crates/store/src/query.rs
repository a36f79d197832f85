//! Query contract consumed by the selection engine.

use std::collections::BTreeSet;
use vault_types::{Currency, IssuerRef, LedgerState, Party, ReservationId};

/// Filter for spendable states.
///
/// A state matches when it is unconsumed, carries `currency`, satisfies each
/// supplied filter, and is either unlocked or locked by `reservation`.
/// Empty issuer or issuer-reference sets mean "no filter".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateQuery {
    /// Required currency.
    pub currency: Currency,

    /// Required notary, if any.
    pub notary: Option<Party>,

    /// Accepted issuers. Empty accepts any issuer.
    pub issuers: BTreeSet<Party>,

    /// Accepted issuer references. Empty accepts any reference.
    pub issuer_refs: BTreeSet<IssuerRef>,

    /// Caller's reservation. States it already holds remain visible.
    pub reservation: ReservationId,

    /// Stop returning rows once the running total reaches this quantity.
    pub stop_at: Option<u64>,
}

impl StateQuery {
    /// Create a query for `currency` on behalf of `reservation`.
    pub fn new(currency: Currency, reservation: ReservationId) -> Self {
        Self {
            currency,
            notary: None,
            issuers: BTreeSet::new(),
            issuer_refs: BTreeSet::new(),
            reservation,
            stop_at: None,
        }
    }

    /// Require a notary.
    pub fn with_notary(mut self, notary: Option<Party>) -> Self {
        self.notary = notary;
        self
    }

    /// Restrict to the given issuers.
    pub fn with_issuers(mut self, issuers: BTreeSet<Party>) -> Self {
        self.issuers = issuers;
        self
    }

    /// Restrict to the given issuer references.
    pub fn with_issuer_refs(mut self, issuer_refs: BTreeSet<IssuerRef>) -> Self {
        self.issuer_refs = issuer_refs;
        self
    }

    /// Ask the store to stop once the running total reaches `target`.
    pub fn with_stop_at(mut self, target: u64) -> Self {
        self.stop_at = Some(target);
        self
    }

    /// Whether `state` satisfies every predicate of this query.
    pub fn matches(&self, state: &LedgerState) -> bool {
        state.is_claimable_by(self.reservation)
            && state.currency() == &self.currency
            && self.notary.as_ref().is_none_or(|n| &state.notary == n)
            && (self.issuers.is_empty() || self.issuers.contains(&state.issuer))
            && (self.issuer_refs.is_empty() || self.issuer_refs.contains(&state.issuer_ref))
    }
}

/// A matching state together with the running total up to and including it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendCandidate {
    /// The matching state.
    pub state: LedgerState,

    /// Sum of quantities of this and all earlier rows in the result.
    pub cumulative: u64,
}

/// Compute running totals client-side over already-filtered, ordered states.
///
/// Emits rows until the first one whose cumulative total reaches `stop_at`,
/// or every row when `stop_at` is `None`. Totals saturate at `u64::MAX`.
pub fn running_totals(
    states: impl IntoIterator<Item = LedgerState>,
    stop_at: Option<u64>,
) -> Vec<SpendCandidate> {
    let mut cumulative = 0u64;
    let mut rows = Vec::new();

    for state in states {
        cumulative = cumulative.saturating_add(state.quantity());
        rows.push(SpendCandidate { state, cumulative });

        if stop_at.is_some_and(|target| cumulative >= target) {
            break;
        }
    }

    rows
}
