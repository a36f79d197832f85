//! Selection requests.

use crate::{RetryPolicy, SelectionError};
use std::collections::BTreeSet;
use std::fmt;
use vault_store::StateQuery;
use vault_types::{Amount, IssuerRef, Party, ReservationId};

/// What value is wanted and where it may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// Target amount; its currency is a mandatory filter.
    pub amount: Amount,

    /// Accepted issuers. Empty accepts any issuer.
    pub issuers: BTreeSet<Party>,

    /// Accepted issuer references. Empty accepts any reference.
    pub issuer_refs: BTreeSet<IssuerRef>,

    /// Required notary, if any.
    pub notary: Option<Party>,
}

impl SelectionCriteria {
    /// Criteria for `amount` with no further filters.
    pub fn new(amount: Amount) -> Self {
        Self {
            amount,
            issuers: BTreeSet::new(),
            issuer_refs: BTreeSet::new(),
            notary: None,
        }
    }

    /// Only accept value from these issuers.
    pub fn with_issuers(mut self, issuers: impl IntoIterator<Item = Party>) -> Self {
        self.issuers = issuers.into_iter().collect();
        self
    }

    /// Only accept value carrying one of these issuer references.
    pub fn with_issuer_refs(mut self, issuer_refs: impl IntoIterator<Item = IssuerRef>) -> Self {
        self.issuer_refs = issuer_refs.into_iter().collect();
        self
    }

    /// Only accept states assigned to this notary.
    pub fn with_notary(mut self, notary: Party) -> Self {
        self.notary = Some(notary);
        self
    }

    /// Check the criteria are internally consistent.
    pub fn validate(&self) -> Result<(), SelectionError> {
        let currency = &self.amount.currency;
        if currency.code().is_empty() {
            return Err(SelectionError::EmptyCurrency);
        }
        if !currency.is_valid() {
            return Err(SelectionError::InvalidCurrency(currency.code().to_string()));
        }
        if self.issuer_refs.iter().any(IssuerRef::is_empty) {
            return Err(SelectionError::EmptyIssuerRef);
        }
        Ok(())
    }

    /// The store query for these criteria on behalf of `reservation`.
    pub fn to_query(&self, reservation: ReservationId) -> StateQuery {
        StateQuery::new(self.amount.currency.clone(), reservation)
            .with_notary(self.notary.clone())
            .with_issuers(self.issuers.clone())
            .with_issuer_refs(self.issuer_refs.clone())
            .with_stop_at(self.amount.quantity)
    }
}

impl fmt::Display for SelectionCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.amount)?;
        if !self.issuers.is_empty() {
            let names: Vec<&str> = self.issuers.iter().map(|p| p.name.as_str()).collect();
            write!(f, " issuers=[{}]", names.join(", "))?;
        }
        if !self.issuer_refs.is_empty() {
            let refs: Vec<String> = self.issuer_refs.iter().map(|r| r.to_string()).collect();
            write!(f, " issuer_refs=[{}]", refs.join(", "))?;
        }
        if let Some(notary) = &self.notary {
            write!(f, " notary={notary}")?;
        }
        Ok(())
    }
}

/// A complete selection request: criteria, owner and retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    /// What to select.
    pub criteria: SelectionCriteria,

    /// Reservation that will own the soft locks.
    pub reservation: ReservationId,

    /// Attempt budget and backoff.
    pub retry: RetryPolicy,
}

impl SelectionRequest {
    /// Create a request with the default retry policy.
    pub fn new(criteria: SelectionCriteria, reservation: ReservationId) -> Self {
        Self {
            criteria,
            reservation,
            retry: RetryPolicy::default(),
        }
    }

    /// Use a custom retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Target quantity in minor units.
    pub fn target(&self) -> u64 {
        self.criteria.amount.quantity
    }

    /// Validate criteria and retry policy.
    pub fn validate(&self) -> Result<(), SelectionError> {
        self.criteria.validate()?;
        if self.retry.max_attempts == 0 {
            return Err(SelectionError::NoAttempts);
        }
        if self.retry.base_delay > self.retry.cap {
            return Err(SelectionError::BaseExceedsCap {
                base: self.retry.base_delay,
                cap: self.retry.cap,
            });
        }
        Ok(())
    }
}
