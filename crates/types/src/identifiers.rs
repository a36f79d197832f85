//! Domain-specific identifier types.

use crate::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to one output of a transaction.
///
/// Ordering is by transaction hash first, then output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateRef {
    /// Hash of the transaction that produced the state.
    pub txhash: Hash,

    /// Position of the state among that transaction's outputs.
    pub index: u32,
}

impl StateRef {
    /// Create a new state reference.
    pub fn new(txhash: Hash, index: u32) -> Self {
        Self { txhash, index }
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", &self.txhash.to_hex()[..8], self.index)
    }
}

/// Soft-lock owner identifier.
///
/// Correlates a reservation with the flow that may later spend or
/// release the states it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub u128);

impl ReservationId {
    /// Create from a raw value.
    pub fn new(id: u128) -> Self {
        Self(id)
    }

    /// Derive a reservation id from a flow name.
    pub fn from_name(name: &str) -> Self {
        let hash = Hash::from_bytes(name.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash.as_bytes()[..16]);
        Self(u128::from_le_bytes(bytes))
    }

    /// Get the raw value.
    pub fn get(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reservation({:032x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ref_ordering() {
        let tx = Hash::from_bytes(b"tx");
        let a = StateRef::new(tx, 0);
        let b = StateRef::new(tx, 1);
        assert!(a < b);
        assert_eq!(a, StateRef::new(tx, 0));
    }

    #[test]
    fn test_reservation_from_name_is_stable() {
        let r1 = ReservationId::from_name("flow-1");
        assert_eq!(r1, ReservationId::from_name("flow-1"));
        assert_ne!(r1, ReservationId::from_name("flow-2"));
    }
}
