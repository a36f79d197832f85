//! Ledger participant identities.

use crate::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A well-known ledger participant.
///
/// Equality covers both the legal name and the key fingerprint, so two
/// parties sharing a name under different keys never match a filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Party {
    /// Legal name.
    pub name: String,

    /// Fingerprint of the party's signing key.
    pub key: Hash,
}

impl Party {
    /// Create a party with an explicit key fingerprint.
    pub fn new(name: impl Into<String>, key: Hash) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    /// Create a party whose key fingerprint is derived from its name.
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = Hash::from_parts(&[b"party:", name.as_bytes()]);
        Self { name, key }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
