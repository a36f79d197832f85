//! Fungible value types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency code (e.g. `GBP`).
///
/// Construction does not validate; [`Currency::is_valid`] is checked where a
/// request enters the system so malformed codes fail before touching a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Create a currency from its code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// A code is valid when non-empty and ASCII alphanumeric.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A quantity of a currency in minor units (pennies, cents).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    /// Quantity in minor units.
    pub quantity: u64,

    /// Currency the quantity is denominated in.
    pub currency: Currency,
}

impl Amount {
    /// Create a new amount.
    pub fn new(quantity: u64, currency: Currency) -> Self {
        Self { quantity, currency }
    }

    /// Whether this is the zero amount.
    pub fn is_zero(&self) -> bool {
        self.quantity == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quantity, self.currency)
    }
}

/// Opaque issuer-assigned reference bytes.
///
/// Lets an issuer distinguish value it issued under different programs or
/// accounts.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuerRef(Vec<u8>);

impl IssuerRef {
    /// Create from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the reference carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for IssuerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IssuerRef({})", hex::encode(&self.0))
    }
}

impl fmt::Display for IssuerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_validity() {
        assert!(Currency::new("GBP").is_valid());
        assert!(Currency::new("XAU1").is_valid());
        assert!(!Currency::new("").is_valid());
        assert!(!Currency::new("G-B").is_valid());
        assert!(!Currency::new("€").is_valid());
    }

    #[test]
    fn test_amount_display() {
        let amount = Amount::new(700, Currency::new("GBP"));
        assert_eq!(amount.to_string(), "700 GBP");
        assert!(!amount.is_zero());
        assert!(Amount::new(0, Currency::new("GBP")).is_zero());
    }

    #[test]
    fn test_issuer_ref_serde_is_transparent() {
        let r = IssuerRef::new(vec![1u8, 2, 3]);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "[1,2,3]");
        assert_eq!(r.to_string(), "010203");
    }
}
