//! Native fungible token amounts and denomination metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An amount of a single native denomination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination name
    pub denom: String,
    /// Amount in base units
    pub amount: u128,
}

impl Coin {
    /// Create a coin
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Whether the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Display metadata for a native denomination, read when deploying an
/// EVM-side pointer for it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DenomMetadata {
    /// Base denomination
    pub base: String,
    /// Display denomination
    pub display: String,
    /// Human readable name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Decimal places of the display unit
    pub decimals: u8,
}

impl DenomMetadata {
    /// Metadata derived from the denomination alone, used when none is registered
    pub fn fallback(denom: &str) -> Self {
        Self {
            base: denom.to_string(),
            display: denom.to_string(),
            name: denom.to_string(),
            symbol: denom.to_uppercase(),
            decimals: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_display() {
        assert_eq!(Coin::new("udual", 42).to_string(), "42udual");
        assert!(Coin::new("udual", 0).is_zero());
    }

    #[test]
    fn test_metadata_fallback() {
        let meta = DenomMetadata::fallback("uatom");
        assert_eq!(meta.symbol, "UATOM");
        assert_eq!(meta.base, "uatom");
    }

    #[test]
    fn test_coin_json() {
        let json = serde_json::to_string(&Coin::new("udual", 7)).unwrap();
        assert_eq!(json, r#"{"denom":"udual","amount":7}"#);
    }
}
