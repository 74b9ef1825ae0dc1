/*
[INPUT]:  Venue configuration (names, units, API keys) and JSON payloads
[OUTPUT]: Exchange identity, unit pair, credentials, decimal parsing helpers
[POS]:    Data layer - core data models shared across the workspace
[UPDATE]: When adding new shared models or payload fields
*/

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

/// Stable identity of a venue.
///
/// Every piece of cross-bot coordination state is keyed by this value, so it
/// must be derived the same way for every control loop quoting on the venue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExchangeId(String);

impl ExchangeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two units whose exchange rate is quoted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitPair {
    /// Non-pegged unit (e.g. "usd", "btc"); funds the bid.
    pub quote_unit: String,
    /// Pegged unit (e.g. "nbt"); funds the ask.
    pub peg_unit: String,
}

impl UnitPair {
    pub fn new(quote_unit: impl Into<String>, peg_unit: impl Into<String>) -> Self {
        Self {
            quote_unit: quote_unit.into(),
            peg_unit: peg_unit.into(),
        }
    }

    /// Unit whose balance funds an order on `side`.
    pub fn funding_unit(&self, side: Side) -> &str {
        match side {
            Side::Bid => &self.quote_unit,
            Side::Ask => &self.peg_unit,
        }
    }
}

impl fmt::Display for UnitPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.peg_unit, self.quote_unit)
    }
}

/// API credentials handed to every authenticated venue call.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Parse a decimal from a JSON string or number.
pub fn parse_decimal_value(value: &serde_json::Value) -> Option<Decimal> {
    if let Some(raw) = value.as_str() {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        return Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok();
    }

    if value.is_number() {
        let raw = value.to_string();
        return Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .ok();
    }

    None
}
