/*
[INPUT]:  Reference server paths ("price/<unit>", "exchanges") and trial counts
[OUTPUT]: ReferenceConnection contract plus typed price extraction
[POS]:    Data layer - reference price source consumed by the control loop
[UPDATE]: When the reference server payload or polling contract changes
*/

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::http::{HttpError, Result};
use crate::types::parse_decimal_value;

/// Generic polling call against the reference server.
///
/// `trials` is the number of attempts the implementation makes before giving
/// up; zero is treated as one.
#[async_trait]
pub trait ReferenceConnection: Send + Sync {
    async fn get(&self, path: &str, trials: u32) -> Result<Value>;
}

/// Path serving the reference price of `unit`.
pub fn price_path(unit: &str) -> String {
    format!("price/{unit}")
}

/// Path serving venue-wide interest/listing data.
pub const INTEREST_PATH: &str = "exchanges";

/// Fetch the reference price of `unit`.
pub async fn fetch_price(conn: &dyn ReferenceConnection, unit: &str, trials: u32) -> Result<Decimal> {
    let body = conn.get(&price_path(unit), trials).await?;
    extract_price(&body)
}

/// Read a strictly positive `price` field from a JSON body.
pub fn extract_price(body: &Value) -> Result<Decimal> {
    let price = body
        .get("price")
        .and_then(parse_decimal_value)
        .ok_or_else(|| HttpError::InvalidResponse(format!("missing price in {body}")))?;
    if price <= Decimal::ZERO {
        return Err(HttpError::InvalidResponse(format!("non-positive price {price}")));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::str::FromStr;

    #[rstest]
    #[case(json!({ "price": 1.0025 }), "1.0025")]
    #[case(json!({ "price": "0.00003512" }), "0.00003512")]
    #[case(json!({ "price": 100, "unit": "usd" }), "100")]
    fn extract_price_reads_number_and_string(#[case] body: Value, #[case] expected: &str) {
        assert_eq!(extract_price(&body).unwrap(), Decimal::from_str(expected).unwrap());
    }

    #[rstest]
    #[case(json!({ "unit": "usd" }))]
    #[case(json!({ "price": 0 }))]
    #[case(json!({ "price": "-1" }))]
    #[case(json!({ "price": "abc" }))]
    fn extract_price_rejects_missing_or_invalid(#[case] body: Value) {
        assert!(extract_price(&body).is_err());
    }

    #[test]
    fn price_path_uses_unit() {
        assert_eq!(price_path("btc"), "price/btc");
    }
}
