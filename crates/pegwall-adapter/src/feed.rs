/*
[INPUT]:  Unit identifiers
[OUTPUT]: PriceFeed contract for independently sourced prices
[POS]:    Data layer - sanity-check price source consumed by the control loop
[UPDATE]: When the feed contract changes
*/

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::http::{HttpError, Result};

/// Independent price source used to validate the reference price.
///
/// Callers do not retry; implementations handle their own fallbacks.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn price(&self, unit: &str) -> Result<Decimal>;
}

/// Feed serving fixed prices, settable at runtime.
#[derive(Debug, Default)]
pub struct StaticPriceFeed {
    prices: RwLock<HashMap<String, Decimal>>,
}

impl StaticPriceFeed {
    pub fn new<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        Self {
            prices: RwLock::new(prices.into_iter().map(|(u, p)| (u.into(), p)).collect()),
        }
    }

    pub fn set(&self, unit: &str, price: Decimal) {
        let mut prices = self.prices.write().unwrap_or_else(|p| p.into_inner());
        prices.insert(unit.to_string(), price);
    }
}

#[async_trait]
impl PriceFeed for StaticPriceFeed {
    async fn price(&self, unit: &str) -> Result<Decimal> {
        let prices = self.prices.read().unwrap_or_else(|p| p.into_inner());
        prices
            .get(unit)
            .copied()
            .ok_or_else(|| HttpError::InvalidResponse(format!("no price available for {unit}")))
    }
}
