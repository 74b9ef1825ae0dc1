/*
[INPUT]:  Initial balances, order/cancel calls from the quoting core
[OUTPUT]: In-memory venue with reserved balances and resting orders
[POS]:    Exchange layer - paper adapter for dry runs and tests
[UPDATE]: When the ExchangeAdapter contract changes
*/

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use super::{ExchangeAdapter, ExchangeError, NonceTracker, Result};
use crate::types::{Credentials, Side};

/// A resting order held by the paper venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperOrder {
    pub nonce: u64,
    pub unit: String,
    pub side: Side,
    pub size: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Default)]
struct PaperBook {
    balances: HashMap<String, Decimal>,
    orders: Vec<PaperOrder>,
}

/// Paper venue. Placing an order reserves its funding balance; cancelling
/// releases it. Orders never fill.
#[derive(Debug)]
pub struct PaperExchange {
    name: String,
    peg_unit: String,
    book: Mutex<PaperBook>,
    nonce: NonceTracker,
}

impl PaperExchange {
    pub fn new(name: impl Into<String>, peg_unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            peg_unit: peg_unit.into(),
            book: Mutex::new(PaperBook::default()),
            nonce: NonceTracker::new(None),
        }
    }

    pub fn with_balances<I, S>(mut self, balances: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        let book = self.book.get_mut().unwrap_or_else(|p| p.into_inner());
        for (unit, amount) in balances {
            book.balances.insert(unit.into(), amount);
        }
        self
    }

    pub fn deposit(&self, unit: &str, amount: Decimal) {
        let mut book = self.lock_book();
        *book.balances.entry(unit.to_string()).or_default() += amount;
    }

    pub fn open_orders(&self, unit: &str) -> Vec<PaperOrder> {
        self.lock_book()
            .orders
            .iter()
            .filter(|order| order.unit == unit)
            .cloned()
            .collect()
    }

    pub fn balance(&self, unit: &str) -> Decimal {
        self.lock_book()
            .balances
            .get(unit)
            .copied()
            .unwrap_or_default()
    }

    fn lock_book(&self) -> std::sync::MutexGuard<'_, PaperBook> {
        self.book.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn reserve_unit<'a>(&'a self, unit: &'a str, side: Side) -> &'a str {
        match side {
            Side::Bid => unit,
            Side::Ask => &self.peg_unit,
        }
    }

    fn sign(&self) -> u64 {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.nonce.next(now_ms)
    }
}

fn reserved_amount(side: Side, size: Decimal, price: Decimal) -> Decimal {
    match side {
        Side::Bid => size * price,
        Side::Ask => size,
    }
}

#[async_trait]
impl ExchangeAdapter for PaperExchange {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_balance(&self, unit: &str, _credentials: &Credentials) -> Result<Decimal> {
        self.sign();
        Ok(self.balance(unit))
    }

    async fn place_order(
        &self,
        unit: &str,
        side: Side,
        _credentials: &Credentials,
        size: Decimal,
        price: Decimal,
    ) -> Result<()> {
        if size <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(ExchangeError::venue(format!(
                "invalid order size {size} or price {price}"
            )));
        }

        let nonce = self.sign();
        let reserve_unit = self.reserve_unit(unit, side).to_string();
        let amount = reserved_amount(side, size, price);

        let mut book = self.lock_book();
        let available = book.balances.get(&reserve_unit).copied().unwrap_or_default();
        if amount > available {
            return Err(ExchangeError::venue(format!(
                "insufficient {reserve_unit} balance: need {amount}, have {available}"
            )));
        }
        book.balances.insert(reserve_unit, available - amount);
        book.orders.push(PaperOrder {
            nonce,
            unit: unit.to_string(),
            side,
            size,
            price,
        });
        debug!(exchange = %self.name, unit, %side, %size, %price, nonce, "paper order resting");
        Ok(())
    }

    async fn cancel_orders(&self, unit: &str, _credentials: &Credentials) -> Result<()> {
        self.sign();
        let mut book = self.lock_book();
        let (cancelled, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut book.orders)
            .into_iter()
            .partition(|order| order.unit == unit);
        book.orders = kept;
        for order in &cancelled {
            let reserve_unit = self.reserve_unit(&order.unit, order.side).to_string();
            *book.balances.entry(reserve_unit).or_default() +=
                reserved_amount(order.side, order.size, order.price);
        }
        debug!(exchange = %self.name, unit, cancelled = cancelled.len(), "paper orders cancelled");
        Ok(())
    }

    async fn adjust(&self, error: &ExchangeError) {
        self.nonce.adjust(&error.to_string());
    }

    fn nonce_shift(&self) -> i64 {
        self.nonce.shift()
    }
}
