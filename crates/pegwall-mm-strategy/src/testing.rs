/*
[INPUT]:  Scripted venue/reference responses from unit tests
[OUTPUT]: Recording mock collaborators for the quoting core
[POS]:    Test support - compiled only for cfg(test)
[UPDATE]: When the adapter or reference contracts change
*/

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use pegwall_adapter::{
    Credentials, ExchangeAdapter, ExchangeError, HttpError, ReferenceConnection, Side, UnitPair,
};

use crate::coordination::Coordinator;
use crate::keeper::{KeeperSettings, WallKeeper};

pub(crate) fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal")
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Balance(String),
    Place {
        unit: String,
        side: Side,
        size: Decimal,
        price: Decimal,
    },
    Cancel(String),
    Adjust(String),
}

impl Call {
    pub(crate) fn is_place(&self) -> bool {
        matches!(self, Call::Place { .. })
    }

    pub(crate) fn is_cancel(&self) -> bool {
        matches!(self, Call::Cancel(_))
    }

    pub(crate) fn is_adjust(&self) -> bool {
        matches!(self, Call::Adjust(_))
    }
}

/// Venue that records every call and fails from scripted queues.
#[derive(Debug, Default)]
pub(crate) struct MockExchange {
    name: String,
    calls: Mutex<Vec<Call>>,
    balances: Mutex<HashMap<String, Decimal>>,
    balance_errors: Mutex<VecDeque<ExchangeError>>,
    place_errors: Mutex<VecDeque<ExchangeError>>,
    cancel_errors: Mutex<VecDeque<ExchangeError>>,
    call_delay: Duration,
    shift: AtomicI64,
}

impl MockExchange {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    pub(crate) fn with_balance(self, unit: &str, amount: &str) -> Self {
        self.balances
            .lock()
            .unwrap()
            .insert(unit.to_string(), dec(amount));
        self
    }

    pub(crate) fn fail_balance(&self, error: ExchangeError) {
        self.balance_errors.lock().unwrap().push_back(error);
    }

    pub(crate) fn fail_place(&self, error: ExchangeError) {
        self.place_errors.lock().unwrap().push_back(error);
    }

    pub(crate) fn fail_cancel(&self, error: ExchangeError) {
        self.cancel_errors.lock().unwrap().push_back(error);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|&c| pred(c)).count()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    async fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
    }

    fn scripted(queue: &Mutex<VecDeque<ExchangeError>>) -> Result<(), ExchangeError> {
        match queue.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ExchangeAdapter for MockExchange {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_balance(&self, unit: &str, _credentials: &Credentials) -> Result<Decimal, ExchangeError> {
        self.record(Call::Balance(unit.to_string())).await;
        Self::scripted(&self.balance_errors)?;
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(unit)
            .copied()
            .unwrap_or_default())
    }

    async fn place_order(
        &self,
        unit: &str,
        side: Side,
        _credentials: &Credentials,
        size: Decimal,
        price: Decimal,
    ) -> Result<(), ExchangeError> {
        self.record(Call::Place {
            unit: unit.to_string(),
            side,
            size,
            price,
        })
        .await;
        Self::scripted(&self.place_errors)
    }

    async fn cancel_orders(&self, unit: &str, _credentials: &Credentials) -> Result<(), ExchangeError> {
        self.record(Call::Cancel(unit.to_string())).await;
        Self::scripted(&self.cancel_errors)
    }

    async fn adjust(&self, error: &ExchangeError) {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Adjust(error.detail().to_string()));
        self.shift.fetch_add(1, Ordering::SeqCst);
    }

    fn nonce_shift(&self) -> i64 {
        self.shift.load(Ordering::SeqCst)
    }
}

/// Reference server answering `price/<unit>` from a settable table.
#[derive(Debug, Default)]
pub(crate) struct MockReference {
    prices: Mutex<HashMap<String, Decimal>>,
    requests: Mutex<Vec<(String, u32)>>,
}

impl MockReference {
    pub(crate) fn with_price(unit: &str, price: &str) -> Self {
        let reference = Self::default();
        reference.set_price(unit, Some(price));
        reference
    }

    /// `None` makes the price path fail.
    pub(crate) fn set_price(&self, unit: &str, price: Option<&str>) {
        let mut prices = self.prices.lock().unwrap();
        match price {
            Some(price) => prices.insert(unit.to_string(), dec(price)),
            None => prices.remove(unit),
        };
    }

    pub(crate) fn requests(&self) -> Vec<(String, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReferenceConnection for MockReference {
    async fn get(&self, path: &str, trials: u32) -> Result<Value, HttpError> {
        self.requests.lock().unwrap().push((path.to_string(), trials));
        if path == "exchanges" {
            return Ok(json!({ "paper": { "interest": "0.0025" } }));
        }
        let unit = path.trim_start_matches("price/");
        match self.prices.lock().unwrap().get(unit) {
            Some(price) => Ok(json!({ "price": price.to_string() })),
            None => Err(HttpError::InvalidResponse(format!("no price for {unit}"))),
        }
    }
}

pub(crate) fn keeper(
    exchange: Arc<MockExchange>,
    quote_unit: &str,
    coordinator: Arc<Coordinator>,
    interrupt: CancellationToken,
) -> WallKeeper {
    WallKeeper::new(
        exchange,
        Credentials::new("key", "secret"),
        UnitPair::new(quote_unit, "nbt"),
        dec("0.002"),
        coordinator,
        Arc::new(MockReference::with_price(quote_unit, "100")),
        interrupt,
        KeeperSettings::default(),
    )
}
