/*
[INPUT]:  ExchangeId of each quoting bot, interest fetch closures
[OUTPUT]: Per-exchange reset lock and 120s time-gated interest cache
[POS]:    Coordination layer - the only state shared across control loops
[UPDATE]: When changing cache freshness or lock granularity
*/

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::debug;

use pegwall_adapter::ExchangeId;

/// Interest data older than this is fetched again.
pub const INTEREST_TTL: Duration = Duration::from_secs(120);

static GLOBAL: OnceLock<Arc<Coordinator>> = OnceLock::new();

#[derive(Debug, Default)]
struct InterestSlot {
    fetched_at: Option<Instant>,
    value: Value,
}

/// Process-wide registry keyed by exchange identity.
///
/// Entries are created on first use and live as long as the registry.
#[derive(Debug)]
pub struct Coordinator {
    locks: Mutex<HashMap<ExchangeId, Arc<AsyncMutex<()>>>>,
    interest: Mutex<HashMap<ExchangeId, Arc<AsyncMutex<InterestSlot>>>>,
    interest_ttl: Duration,
}

impl Coordinator {
    pub fn new(interest_ttl: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            interest: Mutex::new(HashMap::new()),
            interest_ttl,
        }
    }

    /// Registry shared by every bot in this process.
    pub fn global() -> Arc<Coordinator> {
        GLOBAL
            .get_or_init(|| Arc::new(Coordinator::new(INTEREST_TTL)))
            .clone()
    }

    /// Wait for exclusive access to `exchange`. Dropping the guard releases it.
    pub async fn acquire_lock(&self, exchange: &ExchangeId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            locks.entry(exchange.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Cached interest data for `exchange`, refreshed through `fetch` once the
    /// cached copy is older than the TTL.
    ///
    /// A failed fetch is returned to the caller and the stale copy is kept.
    /// Concurrent callers wait for an in-flight fetch instead of issuing
    /// their own.
    pub async fn get_interest<F, Fut, E>(&self, exchange: &ExchangeId, fetch: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        let slot = {
            let mut slots = self.interest.lock().unwrap_or_else(|p| p.into_inner());
            slots.entry(exchange.clone()).or_default().clone()
        };

        let mut slot = slot.lock().await;
        if let Some(fetched_at) = slot.fetched_at
            && fetched_at.elapsed() <= self.interest_ttl
        {
            return Ok(slot.value.clone());
        }

        let value = fetch().await?;
        debug!(exchange = %exchange, "interest cache refreshed");
        slot.fetched_at = Some(Instant::now());
        slot.value = value.clone();
        Ok(value)
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(INTEREST_TTL)
    }
}
