/*
[INPUT]:  Exchange adapter, credentials, unit pair, shared Coordinator, reference connection
[OUTPUT]: WallKeeper - the collaborators one control loop mutates its walls through
[POS]:    Strategy layer - shared plumbing for placement, reset and shutdown
[UPDATE]: When adding collaborators or retry settings to the quoting core
*/

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use pegwall_adapter::{
    Credentials, ExchangeAdapter, ExchangeError, ExchangeId, INTEREST_PATH, ReferenceConnection,
    UnitPair,
};

use crate::config::Tuning;
use crate::coordination::Coordinator;
use crate::error::{Interrupted, interruptible};

/// Retry and sizing settings of the quoting core.
#[derive(Debug, Clone)]
pub struct KeeperSettings {
    pub reset_retry_delay: Duration,
    pub min_balance: Decimal,
    pub shutdown_attempts: u32,
    pub interest_trials: u32,
}

impl From<&Tuning> for KeeperSettings {
    fn from(tuning: &Tuning) -> Self {
        Self {
            reset_retry_delay: tuning.reset_retry_delay(),
            min_balance: tuning.min_balance,
            shutdown_attempts: tuning.shutdown_attempts,
            interest_trials: tuning.interest_trials,
        }
    }
}

impl Default for KeeperSettings {
    fn default() -> Self {
        Self::from(&Tuning::default())
    }
}

/// Everything needed to keep the walls of one (exchange, unit) pair.
pub struct WallKeeper {
    pub(crate) exchange: Arc<dyn ExchangeAdapter>,
    pub(crate) exchange_id: ExchangeId,
    pub(crate) credentials: Credentials,
    pub(crate) units: UnitPair,
    pub(crate) spread: Decimal,
    pub(crate) coordinator: Arc<Coordinator>,
    pub(crate) reference: Arc<dyn ReferenceConnection>,
    pub(crate) interrupt: CancellationToken,
    pub(crate) settings: KeeperSettings,
}

impl std::fmt::Debug for WallKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WallKeeper")
            .field("exchange", &self.exchange_id)
            .field("units", &self.units)
            .field("spread", &self.spread)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl WallKeeper {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        exchange: Arc<dyn ExchangeAdapter>,
        credentials: Credentials,
        units: UnitPair,
        spread: Decimal,
        coordinator: Arc<Coordinator>,
        reference: Arc<dyn ReferenceConnection>,
        interrupt: CancellationToken,
        settings: KeeperSettings,
    ) -> Self {
        let exchange_id = ExchangeId::of(exchange.as_ref());
        Self {
            exchange,
            exchange_id,
            credentials,
            units,
            spread,
            coordinator,
            reference,
            interrupt,
            settings,
        }
    }

    pub fn exchange_id(&self) -> &ExchangeId {
        &self.exchange_id
    }

    pub fn units(&self) -> &UnitPair {
        &self.units
    }

    /// Market the walls rest on.
    pub(crate) fn market(&self) -> &str {
        &self.units.quote_unit
    }

    /// Refresh the shared interest cache for this exchange.
    ///
    /// Fetch failures are logged and reported as `None`.
    pub(crate) async fn refresh_interest(&self) -> Result<Option<Value>, Interrupted> {
        let reference = self.reference.clone();
        let trials = self.settings.interest_trials;
        let fetch = self.coordinator.get_interest(&self.exchange_id, || async move {
            reference.get(INTEREST_PATH, trials).await
        });

        match interruptible(&self.interrupt, fetch).await? {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(exchange = %self.exchange_id, error = %err, "interest refresh failed");
                Ok(None)
            }
        }
    }

    /// Let the venue resynchronize after `error`.
    pub(crate) async fn resync(&self, error: &ExchangeError) -> Result<(), Interrupted> {
        interruptible(&self.interrupt, self.exchange.adjust(error)).await?;
        debug!(
            exchange = %self.exchange_id,
            unit = %self.market(),
            nonce_shift = self.exchange.nonce_shift(),
            "exchange resynchronized"
        );
        Ok(())
    }
}
