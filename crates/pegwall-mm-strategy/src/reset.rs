/*
[INPUT]:  Cancel flag, reference price, per-exchange lock from the Coordinator
[OUTPUT]: Reset protocol (cancel + place both walls until clean) and bounded shutdown
[POS]:    Strategy layer - the only code path that mutates resting walls
[UPDATE]: When changing retry policy, lock scope or shutdown attempts
*/

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use pegwall_adapter::{ExchangeError, Side};

use crate::error::{Interrupted, interruptible, sleep_or_interrupt};
use crate::keeper::WallKeeper;
use crate::placement::PlacementOutcome;

/// What the clean pass of a reset placed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetSummary {
    /// Passes run, including the final clean one.
    pub passes: u32,
    pub bid: PlacementOutcome,
    pub ask: PlacementOutcome,
}

impl WallKeeper {
    /// Cancel (when `cancel` is set) and place both walls, repeating the whole
    /// cycle until one pass completes without error.
    ///
    /// Holds the exchange lock throughout. There is no retry ceiling; only the
    /// interrupt ends an unsuccessful reset.
    pub async fn reset(&self, cancel: bool, server_price: Decimal) -> Result<ResetSummary, Interrupted> {
        let _guard = interruptible(
            &self.interrupt,
            self.coordinator.acquire_lock(&self.exchange_id),
        )
        .await?;

        let mut passes = 0;
        loop {
            passes += 1;
            let err = match self.reset_pass(cancel, server_price).await? {
                Ok((bid, ask)) => {
                    info!(
                        exchange = %self.exchange_id,
                        unit = %self.market(),
                        cancel,
                        passes,
                        %server_price,
                        "reset complete"
                    );
                    return Ok(ResetSummary { passes, bid, ask });
                }
                Err(err) => err,
            };

            if err.is_local_fault() {
                warn!(
                    exchange = %self.exchange_id,
                    unit = %self.market(),
                    error = %err,
                    delay = ?self.settings.reset_retry_delay,
                    "reset hit a local fault; retrying after delay"
                );
                sleep_or_interrupt(&self.interrupt, self.settings.reset_retry_delay).await?;
            } else {
                warn!(
                    exchange = %self.exchange_id,
                    unit = %self.market(),
                    error = %err,
                    "reset rejected by venue; resynchronizing"
                );
                self.resync(&err).await?;
            }
        }
    }

    async fn reset_pass(
        &self,
        cancel: bool,
        server_price: Decimal,
    ) -> Result<Result<(PlacementOutcome, PlacementOutcome), ExchangeError>, Interrupted> {
        if cancel
            && let Err(err) = interruptible(
                &self.interrupt,
                self.exchange.cancel_orders(self.market(), &self.credentials),
            )
            .await?
        {
            return Ok(Err(err));
        }

        let bid = match self.place(Side::Bid, server_price).await? {
            PlacementOutcome::Failed(err) => return Ok(Err(err)),
            outcome => outcome,
        };
        let ask = match self.place(Side::Ask, server_price).await? {
            PlacementOutcome::Failed(err) => return Ok(Err(err)),
            outcome => outcome,
        };
        Ok(Ok((bid, ask)))
    }

    /// Withdraw every wall on this market.
    ///
    /// Makes at most `shutdown_attempts` cancel calls, resynchronizing after
    /// each failure. Returns whether a cancel succeeded. Does not take the
    /// exchange lock.
    pub async fn shutdown(&self) -> Result<bool, Interrupted> {
        for attempt in 1..=self.settings.shutdown_attempts {
            match interruptible(
                &self.interrupt,
                self.exchange.cancel_orders(self.market(), &self.credentials),
            )
            .await?
            {
                Ok(()) => {
                    info!(
                        exchange = %self.exchange_id,
                        unit = %self.market(),
                        attempt,
                        "walls withdrawn"
                    );
                    return Ok(true);
                }
                Err(err) => {
                    warn!(
                        exchange = %self.exchange_id,
                        unit = %self.market(),
                        attempt,
                        error = %err,
                        "cancel during shutdown failed"
                    );
                    self.resync(&err).await?;
                }
            }
        }

        error!(
            exchange = %self.exchange_id,
            unit = %self.market(),
            attempts = self.settings.shutdown_attempts,
            "giving up on withdrawing walls"
        );
        Ok(false)
    }
}
