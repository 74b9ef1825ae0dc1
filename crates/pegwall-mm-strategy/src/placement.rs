/*
[INPUT]:  Side, last known reference price, venue balance of the funding unit
[OUTPUT]: PlacementOutcome - placed, skipped for low balance, or failed with the venue error
[POS]:    Strategy layer - single-sided wall submission
[UPDATE]: When changing sizing, balance thresholds or placement error handling
*/

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use pegwall_adapter::{ExchangeError, Side};

use crate::error::{Interrupted, interruptible};
use crate::keeper::WallKeeper;
use crate::pricing::{order_size, side_price};

/// Result of one placement attempt. Venue failures are values, never raised.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    Placed {
        side: Side,
        price: Decimal,
        size: Decimal,
    },
    /// Balance too small to quote; not an error.
    Skipped { side: Side, balance: Decimal },
    Failed(ExchangeError),
}

impl PlacementOutcome {
    pub fn error(&self) -> Option<&ExchangeError> {
        match self {
            PlacementOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self, PlacementOutcome::Placed { .. })
    }
}

impl WallKeeper {
    /// Place the `side` wall around `server_price` using the whole available balance.
    ///
    /// Submits at most one order and resynchronizes the venue at most once.
    pub async fn place(&self, side: Side, server_price: Decimal) -> Result<PlacementOutcome, Interrupted> {
        let price = side_price(server_price, side, self.spread);
        let unit = self.units.funding_unit(side);

        let balance = match interruptible(
            &self.interrupt,
            self.exchange.get_balance(unit, &self.credentials),
        )
        .await?
        {
            Ok(balance) => balance,
            Err(err) => {
                warn!(
                    exchange = %self.exchange_id,
                    unit = %unit,
                    side = %side,
                    error = %err,
                    "balance query failed"
                );
                self.resync(&err).await?;
                return Ok(PlacementOutcome::Failed(err));
            }
        };

        if balance <= self.settings.min_balance {
            debug!(
                exchange = %self.exchange_id,
                unit = %unit,
                side = %side,
                %balance,
                "balance too small; side skipped"
            );
            return Ok(PlacementOutcome::Skipped { side, balance });
        }

        self.refresh_interest().await?;

        let size = order_size(side, balance, price);
        let submitted = interruptible(
            &self.interrupt,
            self.exchange
                .place_order(self.market(), side, &self.credentials, size, price),
        )
        .await?;

        match submitted {
            Ok(()) => {
                info!(
                    exchange = %self.exchange_id,
                    unit = %self.market(),
                    side = %side,
                    %price,
                    %size,
                    "wall placed"
                );
                Ok(PlacementOutcome::Placed { side, price, size })
            }
            Err(err) => {
                warn!(
                    exchange = %self.exchange_id,
                    unit = %self.market(),
                    side = %side,
                    %price,
                    %size,
                    error = %err,
                    "order placement failed"
                );
                self.resync(&err).await?;
                Ok(PlacementOutcome::Failed(err))
            }
        }
    }
}
