/*
[INPUT]:  Venue-specific adapters (paper, live integrations)
[OUTPUT]: ExchangeAdapter capability set consumed by the quoting core
[POS]:    Exchange layer - call contract for balance/order/cancel/resync
[UPDATE]: When the venue call contract changes
*/

pub mod error;
pub mod nonce;
pub mod paper;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{Credentials, ExchangeId, Side};

pub use error::{ExchangeError, LOCAL_FAULT_MARKER, Result};
pub use nonce::NonceTracker;
pub use paper::PaperExchange;

/// Capability set of a trading venue.
///
/// Implementations convert every failure into an [`ExchangeError`]; nothing
/// is expected to panic out of these calls.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Configured venue name. Must be stable for the adapter's lifetime.
    fn name(&self) -> &str;

    /// Available balance of `unit`.
    async fn get_balance(&self, unit: &str, credentials: &Credentials) -> Result<Decimal>;

    /// Submit a limit order on the `unit` market.
    async fn place_order(
        &self,
        unit: &str,
        side: Side,
        credentials: &Credentials,
        size: Decimal,
        price: Decimal,
    ) -> Result<()>;

    /// Cancel every open order on the `unit` market.
    async fn cancel_orders(&self, unit: &str, credentials: &Credentials) -> Result<()>;

    /// Venue-specific resynchronization after a rejected call.
    async fn adjust(&self, error: &ExchangeError);

    /// Resynchronization counter, for logging only.
    fn nonce_shift(&self) -> i64;
}

impl ExchangeId {
    /// Identity shared by every control loop quoting on `adapter`.
    pub fn of(adapter: &dyn ExchangeAdapter) -> Self {
        ExchangeId::new(adapter.name())
    }
}
