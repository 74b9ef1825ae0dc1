/*
[INPUT]:  Failures raised while talking to a venue (transport faults, venue rejections)
[OUTPUT]: ExchangeError with local-fault vs venue-reported classification
[POS]:    Error handling layer - venue call results
[UPDATE]: When adding new failure classes or changing the fault marker
*/

use std::fmt;

use thiserror::Error;

/// Marker carried by the rendered text of every local fault.
///
/// Venue adapters that only hand back free-form error text are classified by
/// this marker in [`ExchangeError::from_message`].
pub const LOCAL_FAULT_MARKER: &str = "exception caught:";

/// Error returned by an exchange adapter call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// The call failed locally (timeout, malformed response, unexpected failure).
    #[error("exception caught: {0}")]
    LocalFault(String),

    /// The venue answered with an explicit error payload.
    #[error("{0}")]
    Venue(String),
}

impl ExchangeError {
    /// Wrap any failure that happened on our side of the wire.
    pub fn fault(err: impl fmt::Display) -> Self {
        ExchangeError::LocalFault(err.to_string())
    }

    pub fn venue(message: impl Into<String>) -> Self {
        ExchangeError::Venue(message.into())
    }

    /// Classify free-form error text by the local-fault marker.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match message.find(LOCAL_FAULT_MARKER) {
            Some(idx) => {
                let detail = message[idx + LOCAL_FAULT_MARKER.len()..].trim();
                ExchangeError::LocalFault(detail.to_string())
            }
            None => ExchangeError::Venue(message),
        }
    }

    /// Local faults are retried after a delay; venue errors need resynchronization.
    pub fn is_local_fault(&self) -> bool {
        matches!(self, ExchangeError::LocalFault(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            ExchangeError::LocalFault(detail) | ExchangeError::Venue(detail) => detail,
        }
    }
}

/// Result type alias for venue calls.
pub type Result<T> = std::result::Result<T, ExchangeError>;
