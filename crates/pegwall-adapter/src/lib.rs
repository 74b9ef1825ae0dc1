/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public pegwall adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod exchange;
pub mod feed;
pub mod http;
pub mod reference;
pub mod types;

// Re-export the venue contract
pub use exchange::{
    ExchangeAdapter,
    ExchangeError,
    LOCAL_FAULT_MARKER,
    NonceTracker,
    PaperExchange,
};

// Re-export price sources
pub use feed::{PriceFeed, StaticPriceFeed};
pub use http::{ClientConfig, HttpError, HttpPriceFeed, ReferenceClient};
pub use reference::{INTEREST_PATH, ReferenceConnection, fetch_price};

// Re-export all types
pub use types::*;
