/*
[INPUT]:  HTTP client configuration and collaborator endpoints
[OUTPUT]: Reference server and price feed clients with typed results
[POS]:    HTTP layer - REST communication with price sources
[UPDATE]: When adding new HTTP collaborators or changing client behavior
*/

pub mod client;
pub mod error;
pub mod feed;
pub mod reference;

pub use error::{HttpError, Result};

pub use client::ClientConfig;
pub use feed::HttpPriceFeed;
pub use reference::ReferenceClient;
