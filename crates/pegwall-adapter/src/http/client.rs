/*
[INPUT]:  HTTP configuration (timeouts, retry delay)
[OUTPUT]: Configured reqwest client shared by the reference and feed clients
[POS]:    HTTP layer - core client construction
[UPDATE]: When adding connection options or changing client behavior
*/

use std::time::Duration;

use reqwest::Client;

use crate::http::Result;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Pause between two trials of the same request.
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    pub(crate) fn build(&self) -> Result<Client> {
        let client = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()?;
        Ok(client)
    }
}
