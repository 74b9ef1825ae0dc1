/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for pegwall-adapter tests

use std::time::Duration;

use pegwall_adapter::{ClientConfig, Credentials};
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Client configuration with a short retry delay
pub fn fast_client_config() -> ClientConfig {
    ClientConfig {
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(5),
        retry_delay: Duration::from_millis(5),
    }
}

/// Credentials for paper venues
#[allow(dead_code)]
pub fn test_credentials() -> Credentials {
    Credentials::new("test-key", "test-secret")
}
