/*
[INPUT]:  Reference server base URL, request paths, trial counts
[OUTPUT]: JSON bodies from the reference server, retried per call site
[POS]:    HTTP layer - ReferenceConnection over reqwest
[UPDATE]: When the reference server protocol or retry policy changes
*/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use crate::http::{ClientConfig, HttpError, Result};
use crate::reference::ReferenceConnection;

/// HTTP client for the reference price server.
#[derive(Debug, Clone)]
pub struct ReferenceClient {
    http_client: Client,
    base_url: Url,
    retry_delay: Duration,
}

impl ReferenceClient {
    /// Create a new client with default configuration
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(base_url: &str, config: ClientConfig) -> Result<Self> {
        // Url::join replaces the last segment unless the base ends with '/'.
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };

        Ok(Self {
            http_client: config.build()?,
            base_url,
            retry_delay: config.retry_delay,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_once(&self, path: &str) -> Result<Value> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(HttpError::status(status, text));
        }

        let body: Value = serde_json::from_str(&text)?;
        if let Some(error) = body.get("error") {
            let error = match error.as_str() {
                Some(text) => text.to_string(),
                None => error.to_string(),
            };
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.clone());
            return Err(HttpError::Reported { error, message });
        }

        Ok(body)
    }
}

#[async_trait]
impl ReferenceConnection for ReferenceClient {
    async fn get(&self, path: &str, trials: u32) -> Result<Value> {
        let attempts = trials.max(1);
        let mut trial = 1;
        loop {
            match self.get_once(path).await {
                Ok(body) => return Ok(body),
                Err(err) if trial < attempts && err.is_retryable() => {
                    debug!(path, trial, error = %err, "reference request failed; retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    trial += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::fetch_price;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::str::FromStr;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config() -> ClientConfig {
        ClientConfig {
            retry_delay: Duration::from_millis(10),
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/price/usd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "price": 1.0025 })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ReferenceClient::with_config(&server.uri(), fast_config()).unwrap();
        let price = fetch_price(&client, "usd", 3).await.unwrap();
        assert_eq!(price, Decimal::from_str("1.0025").unwrap());
    }

    #[tokio::test]
    async fn test_base_url_path_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/exchanges"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "bittrex": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/api/v1", server.uri());
        let client = ReferenceClient::with_config(&base, fast_config()).unwrap();
        let body = client.get("exchanges", 1).await.unwrap();
        assert!(body.get("bittrex").is_some());
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/price/btc"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/price/btc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "price": "0.0000351" })))
            .with_priority(2)
            .mount(&server)
            .await;

        let client = ReferenceClient::with_config(&server.uri(), fast_config()).unwrap();
        let price = fetch_price(&client, "btc", 3).await.unwrap();
        assert_eq!(price, Decimal::from_str("0.0000351").unwrap());
    }

    #[tokio::test]
    async fn test_gives_up_after_trials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/price/usd"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let client = ReferenceClient::with_config(&server.uri(), fast_config()).unwrap();
        let err = fetch_price(&client, "usd", 3).await.unwrap_err();
        assert!(matches!(err, HttpError::Status { code: 500, .. }));
    }

    #[tokio::test]
    async fn test_reported_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/price/xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "unknown_unit",
                "message": "unit xyz is not served",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ReferenceClient::with_config(&server.uri(), fast_config()).unwrap();
        let err = fetch_price(&client, "xyz", 3).await.unwrap_err();
        assert_eq!(err.message(), "unit xyz is not served");
    }

    #[tokio::test]
    async fn test_zero_trials_still_attempts_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exchanges"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ReferenceClient::with_config(&server.uri(), fast_config()).unwrap();
        assert!(client.get("exchanges", 0).await.is_ok());
    }
}
