/*
[INPUT]:  Ticker URL template with a `{unit}` placeholder
[OUTPUT]: Independent unit prices for the sanity check
[POS]:    HTTP layer - PriceFeed over reqwest, retried on transient failures
[UPDATE]: When the ticker payload format changes
*/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::feed::PriceFeed;
use crate::http::{ClientConfig, HttpError, Result};
use crate::reference::extract_price;

const UNIT_PLACEHOLDER: &str = "{unit}";
const DEFAULT_TRIALS: u32 = 3;

/// Ticker-backed price feed.
#[derive(Debug, Clone)]
pub struct HttpPriceFeed {
    http_client: Client,
    url_template: String,
    retry_delay: Duration,
    trials: u32,
}

impl HttpPriceFeed {
    pub fn new(url_template: &str) -> Result<Self> {
        Self::with_config(url_template, ClientConfig::default())
    }

    pub fn with_config(url_template: &str, config: ClientConfig) -> Result<Self> {
        if !url_template.contains(UNIT_PLACEHOLDER) {
            return Err(HttpError::InvalidResponse(format!(
                "feed url template must contain {UNIT_PLACEHOLDER}: {url_template}"
            )));
        }
        // Validate the template once with a sample unit.
        Url::parse(&url_template.replace(UNIT_PLACEHOLDER, "usd"))?;

        Ok(Self {
            http_client: config.build()?,
            url_template: url_template.to_string(),
            retry_delay: config.retry_delay,
            trials: DEFAULT_TRIALS,
        })
    }

    /// Attempts per `price` call; zero is treated as one.
    pub fn with_trials(mut self, trials: u32) -> Self {
        self.trials = trials.max(1);
        self
    }

    pub fn trials(&self) -> u32 {
        self.trials
    }

    fn url_for(&self, unit: &str) -> Result<Url> {
        Ok(Url::parse(&self.url_template.replace(UNIT_PLACEHOLDER, unit))?)
    }

    async fn price_once(&self, url: Url) -> Result<Decimal> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::status(status, body));
        }
        let body: Value = response.json().await?;
        extract_price(&body)
    }
}

#[async_trait]
impl PriceFeed for HttpPriceFeed {
    async fn price(&self, unit: &str) -> Result<Decimal> {
        let url = self.url_for(unit)?;
        let mut trial = 1;
        loop {
            match self.price_once(url.clone()).await {
                Ok(price) => return Ok(price),
                Err(err) if trial < self.trials && err.is_retryable() => {
                    debug!(unit, trial, error = %err, "ticker request failed; retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    trial += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
