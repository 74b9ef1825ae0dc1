/*
[INPUT]:  YAML configuration file (with ${ENV} credential references)
[OUTPUT]: Parsed and validated bot configuration plus loop tuning
[POS]:    Configuration layer - bot setup
[UPDATE]: When adding new configuration options
*/

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the wall keeping bots
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    /// Reference price server
    pub reference: ReferenceConfig,
    /// Independent ticker used for the sanity check
    pub feed: FeedConfig,
    /// Credentials available to bots
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    /// Venues bots can quote on
    pub exchanges: Vec<ExchangeConfig>,
    /// One control loop per entry
    pub bots: Vec<BotEntry>,
    /// Loop timing and thresholds
    #[serde(default)]
    pub tuning: Tuning,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReferenceConfig {
    /// Base URL serving `price/<unit>` and `exchanges`
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Ticker URL with a `{unit}` placeholder
    pub url_template: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per ticker read before the tick fails
    #[serde(default = "default_feed_trials")]
    pub trials: u32,
}

/// Account credentials configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
    /// Account identifier referenced by bots
    pub id: String,
    /// API key, may be a `${VAR}` reference
    pub key: String,
    /// API secret, may be a `${VAR}` reference
    pub secret: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    Paper,
}

/// Venue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    /// Venue name; also its identity for locking and caching
    pub name: String,
    #[serde(default = "default_exchange_kind")]
    pub kind: ExchangeKind,
    /// Pegged unit traded on this venue
    #[serde(default = "default_peg_unit")]
    pub peg_unit: String,
    /// Starting balances of a paper venue
    #[serde(default)]
    pub balances: HashMap<String, Decimal>,
}

/// Configuration for a single bot
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotEntry {
    /// Bot identifier
    pub id: String,
    /// Exchange name
    pub exchange: String,
    /// Account identifier
    pub account_id: String,
    /// Quote unit (e.g. "usd", "btc")
    pub unit: String,
    /// Fractional markup/markdown around the reference price
    #[serde(default = "default_spread")]
    pub spread: Decimal,
    /// Start withdrawn; quoting begins on resume
    #[serde(default)]
    pub paused: bool,
}

/// Timing and thresholds of the control loop.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Tuning {
    pub tick_secs: u64,
    pub reset_retry_delay_secs: u64,
    /// Max deviation between reference and feed price before withdrawing
    pub sanity_threshold: Decimal,
    /// Deviation from the last reset price that triggers cancel + replace
    pub reset_threshold: Decimal,
    /// Balances at or below this are not quoted
    pub min_balance: Decimal,
    pub price_trials: u32,
    pub startup_price_trials: u32,
    pub interest_trials: u32,
    pub shutdown_attempts: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            tick_secs: 30,
            reset_retry_delay_secs: 5,
            sanity_threshold: Decimal::new(5, 3),
            reset_threshold: Decimal::new(425, 5),
            min_balance: Decimal::new(1, 4),
            price_trials: 3,
            startup_price_trials: 1,
            interest_trials: 1,
            shutdown_attempts: 10,
        }
    }
}

impl Tuning {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn reset_retry_delay(&self) -> Duration {
        Duration::from_secs(self.reset_retry_delay_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.tick_secs == 0 {
            bail!("tuning.tick_secs must be positive");
        }
        if self.sanity_threshold <= Decimal::ZERO || self.reset_threshold <= Decimal::ZERO {
            bail!("tuning thresholds must be positive");
        }
        if self.min_balance < Decimal::ZERO {
            bail!("tuning.min_balance must not be negative");
        }
        if self.shutdown_attempts == 0 {
            bail!("tuning.shutdown_attempts must be at least 1");
        }
        Ok(())
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_feed_trials() -> u32 {
    3
}

fn default_exchange_kind() -> ExchangeKind {
    ExchangeKind::Paper
}

fn default_peg_unit() -> String {
    "nbt".to_string()
}

fn default_spread() -> Decimal {
    Decimal::new(2, 3)
}

impl BotConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse, expand `${VAR}` credentials, and validate.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(content)?;
        for account in &mut config.accounts {
            account.key = expand_env(&account.key)
                .with_context(|| format!("account {} key", account.id))?;
            account.secret = expand_env(&account.secret)
                .with_context(|| format!("account {} secret", account.id))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tuning.validate()?;

        let exchanges: HashSet<&str> = self.exchanges.iter().map(|e| e.name.as_str()).collect();
        if exchanges.len() != self.exchanges.len() {
            bail!("duplicate exchange name");
        }
        let accounts: HashSet<&str> = self.accounts.iter().map(|a| a.id.as_str()).collect();

        let mut ids = HashSet::new();
        for bot in &self.bots {
            if !ids.insert(bot.id.as_str()) {
                bail!("duplicate bot id: {}", bot.id);
            }
            if !exchanges.contains(bot.exchange.as_str()) {
                bail!("bot {} references unknown exchange {}", bot.id, bot.exchange);
            }
            if !accounts.contains(bot.account_id.as_str()) {
                bail!("bot {} references unknown account {}", bot.id, bot.account_id);
            }
            if bot.spread <= Decimal::ZERO || bot.spread >= Decimal::ONE {
                bail!("bot {} spread must be in (0, 1), got {}", bot.id, bot.spread);
            }
        }
        Ok(())
    }

    pub fn account(&self, id: &str) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn exchange(&self, name: &str) -> Option<&ExchangeConfig> {
        self.exchanges.iter().find(|e| e.name == name)
    }
}

/// Replace a whole-value `${VAR}` reference with the environment value.
fn expand_env(value: &str) -> Result<String> {
    let trimmed = value.trim();
    match trimmed
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(var) => std::env::var(var).with_context(|| format!("environment variable {var} not set")),
        None => Ok(value.to_string()),
    }
}
