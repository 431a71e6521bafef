//! Venue feed configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::FeeModel;
use crate::error::ConfigError;

/// HTTP client settings shared by the venue feeds.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_http_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Maximum number of attempts for transient failures.
    #[serde(default = "default_http_retry_max_attempts")]
    pub retry_max_attempts: u32,
    /// Backoff between retries in milliseconds.
    #[serde(default = "default_http_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

const fn default_http_timeout_ms() -> u64 {
    10_000
}

const fn default_http_connect_timeout_ms() -> u64 {
    2000
}

const fn default_http_retry_max_attempts() -> u32 {
    3
}

const fn default_http_retry_backoff_ms() -> u64 {
    500
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_http_timeout_ms(),
            connect_timeout_ms: default_http_connect_timeout_ms(),
            retry_max_attempts: default_http_retry_max_attempts(),
            retry_backoff_ms: default_http_retry_backoff_ms(),
        }
    }
}

/// Polymarket Gamma API feed.
#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_gamma_url")]
    pub gamma_api_url: String,
    /// Optional Gamma tag filter, e.g. the sports tag id.
    #[serde(default)]
    pub tag_id: Option<String>,
    /// Markets requested per listing.
    #[serde(default = "default_market_limit")]
    pub market_limit: usize,
    #[serde(default = "default_polymarket_fees")]
    pub fees: FeeModel,
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_gamma_url() -> String {
    "https://gamma-api.polymarket.com".into()
}

fn default_polymarket_fees() -> FeeModel {
    FeeModel::ProfitCommission {
        commission_rate: Decimal::new(2, 2),
    }
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gamma_api_url: default_gamma_url(),
            tag_id: None,
            market_limit: default_market_limit(),
            fees: default_polymarket_fees(),
            http: HttpConfig::default(),
        }
    }
}

/// Kalshi trade API feed. Only public market data endpoints are used.
#[derive(Debug, Clone, Deserialize)]
pub struct KalshiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_kalshi_url")]
    pub api_url: String,
    /// Restrict listings to one series, e.g. `KXNBAGAME`.
    #[serde(default)]
    pub series_ticker: Option<String>,
    #[serde(default = "default_market_limit")]
    pub market_limit: usize,
    #[serde(default = "default_kalshi_fees")]
    pub fees: FeeModel,
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_kalshi_url() -> String {
    "https://api.elections.kalshi.com".into()
}

fn default_kalshi_fees() -> FeeModel {
    FeeModel::PerContract {
        trading_fee: Decimal::new(2, 2),
        settlement_fee: Decimal::new(1, 2),
    }
}

impl Default for KalshiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_kalshi_url(),
            series_ticker: None,
            market_limit: default_market_limit(),
            fees: default_kalshi_fees(),
            http: HttpConfig::default(),
        }
    }
}

/// The `[venues]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenuesConfig {
    #[serde(default)]
    pub polymarket: PolymarketConfig,
    #[serde(default)]
    pub kalshi: KalshiConfig,
}

impl VenuesConfig {
    /// Check URLs, limits and fee models.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polymarket.enabled {
            check_url("venues.polymarket.gamma_api_url", &self.polymarket.gamma_api_url)?;
            check_limit("venues.polymarket.market_limit", self.polymarket.market_limit)?;
            check_fees("venues.polymarket.fees", &self.polymarket.fees)?;
        }
        if self.kalshi.enabled {
            check_url("venues.kalshi.api_url", &self.kalshi.api_url)?;
            check_limit("venues.kalshi.market_limit", self.kalshi.market_limit)?;
            check_fees("venues.kalshi.fees", &self.kalshi.fees)?;
        }
        Ok(())
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidValue {
            field,
            reason: e.to_string(),
        })
}

fn check_limit(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 || value > 1000 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be between 1 and 1000".into(),
        });
    }
    Ok(())
}

fn check_fees(field: &'static str, fees: &FeeModel) -> Result<(), ConfigError> {
    fees.validate()
        .map_err(|reason| ConfigError::InvalidValue { field, reason })
}

const fn default_true() -> bool {
    true
}

const fn default_market_limit() -> usize {
    200
}
