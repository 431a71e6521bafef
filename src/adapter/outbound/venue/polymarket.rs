//! Polymarket feed over the Gamma API.
//!
//! Gamma lists markets with their question, outcome names and current
//! outcome prices. Outcome names and prices arrive as JSON-encoded strings
//! (`"[\"Yes\", \"No\"]"`), decoded here. Prices are share prices in (0, 1).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use super::client::JsonClient;
use super::settings::PolymarketConfig;
use crate::domain::parser::{parse_timestamp, KNOWN_SPORTS};
use crate::domain::{ParsedHints, PriceFormat, VenueId};
use crate::error::Result;
use crate::port::outbound::venue::{VenueFeed, VenueMarket, VenueQuote};

pub const VENUE: &str = "polymarket";

/// A market as returned by `GET /markets` on the Gamma API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub closed: bool,
    /// JSON-encoded outcome names.
    #[serde(default)]
    pub outcomes: Option<String>,
    /// JSON-encoded outcome prices, aligned with `outcomes`.
    #[serde(default)]
    pub outcome_prices: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub game_start_time: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl GammaMarket {
    fn key(&self) -> Option<String> {
        self.id
            .clone()
            .or_else(|| self.slug.clone())
            .filter(|k| !k.is_empty())
    }

    fn status(&self) -> &'static str {
        if self.closed {
            "closed"
        } else if self.active {
            "active"
        } else {
            "paused"
        }
    }

    /// Decode the JSON-encoded outcome names.
    pub fn outcome_names(&self) -> Vec<String> {
        decode_list(self.outcomes.as_deref())
    }

    /// Decode the JSON-encoded outcome prices. Unparseable entries are `None`
    /// so indices stay aligned with the names.
    pub fn outcome_prices(&self) -> Vec<Option<Decimal>> {
        decode_list(self.outcome_prices.as_deref())
            .iter()
            .map(|p| p.trim().parse::<Decimal>().ok())
            .collect()
    }

    fn hints(&self) -> ParsedHints {
        let sport = self
            .category
            .as_deref()
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty() && c != "SPORTS");
        ParsedHints {
            league: sport.clone().filter(|s| KNOWN_SPORTS.contains(&s.as_str())),
            sport,
            start_time: self.game_start_time.as_deref().and_then(parse_gamma_time),
            ..ParsedHints::default()
        }
    }

    fn into_venue_market(self) -> Option<VenueMarket> {
        let key = self.key()?;
        let question = self.question.clone().unwrap_or_default();
        Some(VenueMarket {
            venue_market_key: key,
            hints: self.hints(),
            outcome_names: self.outcome_names(),
            market_type: None,
            status: self.status().to_string(),
            expires_at: self.end_date.as_deref().and_then(parse_gamma_time),
            event_ref: None,
            question,
        })
    }

    fn quotes(&self, fetched_at: DateTime<Utc>) -> Vec<VenueQuote> {
        let Some(key) = self.key() else {
            return Vec::new();
        };
        let observed_at = self
            .updated_at
            .as_deref()
            .and_then(parse_gamma_time)
            .unwrap_or(fetched_at);
        self.outcome_prices()
            .into_iter()
            .enumerate()
            .filter_map(|(index, price)| {
                price.map(|raw_price| VenueQuote {
                    venue_market_key: key.clone(),
                    outcome_index: index,
                    raw_price,
                    price_format: PriceFormat::Probability,
                    observed_at,
                })
            })
            .collect()
    }
}

fn decode_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| {
        serde_json::from_str::<Vec<String>>(s)
            .map_err(|e| debug!(error = %e, raw = %s, "Failed to decode Gamma list"))
            .ok()
    })
    .unwrap_or_default()
}

/// Gamma mixes RFC 3339 with `2025-12-10 00:00:00+00`.
fn parse_gamma_time(value: &str) -> Option<DateTime<Utc>> {
    parse_timestamp(value).or_else(|| {
        DateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S%#z")
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    })
}

pub struct PolymarketFeed {
    venue: VenueId,
    client: JsonClient,
    config: PolymarketConfig,
}

impl PolymarketFeed {
    #[must_use]
    pub fn from_config(config: &PolymarketConfig) -> Self {
        Self {
            venue: VenueId::new(VENUE),
            client: JsonClient::from_config(&config.http),
            config: config.clone(),
        }
    }

    fn markets_url(&self) -> String {
        let mut url = format!(
            "{}/markets?active=true&closed=false&limit={}",
            self.config.gamma_api_url.trim_end_matches('/'),
            self.config.market_limit
        );
        if let Some(tag) = &self.config.tag_id {
            url.push_str("&tag_id=");
            url.push_str(tag);
        }
        url
    }

    /// Fetch the raw Gamma listing.
    ///
    /// # Errors
    /// HTTP or decoding failures.
    pub async fn get_gamma_markets(&self) -> Result<Vec<GammaMarket>> {
        let url = self.markets_url();
        info!(url = %url, "Fetching active markets (Gamma)");
        let markets: Vec<GammaMarket> = self.client.get_with_retry(&url).await?;
        debug!(count = markets.len(), "Fetched markets from Gamma");
        Ok(markets)
    }
}

#[async_trait]
impl VenueFeed for PolymarketFeed {
    fn venue_id(&self) -> &VenueId {
        &self.venue
    }

    async fn fetch_markets(&self) -> Result<Vec<VenueMarket>> {
        Ok(self
            .get_gamma_markets()
            .await?
            .into_iter()
            .filter_map(GammaMarket::into_venue_market)
            .collect())
    }

    async fn fetch_quotes(&self) -> Result<Vec<VenueQuote>> {
        let now = Utc::now();
        Ok(self
            .get_gamma_markets()
            .await?
            .iter()
            .flat_map(|m| m.quotes(now))
            .collect())
    }
}
