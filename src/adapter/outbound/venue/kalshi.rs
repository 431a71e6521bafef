//! Kalshi feed over the public trade API (`/trade-api/v2`).
//!
//! Sports games are listed as events (`KXNBAGAME-25DEC10PHXOKC`) with one
//! yes/no market per team (`KXNBAGAME-25DEC10PHXOKC-OKC`). A per-team market
//! is treated as a moneyline whose first outcome is the named team: buying
//! Yes backs that team, buying No backs its opponent. Prices are in cents.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use super::client::JsonClient;
use super::settings::KalshiConfig;
use crate::domain::parser::{parse_ticker, parse_timestamp};
use crate::domain::{MarketType, PriceFormat, VenueId};
use crate::error::Result;
use crate::port::outbound::venue::{VenueEvent, VenueFeed, VenueMarket, VenueQuote};

pub const VENUE: &str = "kalshi";

#[derive(Debug, Clone, Deserialize)]
pub struct EventsResponse {
    #[serde(default)]
    pub events: Vec<KalshiEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KalshiEvent {
    pub event_ticker: String,
    #[serde(default)]
    pub series_ticker: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sub_title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl KalshiEvent {
    fn is_sports(&self) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("sports"))
    }

    fn into_venue_event(self) -> VenueEvent {
        let mut hints = parse_ticker(&self.event_ticker).hints;
        if hints.sport.is_none() {
            if let Some(series) = &self.series_ticker {
                let series_hints = parse_ticker(series).hints;
                hints.sport = series_hints.sport;
                hints.league = series_hints.league;
            }
        }
        let title = self
            .title
            .or(self.sub_title)
            .unwrap_or_else(|| self.event_ticker.clone());
        VenueEvent {
            external_ref: self.event_ticker,
            title,
            hints,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketsResponse {
    #[serde(default)]
    pub markets: Vec<KalshiMarket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KalshiMarket {
    pub ticker: String,
    #[serde(default)]
    pub event_ticker: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub close_time: Option<String>,
    #[serde(default)]
    pub expected_expiration_time: Option<String>,
    #[serde(default)]
    pub yes_ask: Option<i64>,
    #[serde(default)]
    pub no_ask: Option<i64>,
    #[serde(default)]
    pub last_price: Option<i64>,
    /// Present on multivariate combo markets, which are not ingested.
    #[serde(default)]
    pub mve_selected_legs: Option<Vec<serde_json::Value>>,
}

impl KalshiMarket {
    fn is_combo(&self) -> bool {
        self.mve_selected_legs
            .as_ref()
            .is_some_and(|legs| !legs.is_empty())
    }

    fn into_venue_market(self) -> VenueMarket {
        let parsed = parse_ticker(&self.ticker);
        let mut hints = parsed.hints;
        if hints.start_time.is_none() {
            hints.start_time = self
                .event_ticker
                .as_deref()
                .and_then(|t| parse_ticker(t).hints.start_time);
        }

        // Per-team markets list the named team first so index 0 is the Yes side.
        let (market_type, outcome_names) = match (&parsed.subject, &hints.home_team, &hints.away_team) {
            (Some(subject), Some(home), Some(away)) => {
                let other = if subject == home { away } else { home };
                (Some(MarketType::Moneyline), vec![subject.clone(), other.clone()])
            }
            _ => (None, vec!["Yes".to_string(), "No".to_string()]),
        };

        VenueMarket {
            venue_market_key: self.ticker,
            question: self.title.unwrap_or_default(),
            market_type,
            status: self.status.unwrap_or_else(|| "open".into()),
            hints,
            outcome_names,
            expires_at: self
                .expected_expiration_time
                .as_deref()
                .or(self.close_time.as_deref())
                .and_then(parse_timestamp),
            event_ref: self.event_ticker,
        }
    }

    /// Cost to buy each side, in cents. Yes falls back to the last trade.
    fn quotes(&self, observed_at: chrono::DateTime<Utc>) -> Vec<VenueQuote> {
        let yes = self.yes_ask.filter(|c| *c > 0).or(self.last_price);
        let no = self.no_ask.filter(|c| *c > 0);
        [yes, no]
            .into_iter()
            .enumerate()
            .filter_map(|(index, cents)| {
                cents.map(|c| VenueQuote {
                    venue_market_key: self.ticker.clone(),
                    outcome_index: index,
                    raw_price: Decimal::from(c),
                    price_format: PriceFormat::Cents,
                    observed_at,
                })
            })
            .collect()
    }
}

pub struct KalshiFeed {
    venue: VenueId,
    client: JsonClient,
    config: KalshiConfig,
}

impl KalshiFeed {
    #[must_use]
    pub fn from_config(config: &KalshiConfig) -> Self {
        Self {
            venue: VenueId::new(VENUE),
            client: JsonClient::from_config(&config.http),
            config: config.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        let mut url = format!(
            "{}/trade-api/v2/{path}?status=open&limit={}",
            self.config.api_url.trim_end_matches('/'),
            self.config.market_limit
        );
        if let Some(series) = &self.config.series_ticker {
            url.push_str("&series_ticker=");
            url.push_str(series);
        }
        url
    }

    async fn get_markets(&self) -> Result<Vec<KalshiMarket>> {
        let url = self.url("markets");
        info!(url = %url, "Fetching open markets (Kalshi)");
        let response: MarketsResponse = self.client.get_with_retry(&url).await?;
        let total = response.markets.len();
        let markets: Vec<KalshiMarket> = response
            .markets
            .into_iter()
            .filter(|m| !m.is_combo())
            .collect();
        debug!(total, kept = markets.len(), "Fetched markets from Kalshi");
        Ok(markets)
    }
}

#[async_trait]
impl VenueFeed for KalshiFeed {
    fn venue_id(&self) -> &VenueId {
        &self.venue
    }

    async fn fetch_events(&self) -> Result<Vec<VenueEvent>> {
        let url = self.url("events");
        info!(url = %url, "Fetching open events (Kalshi)");
        let response: EventsResponse = self.client.get_with_retry(&url).await?;
        Ok(response
            .events
            .into_iter()
            .filter(KalshiEvent::is_sports)
            .map(KalshiEvent::into_venue_event)
            .collect())
    }

    async fn fetch_markets(&self) -> Result<Vec<VenueMarket>> {
        Ok(self
            .get_markets()
            .await?
            .into_iter()
            .map(KalshiMarket::into_venue_market)
            .collect())
    }

    async fn fetch_quotes(&self) -> Result<Vec<VenueQuote>> {
        let now = Utc::now();
        Ok(self
            .get_markets()
            .await?
            .iter()
            .flat_map(|m| m.quotes(now))
            .collect())
    }
}
