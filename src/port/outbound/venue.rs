//! Venue feed port.
//!
//! A feed turns one venue's REST payloads into venue-neutral records. It does
//! no normalization of prices and no persistence; the ingestion service does
//! both.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{MarketType, ParsedHints, PriceFormat, VenueId};
use crate::error::Result;

/// A sports event as listed by a venue.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueEvent {
    pub external_ref: String,
    pub title: String,
    pub hints: ParsedHints,
}

/// A market as listed by a venue.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueMarket {
    pub venue_market_key: String,
    pub question: String,
    /// Venue-declared type; inferred from the question when absent.
    pub market_type: Option<MarketType>,
    pub status: String,
    /// Hints the venue's structured fields give directly.
    pub hints: ParsedHints,
    /// Outcome names in the venue's order.
    pub outcome_names: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub event_ref: Option<String>,
}

/// A price for one outcome of a venue market.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueQuote {
    pub venue_market_key: String,
    /// Index into the market's outcome order.
    pub outcome_index: usize,
    pub raw_price: Decimal,
    pub price_format: PriceFormat,
    pub observed_at: DateTime<Utc>,
}

#[async_trait]
pub trait VenueFeed: Send + Sync {
    fn venue_id(&self) -> &VenueId;

    /// Venues without an event listing return nothing.
    async fn fetch_events(&self) -> Result<Vec<VenueEvent>> {
        Ok(Vec::new())
    }

    async fn fetch_markets(&self) -> Result<Vec<VenueMarket>>;

    async fn fetch_quotes(&self) -> Result<Vec<VenueQuote>>;
}
