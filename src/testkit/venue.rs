//! In-memory venue feed.

use async_trait::async_trait;

use crate::domain::VenueId;
use crate::error::{IngestError, Result};
use crate::port::outbound::venue::{VenueEvent, VenueFeed, VenueMarket, VenueQuote};

/// A [`VenueFeed`] that serves fixed payloads, or fails every call.
#[derive(Debug, Clone)]
pub struct StaticFeed {
    venue: VenueId,
    events: Vec<VenueEvent>,
    markets: Vec<VenueMarket>,
    quotes: Vec<VenueQuote>,
    failing: bool,
}

impl StaticFeed {
    pub fn new(venue: &str) -> Self {
        Self {
            venue: VenueId::new(venue),
            events: Vec::new(),
            markets: Vec::new(),
            quotes: Vec::new(),
            failing: false,
        }
    }

    pub fn with_events(mut self, events: Vec<VenueEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_markets(mut self, markets: Vec<VenueMarket>) -> Self {
        self.markets = markets;
        self
    }

    pub fn with_quotes(mut self, quotes: Vec<VenueQuote>) -> Self {
        self.quotes = quotes;
        self
    }

    /// Every fetch returns `UnexpectedPayload`.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            return Err(IngestError::UnexpectedPayload {
                venue: self.venue.to_string(),
                reason: "scripted failure".into(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl VenueFeed for StaticFeed {
    fn venue_id(&self) -> &VenueId {
        &self.venue
    }

    async fn fetch_events(&self) -> Result<Vec<VenueEvent>> {
        self.check()?;
        Ok(self.events.clone())
    }

    async fn fetch_markets(&self) -> Result<Vec<VenueMarket>> {
        self.check()?;
        Ok(self.markets.clone())
    }

    async fn fetch_quotes(&self) -> Result<Vec<VenueQuote>> {
        self.check()?;
        Ok(self.quotes.clone())
    }
}
