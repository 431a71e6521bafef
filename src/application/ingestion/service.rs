//! Venue ingestion service.
//!
//! Pulls events, markets and quotes from each configured venue feed and
//! records them in the store.
//!
//! ```text
//! VenueFeed (polymarket) --+
//!                          +--> parse hints, label outcomes --> upsert_market
//! VenueFeed (kalshi)     --+--> normalize_with_fees         --> insert_quote
//! ```
//!
//! Venues are ingested concurrently and independently. A failing venue is
//! reported in its own result; malformed records are skipped and counted.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::parser::{parse_question, KNOWN_SPORTS};
use crate::domain::{
    normalize_with_fees, EventSource, FeeModel, MarketStatus, MarketType, NewMarket, NewQuote,
    NewSportsEvent, OutcomeLabel, VenueId,
};
use crate::error::{IngestError, Result};
use crate::port::outbound::store::Store;
use crate::port::outbound::venue::{VenueEvent, VenueFeed, VenueMarket, VenueQuote};

/// Counts from one venue ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub events_created: usize,
    pub events_skipped: usize,
    pub markets_upserted: usize,
    pub markets_linked: usize,
    pub markets_skipped: usize,
    pub quotes_recorded: usize,
    pub unknown_market: usize,
    pub unknown_outcome: usize,
    pub invalid_price: usize,
}

/// Outcome of ingesting one venue during a fan-out.
#[derive(Debug, Serialize)]
pub struct VenueReport {
    pub venue_id: VenueId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<IngestSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct VenueEntry {
    feed: Arc<dyn VenueFeed>,
    fees: FeeModel,
}

/// Pulls venue listings and prices into the store.
///
/// Markets are labelled and linked by venue event reference on the way in;
/// quotes are normalized with the venue's fee model and keep the venue's
/// outcome label.
pub struct IngestionService {
    store: Arc<dyn Store>,
    venues: HashMap<VenueId, VenueEntry>,
    duplicate_tolerance: Duration,
}

impl IngestionService {
    /// A service with no venues. Add them with [`Self::with_feed`].
    pub fn new(store: Arc<dyn Store>, duplicate_tolerance: Duration) -> Self {
        Self {
            store,
            venues: HashMap::new(),
            duplicate_tolerance,
        }
    }

    /// Register a venue feed with its fee model.
    #[must_use]
    pub fn with_feed(mut self, feed: Arc<dyn VenueFeed>, fees: FeeModel) -> Self {
        self.venues
            .insert(feed.venue_id().clone(), VenueEntry { feed, fees });
        self
    }

    /// Configured venues, sorted.
    #[must_use]
    pub fn venue_ids(&self) -> Vec<VenueId> {
        let mut ids: Vec<VenueId> = self.venues.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn entry(&self, venue: &VenueId) -> Result<&VenueEntry> {
        self.venues.get(venue).ok_or_else(|| {
            IngestError::UnknownVenue {
                venue: venue.to_string(),
            }
            .into()
        })
    }

    /// Pull the venue's event listing and markets.
    ///
    /// # Errors
    /// `UnknownVenue` for an unconfigured venue; feed and store failures.
    pub async fn ingest_markets(&self, venue: &VenueId) -> Result<IngestSummary> {
        let entry = self.entry(venue)?;
        let mut summary = IngestSummary::default();

        for event in entry.feed.fetch_events().await? {
            self.record_event(event, &mut summary).await?;
        }
        for market in entry.feed.fetch_markets().await? {
            self.record_market(venue, market, &mut summary).await?;
        }

        info!(
            venue = %venue,
            events_created = summary.events_created,
            markets = summary.markets_upserted,
            linked = summary.markets_linked,
            skipped = summary.markets_skipped,
            "Market ingestion complete"
        );
        Ok(summary)
    }

    /// Pull the venue's current quotes for known markets.
    ///
    /// # Errors
    /// `UnknownVenue` for an unconfigured venue; feed and store failures.
    pub async fn ingest_quotes(&self, venue: &VenueId) -> Result<IngestSummary> {
        let entry = self.entry(venue)?;
        let mut summary = IngestSummary::default();

        for quote in entry.feed.fetch_quotes().await? {
            self.record_quote(venue, &entry.fees, quote, &mut summary)
                .await?;
        }

        info!(
            venue = %venue,
            recorded = summary.quotes_recorded,
            unknown_market = summary.unknown_market,
            unknown_outcome = summary.unknown_outcome,
            invalid_price = summary.invalid_price,
            "Quote ingestion complete"
        );
        Ok(summary)
    }

    /// Ingest markets, then optionally quotes, for one venue.
    ///
    /// # Errors
    /// As [`Self::ingest_markets`] and [`Self::ingest_quotes`].
    pub async fn ingest_venue(&self, venue: &VenueId, quotes: bool) -> Result<IngestSummary> {
        let mut summary = self.ingest_markets(venue).await?;
        if quotes {
            let q = self.ingest_quotes(venue).await?;
            summary.quotes_recorded = q.quotes_recorded;
            summary.unknown_market = q.unknown_market;
            summary.unknown_outcome = q.unknown_outcome;
            summary.invalid_price = q.invalid_price;
        }
        Ok(summary)
    }

    /// Ingest every configured venue concurrently.
    ///
    /// One venue failing does not affect the others.
    pub async fn ingest_all(&self, quotes: bool) -> Vec<VenueReport> {
        let venues = self.venue_ids();
        let runs = venues.iter().map(|venue| async move {
            match self.ingest_venue(venue, quotes).await {
                Ok(summary) => VenueReport {
                    venue_id: venue.clone(),
                    summary: Some(summary),
                    error: None,
                },
                Err(e) => {
                    warn!(venue = %venue, error = %e, "Venue ingestion failed");
                    VenueReport {
                        venue_id: venue.clone(),
                        summary: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        });
        join_all(runs).await
    }

    async fn record_event(&self, event: VenueEvent, summary: &mut IngestSummary) -> Result<()> {
        if self
            .store
            .find_event_by_ref(&event.external_ref)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let hints = &event.hints;
        let (Some(sport), Some(home), Some(away), Some(start)) = (
            &hints.sport,
            &hints.home_team,
            &hints.away_team,
            hints.start_time,
        ) else {
            debug!(external_ref = %event.external_ref, title = %event.title, "Event lacks teams or time");
            summary.events_skipped += 1;
            return Ok(());
        };

        let mut new_event =
            NewSportsEvent::new(sport.clone(), home.clone(), away.clone(), start, EventSource::Ingested)
                .with_external_ref(event.external_ref.clone());
        if let Some(league) = &hints.league {
            new_event = new_event.with_league(league.clone());
        }

        let (stored, inserted) = self
            .store
            .create_event(new_event, self.duplicate_tolerance)
            .await?;
        if inserted {
            summary.events_created += 1;
            debug!(event_id = %stored.id, name = %stored.canonical_name, "Event ingested");
        }
        Ok(())
    }

    async fn record_market(
        &self,
        venue: &VenueId,
        market: VenueMarket,
        summary: &mut IngestSummary,
    ) -> Result<()> {
        let mut hints = market.hints.clone();
        hints.merge(parse_question(&market.question, market.hints.sport.as_deref()));

        if let Some(sport) = &hints.sport {
            if !KNOWN_SPORTS.contains(&sport.as_str()) {
                summary.markets_skipped += 1;
                return Ok(());
            }
        }

        let market_type = market
            .market_type
            .unwrap_or_else(|| MarketType::infer_from_text(&market.question));
        let outcomes = OutcomeLabel::resolve(&market.outcome_names, market_type, &hints);

        let stored = self
            .store
            .upsert_market(NewMarket {
                venue_id: venue.clone(),
                venue_market_key: market.venue_market_key,
                market_type,
                question: market.question,
                status: MarketStatus::from_venue(&market.status),
                hints,
                outcomes,
                expires_at: market.expires_at,
                event_ref: market.event_ref,
            })
            .await?;
        summary.markets_upserted += 1;

        if stored.is_mapped() {
            return Ok(());
        }
        let Some(event_ref) = stored.event_ref.as_deref() else {
            return Ok(());
        };
        if let Some(event) = self.store.find_event_by_ref(event_ref).await? {
            if event.status.is_active() {
                self.store.link_market(stored.id, event.id).await?;
                summary.markets_linked += 1;
                debug!(market_id = %stored.id, event_id = %event.id, "Market linked by venue event");
            }
        }
        Ok(())
    }

    async fn record_quote(
        &self,
        venue: &VenueId,
        fees: &FeeModel,
        quote: VenueQuote,
        summary: &mut IngestSummary,
    ) -> Result<()> {
        let Some(market) = self
            .store
            .find_market(venue, &quote.venue_market_key)
            .await?
        else {
            summary.unknown_market += 1;
            return Ok(());
        };
        let Some(label) = market.outcome_at(quote.outcome_index) else {
            summary.unknown_outcome += 1;
            return Ok(());
        };

        let price = match normalize_with_fees(quote.raw_price, quote.price_format, fees) {
            Ok(price) => price,
            Err(e) => {
                debug!(
                    venue = %venue,
                    market = %quote.venue_market_key,
                    raw = %quote.raw_price,
                    error = %e,
                    "Quote price rejected"
                );
                summary.invalid_price += 1;
                return Ok(());
            }
        };

        self.store
            .insert_quote(NewQuote {
                market_id: market.id,
                venue_id: venue.clone(),
                outcome_label: label,
                observed_at: quote.observed_at,
                raw_price: quote.raw_price,
                price_format: quote.price_format,
                price,
            })
            .await?;
        summary.quotes_recorded += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::domain::{ParsedHints, PriceFormat};
    use crate::error::{Error, ErrorKind};
    use crate::port::outbound::store::{MarketFilter, MarketStore, QuoteFilter, QuoteStore};
    use crate::testkit::domain::tip_off;
    use crate::testkit::venue::StaticFeed;
    use rust_decimal_macros::dec;

    fn moneyline(key: &str, question: &str) -> VenueMarket {
        VenueMarket {
            venue_market_key: key.into(),
            question: question.into(),
            market_type: Some(MarketType::Moneyline),
            status: "active".into(),
            hints: ParsedHints::default(),
            outcome_names: vec!["Suns".into(), "Thunder".into()],
            expires_at: None,
            event_ref: None,
        }
    }

    fn venue_quote(key: &str, index: usize, price: rust_decimal::Decimal) -> VenueQuote {
        VenueQuote {
            venue_market_key: key.into(),
            outcome_index: index,
            raw_price: price,
            price_format: PriceFormat::Probability,
            observed_at: tip_off(),
        }
    }

    #[tokio::test]
    async fn markets_are_parsed_and_labelled() {
        let store = Arc::new(MemoryStore::new());
        let mut soccer = moneyline("m2", "Arsenal vs Chelsea");
        soccer.hints.sport = Some("EPL".into());
        let feed = StaticFeed::new("polymarket").with_markets(vec![
            moneyline("m1", "NBA: Phoenix Suns @ Oklahoma City Thunder"),
            soccer,
        ]);
        let svc = IngestionService::new(store.clone(), Duration::hours(1))
            .with_feed(Arc::new(feed), FeeModel::None);

        let summary = svc.ingest_markets(&VenueId::new("polymarket")).await.unwrap();
        assert_eq!(summary.markets_upserted, 1);
        assert_eq!(summary.markets_skipped, 1);

        let markets = store.list_markets(&MarketFilter::default()).await.unwrap();
        assert_eq!(markets[0].hints.home_team.as_deref(), Some("Oklahoma City Thunder"));
        assert_eq!(
            markets[0].outcomes,
            vec![OutcomeLabel::AwayWin, OutcomeLabel::HomeWin]
        );
    }

    #[tokio::test]
    async fn quotes_are_normalized_and_bad_ones_counted() {
        let store = Arc::new(MemoryStore::new());
        let feed = StaticFeed::new("polymarket")
            .with_markets(vec![moneyline("m1", "NBA: Phoenix Suns @ Oklahoma City Thunder")])
            .with_quotes(vec![
                venue_quote("m1", 0, dec!(0.40)),
                venue_quote("m1", 1, dec!(1.0)),
                venue_quote("m1", 5, dec!(0.5)),
                venue_quote("missing", 0, dec!(0.5)),
            ]);
        let svc = IngestionService::new(store.clone(), Duration::hours(1))
            .with_feed(Arc::new(feed), FeeModel::None);

        let summary = svc
            .ingest_venue(&VenueId::new("polymarket"), true)
            .await
            .unwrap();
        assert_eq!(summary.quotes_recorded, 1);
        assert_eq!(summary.invalid_price, 1);
        assert_eq!(summary.unknown_outcome, 1);
        assert_eq!(summary.unknown_market, 1);

        let quotes = store.list_quotes(&QuoteFilter::default()).await.unwrap();
        assert_eq!(quotes[0].outcome_label, OutcomeLabel::AwayWin);
        assert_eq!(quotes[0].price.share_price, dec!(0.40));
    }

    #[tokio::test]
    async fn unknown_venue_is_reported() {
        let svc = IngestionService::new(Arc::new(MemoryStore::new()), Duration::hours(1));
        let err = svc.ingest_markets(&VenueId::new("betfair")).await.unwrap_err();
        assert!(matches!(err, Error::Ingest(IngestError::UnknownVenue { .. })));
        assert_eq!(err.kind(), ErrorKind::UnknownVenue);
    }

    #[tokio::test]
    async fn failing_venue_does_not_block_others() {
        let store = Arc::new(MemoryStore::new());
        let good = StaticFeed::new("polymarket")
            .with_markets(vec![moneyline("m1", "NBA: Phoenix Suns @ Oklahoma City Thunder")]);
        let bad = StaticFeed::new("kalshi").failing();
        let svc = IngestionService::new(store, Duration::hours(1))
            .with_feed(Arc::new(good), FeeModel::None)
            .with_feed(Arc::new(bad), FeeModel::None);

        let reports = svc.ingest_all(false).await;
        assert_eq!(reports.len(), 2);
        let kalshi = reports.iter().find(|r| r.venue_id.as_str() == "kalshi").unwrap();
        assert!(kalshi.error.is_some());
        let poly = reports
            .iter()
            .find(|r| r.venue_id.as_str() == "polymarket")
            .unwrap();
        assert_eq!(poly.summary.unwrap().markets_upserted, 1);
    }

    #[tokio::test]
    async fn venue_events_link_markets() {
        let store = Arc::new(MemoryStore::new());
        let event = VenueEvent {
            external_ref: "KXNBAGAME-25DEC10PHXOKC".into(),
            title: "Phoenix at Oklahoma City".into(),
            hints: ParsedHints {
                sport: Some("NBA".into()),
                league: Some("NBA".into()),
                home_team: Some("OKC".into()),
                away_team: Some("PHX".into()),
                start_time: Some(tip_off()),
            },
        };
        let mut market = moneyline("KXNBAGAME-25DEC10PHXOKC-OKC", "Phoenix at Oklahoma City Winner?");
        market.hints = event.hints.clone();
        market.outcome_names = vec!["OKC".into(), "PHX".into()];
        market.event_ref = Some(event.external_ref.clone());

        let feed = StaticFeed::new("kalshi")
            .with_events(vec![event])
            .with_markets(vec![market]);
        let svc = IngestionService::new(store.clone(), Duration::hours(1))
            .with_feed(Arc::new(feed), FeeModel::None);

        let summary = svc.ingest_markets(&VenueId::new("kalshi")).await.unwrap();
        assert_eq!(summary.events_created, 1);
        assert_eq!(summary.markets_linked, 1);

        let again = svc.ingest_markets(&VenueId::new("kalshi")).await.unwrap();
        assert_eq!(again.events_created, 0);
        assert_eq!(again.markets_linked, 0);
    }
}
