//! Store wrapper that fails reads for chosen events.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::adapter::outbound::memory::MemoryStore;
use crate::domain::{
    CandidateId, EventStatus, GroupKey, MappingCandidate, Market, MarketId, NewMappingCandidate,
    NewMarket, NewOpportunity, NewQuote, NewSportsEvent, Opportunity, OpportunityId, Quote,
    SportsEvent, SportsEventId, VenueId,
};
use crate::error::{Error, Result};
use crate::port::outbound::store::{
    CandidateFilter, CandidateStore, EventFilter, EventStore, MarketFilter, MarketStore,
    OpportunityFilter, OpportunityStore, QuoteFilter, QuoteStore, UpsertOutcome,
};

/// A [`MemoryStore`] whose `quotes_for_event` returns a database error for
/// events passed to [`FaultyStore::break_event`].
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    broken: Mutex<HashSet<SportsEventId>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn break_event(&self, id: SportsEventId) {
        self.broken.lock().insert(id);
    }
}

#[async_trait]
impl EventStore for FaultyStore {
    async fn create_event(
        &self,
        event: NewSportsEvent,
        tolerance: Duration,
    ) -> Result<(SportsEvent, bool)> {
        self.inner.create_event(event, tolerance).await
    }

    async fn get_event(&self, id: SportsEventId) -> Result<Option<SportsEvent>> {
        self.inner.get_event(id).await
    }

    async fn find_event_by_ref(&self, external_ref: &str) -> Result<Option<SportsEvent>> {
        self.inner.find_event_by_ref(external_ref).await
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<SportsEvent>> {
        self.inner.list_events(filter).await
    }

    async fn update_event_status(
        &self,
        id: SportsEventId,
        status: EventStatus,
    ) -> Result<SportsEvent> {
        self.inner.update_event_status(id, status).await
    }
}

#[async_trait]
impl MarketStore for FaultyStore {
    async fn upsert_market(&self, market: NewMarket) -> Result<Market> {
        self.inner.upsert_market(market).await
    }

    async fn get_market(&self, id: MarketId) -> Result<Option<Market>> {
        self.inner.get_market(id).await
    }

    async fn find_market(
        &self,
        venue_id: &VenueId,
        venue_market_key: &str,
    ) -> Result<Option<Market>> {
        self.inner.find_market(venue_id, venue_market_key).await
    }

    async fn list_markets(&self, filter: &MarketFilter) -> Result<Vec<Market>> {
        self.inner.list_markets(filter).await
    }

    async fn link_market(&self, id: MarketId, sports_event_id: SportsEventId) -> Result<Market> {
        self.inner.link_market(id, sports_event_id).await
    }
}

#[async_trait]
impl CandidateStore for FaultyStore {
    async fn insert_candidate(
        &self,
        candidate: NewMappingCandidate,
    ) -> Result<Option<MappingCandidate>> {
        self.inner.insert_candidate(candidate).await
    }

    async fn get_candidate(&self, id: CandidateId) -> Result<Option<MappingCandidate>> {
        self.inner.get_candidate(id).await
    }

    async fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<MappingCandidate>> {
        self.inner.list_candidates(filter).await
    }

    async fn accept_candidate(
        &self,
        id: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<(MappingCandidate, Market)> {
        self.inner.accept_candidate(id, now).await
    }

    async fn reject_candidate(
        &self,
        id: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<MappingCandidate> {
        self.inner.reject_candidate(id, now).await
    }
}

#[async_trait]
impl QuoteStore for FaultyStore {
    async fn insert_quote(&self, quote: NewQuote) -> Result<Quote> {
        self.inner.insert_quote(quote).await
    }

    async fn quotes_for_event(&self, sports_event_id: SportsEventId) -> Result<Vec<Quote>> {
        if self.broken.lock().contains(&sports_event_id) {
            return Err(Error::Database(format!(
                "quotes for event {sports_event_id} unavailable"
            )));
        }
        self.inner.quotes_for_event(sports_event_id).await
    }

    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>> {
        self.inner.list_quotes(filter).await
    }
}

#[async_trait]
impl OpportunityStore for FaultyStore {
    async fn upsert_opportunity(&self, opportunity: NewOpportunity) -> Result<UpsertOutcome> {
        self.inner.upsert_opportunity(opportunity).await
    }

    async fn get_opportunity(&self, id: OpportunityId) -> Result<Option<Opportunity>> {
        self.inner.get_opportunity(id).await
    }

    async fn list_opportunities(&self, filter: &OpportunityFilter) -> Result<Vec<Opportunity>> {
        self.inner.list_opportunities(filter).await
    }

    async fn close_opportunity(&self, id: OpportunityId) -> Result<Opportunity> {
        self.inner.close_opportunity(id).await
    }

    async fn expire_group(&self, key: &GroupKey) -> Result<Option<OpportunityId>> {
        self.inner.expire_group(key).await
    }

    async fn close_for_event(&self, sports_event_id: SportsEventId) -> Result<usize> {
        self.inner.close_for_event(sports_event_id).await
    }
}
