//! In-memory store.
//!
//! All entities live behind one lock so that multi-entity operations
//! (accepting a candidate, superseding an opportunity) are atomic.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::domain::{
    CandidateId, CandidateStatus, DomainError, EventStatus, GroupKey, MappingCandidate, Market,
    MarketId, NewMappingCandidate, NewMarket, NewOpportunity, NewQuote, NewSportsEvent,
    Opportunity, OpportunityId, OpportunityStatus, Quote, QuoteId, SportsEvent, SportsEventId,
    VenueId,
};
use crate::error::Result;
use crate::port::outbound::store::{
    CandidateFilter, CandidateStore, EventFilter, EventStore, MarketFilter, MarketStore,
    OpportunityFilter, OpportunityStore, QuoteFilter, QuoteStore, UpsertOutcome,
};

#[derive(Debug, Default)]
struct State {
    last_id: i64,
    events: BTreeMap<SportsEventId, SportsEvent>,
    markets: BTreeMap<MarketId, Market>,
    candidates: BTreeMap<CandidateId, MappingCandidate>,
    quotes: BTreeMap<QuoteId, Quote>,
    opportunities: BTreeMap<OpportunityId, Opportunity>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn market_ids_for_event(&self, event: SportsEventId) -> HashSet<MarketId> {
        self.markets
            .values()
            .filter(|m| m.sports_event_id == Some(event))
            .map(|m| m.id)
            .collect()
    }

    fn active_for(&self, key: &GroupKey) -> Result<Option<OpportunityId>> {
        let active: Vec<OpportunityId> = self
            .opportunities
            .values()
            .filter(|o| o.status == OpportunityStatus::Active && o.key() == *key)
            .map(|o| o.id)
            .collect();
        match active.as_slice() {
            [] => Ok(None),
            [id] => Ok(Some(*id)),
            _ => Err(DomainError::ConflictingActiveOpportunity {
                group: key.to_string(),
            }
            .into()),
        }
    }
}

/// Store backed by process memory. Used by tests and `database.backend =
/// "memory"`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create_event(
        &self,
        event: NewSportsEvent,
        tolerance: Duration,
    ) -> Result<(SportsEvent, bool)> {
        let mut state = self.state.write();
        if let Some(existing) = state
            .events
            .values()
            .find(|e| e.is_duplicate_of(&event, tolerance))
        {
            return Ok((existing.clone(), false));
        }
        let id = SportsEventId::new(state.next_id());
        let stored = event.into_event(id);
        state.events.insert(id, stored.clone());
        Ok((stored, true))
    }

    async fn get_event(&self, id: SportsEventId) -> Result<Option<SportsEvent>> {
        Ok(self.state.read().events.get(&id).cloned())
    }

    async fn find_event_by_ref(&self, external_ref: &str) -> Result<Option<SportsEvent>> {
        Ok(self
            .state
            .read()
            .events
            .values()
            .find(|e| e.external_ref.as_deref() == Some(external_ref))
            .cloned())
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<SportsEvent>> {
        let mut events: Vec<SportsEvent> = self
            .state
            .read()
            .events
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.start_time, e.id));
        Ok(events)
    }

    async fn update_event_status(
        &self,
        id: SportsEventId,
        status: EventStatus,
    ) -> Result<SportsEvent> {
        let mut state = self.state.write();
        let event = state
            .events
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("sports event", id))?;
        event.transition(status)?;
        Ok(event.clone())
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn upsert_market(&self, market: NewMarket) -> Result<Market> {
        let mut state = self.state.write();
        let existing = state
            .markets
            .values()
            .find(|m| m.venue_id == market.venue_id && m.venue_market_key == market.venue_market_key)
            .map(|m| (m.id, m.sports_event_id, m.sides_swapped));
        let (id, link, sides_swapped) = match existing {
            Some(found) => found,
            None => (MarketId::new(state.next_id()), None, false),
        };
        let mut stored = market.into_market(id, link, Utc::now());
        stored.sides_swapped = sides_swapped;
        state.markets.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_market(&self, id: MarketId) -> Result<Option<Market>> {
        Ok(self.state.read().markets.get(&id).cloned())
    }

    async fn find_market(
        &self,
        venue_id: &VenueId,
        venue_market_key: &str,
    ) -> Result<Option<Market>> {
        Ok(self
            .state
            .read()
            .markets
            .values()
            .find(|m| &m.venue_id == venue_id && m.venue_market_key == venue_market_key)
            .cloned())
    }

    async fn list_markets(&self, filter: &MarketFilter) -> Result<Vec<Market>> {
        let state = self.state.read();
        let sport_matches = |m: &Market, sport: &str| {
            m.hints
                .sport
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(sport))
                || m.sports_event_id
                    .and_then(|id| state.events.get(&id))
                    .is_some_and(|e| e.sport.eq_ignore_ascii_case(sport))
        };
        Ok(state
            .markets
            .values()
            .filter(|m| filter.venue_id.as_ref().map_or(true, |v| &m.venue_id == v))
            .filter(|m| {
                filter
                    .sports_event_id
                    .map_or(true, |id| m.sports_event_id == Some(id))
            })
            .filter(|m| !filter.unmapped_only || !m.is_mapped())
            .filter(|m| {
                filter
                    .sport
                    .as_deref()
                    .map_or(true, |s| sport_matches(m, s))
            })
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn link_market(&self, id: MarketId, sports_event_id: SportsEventId) -> Result<Market> {
        let mut state = self.state.write();
        if !state.events.contains_key(&sports_event_id) {
            return Err(DomainError::not_found("sports event", sports_event_id).into());
        }
        let market = state
            .markets
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("market", id))?;
        match market.sports_event_id {
            Some(existing) if existing != sports_event_id => Err(DomainError::AlreadyResolved {
                market_id: id.value(),
                sports_event_id: existing.value(),
            }
            .into()),
            _ => {
                market.sports_event_id = Some(sports_event_id);
                Ok(market.clone())
            }
        }
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn insert_candidate(
        &self,
        candidate: NewMappingCandidate,
    ) -> Result<Option<MappingCandidate>> {
        let mut state = self.state.write();
        if !state.markets.contains_key(&candidate.market_id) {
            return Err(DomainError::not_found("market", candidate.market_id).into());
        }
        if !state.events.contains_key(&candidate.sports_event_id) {
            return Err(DomainError::not_found("sports event", candidate.sports_event_id).into());
        }
        let exists = state.candidates.values().any(|c| {
            c.market_id == candidate.market_id && c.sports_event_id == candidate.sports_event_id
        });
        if exists {
            return Ok(None);
        }
        let id = CandidateId::new(state.next_id());
        let stored = candidate.into_candidate(id, Utc::now());
        state.candidates.insert(id, stored.clone());
        Ok(Some(stored))
    }

    async fn get_candidate(&self, id: CandidateId) -> Result<Option<MappingCandidate>> {
        Ok(self.state.read().candidates.get(&id).cloned())
    }

    async fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<MappingCandidate>> {
        let mut candidates: Vec<MappingCandidate> = self
            .state
            .read()
            .candidates
            .values()
            .filter(|c| filter.status.map_or(true, |s| c.status == s))
            .filter(|c| filter.market_id.map_or(true, |m| c.market_id == m))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        candidates.truncate(filter.limit.unwrap_or(usize::MAX));
        Ok(candidates)
    }

    async fn accept_candidate(
        &self,
        id: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<(MappingCandidate, Market)> {
        let mut state = self.state.write();
        let mut candidate = state
            .candidates
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("mapping candidate", id))?;
        let mut market = state
            .markets
            .get(&candidate.market_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("market", candidate.market_id))?;

        candidate.review(CandidateStatus::Accepted, now)?;
        candidate.check_market_link(market.sports_event_id)?;

        if !market.is_mapped() {
            market.sides_swapped = candidate.features.teams_swapped();
        }
        market.sports_event_id = Some(candidate.sports_event_id);

        state.candidates.insert(id, candidate.clone());
        state.markets.insert(market.id, market.clone());
        Ok((candidate, market))
    }

    async fn reject_candidate(
        &self,
        id: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<MappingCandidate> {
        let mut state = self.state.write();
        let candidate = state
            .candidates
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("mapping candidate", id))?;
        candidate.review(CandidateStatus::Rejected, now)?;
        Ok(candidate.clone())
    }
}

#[async_trait]
impl QuoteStore for MemoryStore {
    async fn insert_quote(&self, quote: NewQuote) -> Result<Quote> {
        let mut state = self.state.write();
        if !state.markets.contains_key(&quote.market_id) {
            return Err(DomainError::not_found("market", quote.market_id).into());
        }
        let id = QuoteId::new(state.next_id());
        let stored = quote.into_quote(id);
        state.quotes.insert(id, stored.clone());
        Ok(stored)
    }

    async fn quotes_for_event(&self, sports_event_id: SportsEventId) -> Result<Vec<Quote>> {
        let state = self.state.read();
        let markets = state.market_ids_for_event(sports_event_id);
        Ok(state
            .quotes
            .values()
            .filter(|q| markets.contains(&q.market_id))
            .cloned()
            .collect())
    }

    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>> {
        let state = self.state.read();
        let markets = filter
            .sports_event_id
            .map(|id| state.market_ids_for_event(id));
        let mut quotes: Vec<Quote> = state
            .quotes
            .values()
            .filter(|q| markets.as_ref().map_or(true, |m| m.contains(&q.market_id)))
            .filter(|q| filter.market_id.map_or(true, |m| q.market_id == m))
            .cloned()
            .collect();
        quotes.sort_by(|a, b| (b.observed_at, b.id).cmp(&(a.observed_at, a.id)));
        quotes.truncate(filter.limit.unwrap_or(usize::MAX));
        Ok(quotes)
    }
}

#[async_trait]
impl OpportunityStore for MemoryStore {
    async fn upsert_opportunity(&self, opportunity: NewOpportunity) -> Result<UpsertOutcome> {
        let mut state = self.state.write();
        let previous = state.active_for(&opportunity.key)?;

        if let Some(prev) = previous {
            if state
                .opportunities
                .get(&prev)
                .is_some_and(|o| o.fingerprint == opportunity.fingerprint)
            {
                return Ok(UpsertOutcome::Unchanged(prev));
            }
            if let Some(old) = state.opportunities.get_mut(&prev) {
                old.status = OpportunityStatus::Stale;
            }
        }

        let id = OpportunityId::new(state.next_id());
        state
            .opportunities
            .insert(id, opportunity.into_opportunity(id));
        Ok(match previous {
            Some(previous) => UpsertOutcome::Superseded { id, previous },
            None => UpsertOutcome::Created(id),
        })
    }

    async fn get_opportunity(&self, id: OpportunityId) -> Result<Option<Opportunity>> {
        Ok(self.state.read().opportunities.get(&id).cloned())
    }

    async fn list_opportunities(&self, filter: &OpportunityFilter) -> Result<Vec<Opportunity>> {
        let mut opportunities: Vec<Opportunity> = self
            .state
            .read()
            .opportunities
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        opportunities.sort_by(|a, b| (b.detected_at, b.id).cmp(&(a.detected_at, a.id)));
        opportunities.truncate(filter.limit.unwrap_or(usize::MAX));
        Ok(opportunities)
    }

    async fn close_opportunity(&self, id: OpportunityId) -> Result<Opportunity> {
        let mut state = self.state.write();
        let opportunity = state
            .opportunities
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("opportunity", id))?;
        opportunity.status = OpportunityStatus::Closed;
        Ok(opportunity.clone())
    }

    async fn expire_group(&self, key: &GroupKey) -> Result<Option<OpportunityId>> {
        let mut state = self.state.write();
        let Some(id) = state.active_for(key)? else {
            return Ok(None);
        };
        if let Some(opportunity) = state.opportunities.get_mut(&id) {
            opportunity.status = OpportunityStatus::Stale;
        }
        Ok(Some(id))
    }

    async fn close_for_event(&self, sports_event_id: SportsEventId) -> Result<usize> {
        let mut state = self.state.write();
        let mut closed = 0;
        for opportunity in state
            .opportunities
            .values_mut()
            .filter(|o| o.sports_event_id == sports_event_id && o.status != OpportunityStatus::Closed)
        {
            opportunity.status = OpportunityStatus::Closed;
            closed += 1;
        }
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{FeatureSet, MatchFeature, OutcomeLabel};
    use crate::error::ErrorKind;
    use crate::testkit::domain::{event_at, market_with_hints, opportunity_for, seed_quote, tip_off};

    async fn seeded() -> (MemoryStore, SportsEvent, Market) {
        let store = MemoryStore::new();
        let (event, _) = store
            .create_event(event_at("NBA", "Thunder", "Suns", tip_off()), Duration::hours(1))
            .await
            .unwrap();
        let market = store
            .upsert_market(market_with_hints("polymarket", "m1", "NBA", "Thunder", "Suns"))
            .await
            .unwrap();
        (store, event, market)
    }

    fn candidate(market: &Market, event: &SportsEvent) -> NewMappingCandidate {
        NewMappingCandidate {
            market_id: market.id,
            sports_event_id: event.id,
            confidence: 0.9,
            features: FeatureSet::new(vec![MatchFeature::SportMatch]),
        }
    }

    #[tokio::test]
    async fn upsert_market_keeps_existing_link() {
        let (store, event, market) = seeded().await;
        store.link_market(market.id, event.id).await.unwrap();

        let again = store
            .upsert_market(market_with_hints("polymarket", "m1", "NBA", "Thunder", "Suns"))
            .await
            .unwrap();
        assert_eq!(again.id, market.id);
        assert_eq!(again.sports_event_id, Some(event.id));
    }

    #[tokio::test]
    async fn duplicate_candidate_pair_is_suppressed() {
        let (store, event, market) = seeded().await;
        let first = store.insert_candidate(candidate(&market, &event)).await.unwrap();
        assert!(first.is_some());
        let second = store.insert_candidate(candidate(&market, &event)).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn accept_onto_other_event_is_already_resolved() {
        let (store, event, market) = seeded().await;
        let (other, _) = store
            .create_event(
                event_at("NBA", "Lakers", "Celtics", tip_off()),
                Duration::hours(1),
            )
            .await
            .unwrap();
        let a = store
            .insert_candidate(candidate(&market, &event))
            .await
            .unwrap()
            .unwrap();
        let b = store
            .insert_candidate(candidate(&market, &other))
            .await
            .unwrap()
            .unwrap();

        store.accept_candidate(a.id, Utc::now()).await.unwrap();
        let err = store.accept_candidate(b.id, Utc::now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyResolved);

        let b = store.get_candidate(b.id).await.unwrap().unwrap();
        assert_eq!(b.status, CandidateStatus::Pending);
    }

    #[tokio::test]
    async fn swapped_candidate_marks_market_and_keeps_quotes() {
        let (store, event, market) = seeded().await;
        let store = Arc::new(store);
        let quote = seed_quote(&store, &market, OutcomeLabel::HomeWin, dec!(0.6)).await;
        let c = store
            .insert_candidate(NewMappingCandidate {
                features: FeatureSet::new(vec![
                    MatchFeature::SportMatch,
                    MatchFeature::TeamSimilarity {
                        score: 1.0,
                        swapped: true,
                    },
                ]),
                ..candidate(&market, &event)
            })
            .await
            .unwrap()
            .unwrap();

        let (_, linked) = store.accept_candidate(c.id, Utc::now()).await.unwrap();
        assert!(linked.sides_swapped);
        assert_eq!(linked.hints.home_team.as_deref(), Some("Thunder"));
        assert_eq!(linked.outcomes, market.outcomes);
        assert_eq!(
            linked.event_outcomes(),
            vec![OutcomeLabel::AwayWin, OutcomeLabel::HomeWin]
        );

        let quotes = store.quotes_for_event(event.id).await.unwrap();
        assert_eq!(quotes, vec![quote]);

        // A later refresh from the venue keeps the orientation.
        let refreshed = store
            .upsert_market(market_with_hints("polymarket", "m1", "NBA", "Thunder", "Suns"))
            .await
            .unwrap();
        assert!(refreshed.sides_swapped);
    }

    #[tokio::test]
    async fn identical_fingerprint_is_unchanged() {
        let (store, event, _) = seeded().await;
        let first = store
            .upsert_opportunity(opportunity_for(event.id, 1))
            .await
            .unwrap();
        let second = store
            .upsert_opportunity(opportunity_for(event.id, 1))
            .await
            .unwrap();
        assert_eq!(second, UpsertOutcome::Unchanged(first.id()));

        let third = store
            .upsert_opportunity(opportunity_for(event.id, 2))
            .await
            .unwrap();
        assert_eq!(
            third,
            UpsertOutcome::Superseded {
                id: third.id(),
                previous: first.id()
            }
        );
        let old = store.get_opportunity(first.id()).await.unwrap().unwrap();
        assert_eq!(old.status, OpportunityStatus::Stale);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_terminal() {
        let (store, event, _) = seeded().await;
        let id = store
            .upsert_opportunity(opportunity_for(event.id, 1))
            .await
            .unwrap()
            .id();
        store.close_opportunity(id).await.unwrap();
        let again = store.close_opportunity(id).await.unwrap();
        assert_eq!(again.status, OpportunityStatus::Closed);

        assert_eq!(store.expire_group(&again.key()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn status_transition_is_monotonic() {
        let (store, event, _) = seeded().await;
        store
            .update_event_status(event.id, EventStatus::Cancelled)
            .await
            .unwrap();
        let err = store
            .update_event_status(event.id, EventStatus::Live)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);
    }
}
