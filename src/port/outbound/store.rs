//! Persistence ports.
//!
//! Each entity has its own trait; [`Store`] bundles them for adapters that
//! keep everything in one place. Operations that must be atomic with respect
//! to each other (candidate acceptance with the market link, opportunity
//! supersession) are single trait methods so the adapter can hold one lock
//! or one transaction across them.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    CandidateId, CandidateStatus, EventStatus, GroupKey, MappingCandidate, Market, MarketId,
    NewMappingCandidate, NewMarket, NewOpportunity, NewQuote, NewSportsEvent, Opportunity,
    OpportunityId, OpportunityStatus, Quote, SportsEvent, SportsEventId, VenueId,
};
use crate::error::Result;

/// Criteria for listing sports events. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub sport: Option<String>,
    pub active_only: bool,
    /// Only events starting within `[from, to]`.
    pub starts_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl EventFilter {
    /// In-memory form of the filter, shared by adapters that scan rows.
    #[must_use]
    pub fn matches(&self, event: &SportsEvent) -> bool {
        self.sport
            .as_deref()
            .map_or(true, |s| event.sport.eq_ignore_ascii_case(s))
            && (!self.active_only || event.status.is_active())
            && self
                .starts_between
                .map_or(true, |(from, to)| event.start_time >= from && event.start_time <= to)
    }
}

/// Criteria for listing markets.
#[derive(Debug, Clone, Default)]
pub struct MarketFilter {
    /// Parsed sport hint, or the sport of the linked event.
    pub sport: Option<String>,
    pub venue_id: Option<VenueId>,
    pub sports_event_id: Option<SportsEventId>,
    pub unmapped_only: bool,
    pub limit: Option<usize>,
}

/// Criteria for listing mapping candidates.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub status: Option<CandidateStatus>,
    pub market_id: Option<MarketId>,
    pub limit: Option<usize>,
}

/// Criteria for listing quotes. The event filter follows market links.
#[derive(Debug, Clone, Default)]
pub struct QuoteFilter {
    pub sports_event_id: Option<SportsEventId>,
    pub market_id: Option<MarketId>,
    pub limit: Option<usize>,
}

/// Criteria for listing opportunities.
#[derive(Debug, Clone, Default)]
pub struct OpportunityFilter {
    /// Minimum worst-case ROI, as a fraction.
    pub min_roi: Option<Decimal>,
    pub status: Option<OpportunityStatus>,
    pub sports_event_id: Option<SportsEventId>,
    pub limit: Option<usize>,
}

impl OpportunityFilter {
    #[must_use]
    pub fn matches(&self, opp: &Opportunity) -> bool {
        self.min_roi.map_or(true, |min| opp.worst_case_roi >= min)
            && self.status.map_or(true, |s| opp.status == s)
            && self
                .sports_event_id
                .map_or(true, |id| opp.sports_event_id == id)
    }
}

/// Result of offering a detection to the opportunity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No active opportunity existed for the group.
    Created(OpportunityId),
    /// The active opportunity already reflects this quote set.
    Unchanged(OpportunityId),
    /// A new opportunity replaced the previous active one, now stale.
    Superseded {
        id: OpportunityId,
        previous: OpportunityId,
    },
}

impl UpsertOutcome {
    /// The opportunity that is active for the group afterwards.
    #[must_use]
    pub fn id(&self) -> OpportunityId {
        match *self {
            Self::Created(id) | Self::Unchanged(id) | Self::Superseded { id, .. } => id,
        }
    }
}

/// Canonical sports events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Create an event, or return the active duplicate within `tolerance`.
    /// The flag is true when a new row was inserted.
    async fn create_event(
        &self,
        event: NewSportsEvent,
        tolerance: Duration,
    ) -> Result<(SportsEvent, bool)>;

    async fn get_event(&self, id: SportsEventId) -> Result<Option<SportsEvent>>;

    /// Event created from a venue listing with this external reference.
    async fn find_event_by_ref(&self, external_ref: &str) -> Result<Option<SportsEvent>>;

    /// Ordered by start time, then id.
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<SportsEvent>>;

    /// Apply a monotonic status transition.
    ///
    /// # Errors
    /// `NotFound` for an unknown id, `InvalidStatusTransition` for a
    /// backward move.
    async fn update_event_status(
        &self,
        id: SportsEventId,
        status: EventStatus,
    ) -> Result<SportsEvent>;
}

/// Venue markets and their event links.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Insert or refresh by (venue, venue key). An existing event link and
    /// its side orientation are kept.
    async fn upsert_market(&self, market: NewMarket) -> Result<Market>;

    async fn get_market(&self, id: MarketId) -> Result<Option<Market>>;

    async fn find_market(&self, venue_id: &VenueId, venue_market_key: &str)
        -> Result<Option<Market>>;

    /// Ordered by id.
    async fn list_markets(&self, filter: &MarketFilter) -> Result<Vec<Market>>;

    /// Link an unmapped market to an event outside the review workflow.
    ///
    /// # Errors
    /// `AlreadyResolved` if the market is linked to a different event.
    async fn link_market(&self, id: MarketId, sports_event_id: SportsEventId) -> Result<Market>;
}

/// Proposed market to event mappings and their review state.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Record a candidate. Returns `None` if one already exists for the same
    /// (market, event) pair in any status.
    async fn insert_candidate(
        &self,
        candidate: NewMappingCandidate,
    ) -> Result<Option<MappingCandidate>>;

    async fn get_candidate(&self, id: CandidateId) -> Result<Option<MappingCandidate>>;

    /// Newest first.
    async fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<MappingCandidate>>;

    /// Accept a pending candidate and link its market, atomically. A
    /// candidate whose team order is reversed marks the market as
    /// side-swapped; stored outcomes and quotes are left as the venue sent
    /// them.
    ///
    /// # Errors
    /// `NotFound`, `InvalidState` when the candidate is not pending, or
    /// `AlreadyResolved` when the market is linked elsewhere.
    async fn accept_candidate(
        &self,
        id: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<(MappingCandidate, Market)>;

    async fn reject_candidate(&self, id: CandidateId, now: DateTime<Utc>)
        -> Result<MappingCandidate>;
}

/// Append-only quote history.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Quotes carry the venue's outcome label, never an event-oriented one.
    async fn insert_quote(&self, quote: NewQuote) -> Result<Quote>;

    /// Every quote for markets linked to the event.
    async fn quotes_for_event(&self, sports_event_id: SportsEventId) -> Result<Vec<Quote>>;

    /// Newest first.
    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>>;
}

/// Detected opportunities, at most one active per [`GroupKey`].
#[async_trait]
pub trait OpportunityStore: Send + Sync {
    /// Insert a detection, superseding the group's active opportunity in the
    /// same transaction. Identical fingerprints are a no-op.
    async fn upsert_opportunity(&self, opportunity: NewOpportunity) -> Result<UpsertOutcome>;

    async fn get_opportunity(&self, id: OpportunityId) -> Result<Option<Opportunity>>;

    /// Newest first.
    async fn list_opportunities(&self, filter: &OpportunityFilter) -> Result<Vec<Opportunity>>;

    /// Close an opportunity. Closing a closed opportunity is a no-op.
    async fn close_opportunity(&self, id: OpportunityId) -> Result<Opportunity>;

    /// Mark the group's active opportunity stale, if any.
    async fn expire_group(&self, key: &GroupKey) -> Result<Option<OpportunityId>>;

    /// Close every non-closed opportunity of an event. Returns the count.
    async fn close_for_event(&self, sports_event_id: SportsEventId) -> Result<usize>;
}

/// Everything the engine persists.
pub trait Store: EventStore + MarketStore + CandidateStore + QuoteStore + OpportunityStore {}

impl<T> Store for T where T: EventStore + MarketStore + CandidateStore + QuoteStore + OpportunityStore
{}

