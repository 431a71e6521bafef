//! Mapping candidate service.
//!
//! Suggests which sports event an unmapped venue market belongs to and runs
//! the review workflow over the resulting candidates.
//!
//! ```text
//! unmapped markets --> score_event() per same-sport event --> candidates (pending)
//!                                                                  |
//!                                               accept / reject <--+
//!                                                    |
//!                                                    v
//!                                       Market.sports_event_id set
//! ```

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::scoring::score_event;
use super::MatcherConfig;
use crate::domain::{
    CandidateId, EventSource, FeatureSet, MappingCandidate, Market, MatchFeature,
    NewMappingCandidate, NewSportsEvent, SportsEvent,
};
use crate::error::Result;
use crate::port::outbound::store::{EventFilter, MarketFilter, Store};

/// Counts from one suggestion batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SuggestSummary {
    pub markets_scanned: usize,
    pub candidates_created: usize,
    pub duplicates_skipped: usize,
    pub below_threshold: usize,
    pub unparseable: usize,
    pub events_created: usize,
    /// Markets left unexamined because the deadline passed.
    pub deadline_truncated: usize,
}

/// Proposes market to event mappings and applies review decisions.
///
/// Suggestion only writes `pending` candidates; a market is linked only by
/// [`MatcherService::accept`].
pub struct MatcherService {
    config: MatcherConfig,
    store: Arc<dyn Store>,
}

impl MatcherService {
    /// Create a matcher over `store`.
    pub fn new(config: MatcherConfig, store: Arc<dyn Store>) -> Self {
        Self { config, store }
    }

    #[must_use]
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Suggest candidates for unmapped markets.
    ///
    /// Examines at most `limit` markets (the configured batch size when
    /// `None`) and stops early once `deadline` has passed.
    ///
    /// # Errors
    /// Propagates store failures. Per-market parse problems are counted,
    /// not returned.
    pub async fn suggest(
        &self,
        limit: Option<usize>,
        deadline: Option<Instant>,
    ) -> Result<SuggestSummary> {
        let markets = self
            .store
            .list_markets(&MarketFilter {
                unmapped_only: true,
                limit: Some(limit.unwrap_or(self.config.batch_limit)),
                ..MarketFilter::default()
            })
            .await?;

        let mut summary = SuggestSummary::default();
        let total = markets.len();

        for (index, market) in markets.into_iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                summary.deadline_truncated = total - index;
                warn!(
                    remaining = summary.deadline_truncated,
                    "Suggestion deadline reached"
                );
                break;
            }
            summary.markets_scanned += 1;
            self.suggest_for_market(&market, &mut summary).await?;
        }

        info!(
            scanned = summary.markets_scanned,
            created = summary.candidates_created,
            duplicates = summary.duplicates_skipped,
            below_threshold = summary.below_threshold,
            unparseable = summary.unparseable,
            events_created = summary.events_created,
            truncated = summary.deadline_truncated,
            "Suggestion batch complete"
        );
        Ok(summary)
    }

    async fn suggest_for_market(
        &self,
        market: &Market,
        summary: &mut SuggestSummary,
    ) -> Result<()> {
        let Some(sport) = market.hints.sport.clone() else {
            debug!(market_id = %market.id, question = %market.question, "No sport in market text");
            summary.unparseable += 1;
            return Ok(());
        };

        let window = self.config.window();
        let events = self
            .store
            .list_events(&EventFilter {
                sport: Some(sport),
                active_only: true,
                starts_between: market.hints.start_time.map(|t| (t - window, t + window)),
            })
            .await?;

        if events.is_empty() {
            if self.config.auto_create_events {
                self.create_event_for(market, summary).await?;
            }
            return Ok(());
        }

        for event in &events {
            let Some(features) = score_event(&market.hints, event, &self.config) else {
                continue;
            };
            let confidence = features.confidence(&self.config.weights);
            if confidence < self.config.min_confidence {
                summary.below_threshold += 1;
                continue;
            }
            self.record(market, event, confidence, features, summary)
                .await?;
        }
        Ok(())
    }

    async fn create_event_for(&self, market: &Market, summary: &mut SuggestSummary) -> Result<()> {
        let hints = &market.hints;
        let (Some(sport), Some(home), Some(away)) = (&hints.sport, &hints.home_team, &hints.away_team)
        else {
            return Ok(());
        };
        let Some(start_time) = hints.start_time.or(market.expires_at) else {
            debug!(market_id = %market.id, "No start time for auto-created event");
            return Ok(());
        };

        let mut new_event =
            NewSportsEvent::new(sport.clone(), home.clone(), away.clone(), start_time, EventSource::Auto);
        if let Some(league) = &hints.league {
            new_event = new_event.with_league(league.clone());
        }

        let (event, inserted) = self
            .store
            .create_event(new_event, self.config.duplicate_tolerance())
            .await?;
        if inserted {
            summary.events_created += 1;
            info!(event_id = %event.id, name = %event.canonical_name, "Auto-created sports event");
        }

        let confidence = self.config.new_event_confidence;
        let features = FeatureSet::new(vec![MatchFeature::NewEvent { confidence }]);
        self.record(market, &event, confidence, features, summary)
            .await
    }

    async fn record(
        &self,
        market: &Market,
        event: &SportsEvent,
        confidence: f64,
        features: FeatureSet,
        summary: &mut SuggestSummary,
    ) -> Result<()> {
        let inserted = self
            .store
            .insert_candidate(NewMappingCandidate {
                market_id: market.id,
                sports_event_id: event.id,
                confidence,
                features,
            })
            .await?;
        match inserted {
            Some(candidate) => {
                summary.candidates_created += 1;
                debug!(
                    candidate_id = %candidate.id,
                    market_id = %market.id,
                    event_id = %event.id,
                    confidence,
                    "Candidate suggested"
                );
            }
            None => summary.duplicates_skipped += 1,
        }
        Ok(())
    }

    /// Accept a pending candidate and link its market to the event.
    ///
    /// # Errors
    /// `NotFound`, `InvalidState` when not pending, `AlreadyResolved` when the
    /// market is mapped to another event.
    pub async fn accept(&self, id: CandidateId) -> Result<(MappingCandidate, Market)> {
        let (candidate, market) = self.store.accept_candidate(id, Utc::now()).await?;
        info!(
            candidate_id = %candidate.id,
            market_id = %market.id,
            event_id = %candidate.sports_event_id,
            sides_swapped = market.sides_swapped,
            "Candidate accepted"
        );
        Ok((candidate, market))
    }

    /// Reject a pending candidate.
    ///
    /// # Errors
    /// `NotFound`, or `InvalidState` when not pending.
    pub async fn reject(&self, id: CandidateId) -> Result<MappingCandidate> {
        let candidate = self.store.reject_candidate(id, Utc::now()).await?;
        info!(candidate_id = %candidate.id, "Candidate rejected");
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::domain::CandidateStatus;
    use crate::error::ErrorKind;
    use crate::port::outbound::store::{CandidateFilter, CandidateStore, EventStore, MarketStore};
    use crate::testkit::domain::{event_at, market_with_hints, tip_off};

    fn service(config: MatcherConfig) -> (MatcherService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (MatcherService::new(config, store.clone()), store)
    }

    #[tokio::test]
    async fn suggests_same_sport_events() {
        let (svc, store) = service(MatcherConfig::default());
        store
            .create_event(event_at("NBA", "Thunder", "Suns", tip_off()), chrono::Duration::zero())
            .await
            .unwrap();
        store
            .create_event(event_at("NFL", "Chiefs", "Bills", tip_off()), chrono::Duration::zero())
            .await
            .unwrap();
        store
            .upsert_market(market_with_hints("polymarket", "m1", "NBA", "Thunder", "Suns"))
            .await
            .unwrap();

        let summary = svc.suggest(None, None).await.unwrap();
        assert_eq!(summary.markets_scanned, 1);
        assert_eq!(summary.candidates_created, 1);

        let again = svc.suggest(None, None).await.unwrap();
        assert_eq!(again.candidates_created, 0);
        assert_eq!(again.duplicates_skipped, 1);
    }

    #[tokio::test]
    async fn market_without_sport_is_unparseable() {
        let (svc, store) = service(MatcherConfig::default());
        let mut market = market_with_hints("polymarket", "m1", "NBA", "Thunder", "Suns");
        market.hints.sport = None;
        store.upsert_market(market).await.unwrap();

        let summary = svc.suggest(None, None).await.unwrap();
        assert_eq!(summary.unparseable, 1);
        assert_eq!(summary.candidates_created, 0);
    }

    #[tokio::test]
    async fn min_confidence_discards_weak_candidates() {
        let (svc, store) = service(MatcherConfig {
            min_confidence: 0.9,
            ..MatcherConfig::default()
        });
        store
            .create_event(event_at("NBA", "Lakers", "Celtics", tip_off()), chrono::Duration::zero())
            .await
            .unwrap();
        store
            .upsert_market(market_with_hints("polymarket", "m1", "NBA", "Thunder", "Suns"))
            .await
            .unwrap();

        let summary = svc.suggest(None, None).await.unwrap();
        assert_eq!(summary.below_threshold, 1);
        assert_eq!(summary.candidates_created, 0);
    }

    #[tokio::test]
    async fn expired_deadline_truncates_batch() {
        let (svc, store) = service(MatcherConfig::default());
        for key in ["m1", "m2", "m3"] {
            store
                .upsert_market(market_with_hints("polymarket", key, "NBA", "Thunder", "Suns"))
                .await
                .unwrap();
        }

        let summary = svc.suggest(None, Some(Instant::now())).await.unwrap();
        assert_eq!(summary.markets_scanned, 0);
        assert_eq!(summary.deadline_truncated, 3);
    }

    #[tokio::test]
    async fn auto_creates_event_when_none_match() {
        let (svc, store) = service(MatcherConfig {
            auto_create_events: true,
            ..MatcherConfig::default()
        });
        store
            .upsert_market(market_with_hints("polymarket", "m1", "NBA", "Thunder", "Suns"))
            .await
            .unwrap();

        let summary = svc.suggest(None, None).await.unwrap();
        assert_eq!(summary.events_created, 1);
        assert_eq!(summary.candidates_created, 1);

        let candidates = store.list_candidates(&CandidateFilter::default()).await.unwrap();
        assert_eq!(candidates[0].confidence, 0.7);
        let event = store
            .get_event(candidates[0].sports_event_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.source, EventSource::Auto);
    }

    #[tokio::test]
    async fn accept_links_market_and_reject_is_terminal() {
        let (svc, store) = service(MatcherConfig::default());
        store
            .create_event(event_at("NBA", "Thunder", "Suns", tip_off()), chrono::Duration::zero())
            .await
            .unwrap();
        let market = store
            .upsert_market(market_with_hints("polymarket", "m1", "NBA", "Thunder", "Suns"))
            .await
            .unwrap();
        svc.suggest(None, None).await.unwrap();

        let candidates = store.list_candidates(&CandidateFilter::default()).await.unwrap();
        let (accepted, linked) = svc.accept(candidates[0].id).await.unwrap();
        assert_eq!(accepted.status, CandidateStatus::Accepted);
        assert_eq!(linked.id, market.id);
        assert_eq!(linked.sports_event_id, Some(accepted.sports_event_id));

        let err = svc.reject(candidates[0].id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn accept_unknown_candidate_is_not_found() {
        let (svc, _) = service(MatcherConfig::default());
        let err = svc.accept(CandidateId::new(42)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
