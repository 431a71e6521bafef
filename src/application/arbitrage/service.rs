//! Arbitrage scan service.
//!
//! Evaluates every outcome group of every active event and keeps the
//! opportunity store in line with the current quotes. A group is one
//! proposition of one market type: markets only pool their quotes when
//! they price the same thing.
//!
//! ```text
//! active events --> groups of quoted markets --> per-group lock
//!                                                     |
//!      quotes_for_event + select_current() + event orientation
//!                                                     |
//!                                               detect()
//!                                     Ok /                 \ Err
//!                        upsert_opportunity()           expire_group()
//! ```
//!
//! Detection for one group is serialized: the group lock is held from the
//! quote read through the store write, so two scans of the same group cannot
//! interleave and leave two active rows.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::ArbitrageConfig;
use crate::domain::{
    detect, select_current, DomainError, GroupKey, LegQuote, Market, MarketId, NoOpportunity,
    OutcomeGroup, SportsEvent, SportsEventId,
};
use crate::error::Result;
use crate::port::outbound::store::{EventFilter, MarketFilter, Store, UpsertOutcome};

/// Counts from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub events_scanned: usize,
    pub groups_evaluated: usize,
    pub created: usize,
    pub superseded: usize,
    pub unchanged: usize,
    /// Active opportunities marked stale because their group stopped qualifying.
    pub expired: usize,
    pub no_arbitrage: usize,
    pub insufficient_venues: usize,
    pub incomplete_group: usize,
    pub below_threshold: usize,
    /// Events skipped because reading or writing their groups failed.
    pub failed: usize,
}

impl ScanSummary {
    fn absorb(&mut self, other: ScanSummary) {
        self.events_scanned += other.events_scanned;
        self.groups_evaluated += other.groups_evaluated;
        self.created += other.created;
        self.superseded += other.superseded;
        self.unchanged += other.unchanged;
        self.expired += other.expired;
        self.no_arbitrage += other.no_arbitrage;
        self.insufficient_venues += other.insufficient_venues;
        self.incomplete_group += other.incomplete_group;
        self.below_threshold += other.below_threshold;
        self.failed += other.failed;
    }

    fn record_rejection(&mut self, reason: &NoOpportunity) {
        match reason {
            NoOpportunity::NoArbitrage { .. } => self.no_arbitrage += 1,
            NoOpportunity::InsufficientVenues { .. } => self.insufficient_venues += 1,
            NoOpportunity::IncompleteGroup { .. } => self.incomplete_group += 1,
            NoOpportunity::BelowThreshold { .. } => self.below_threshold += 1,
        }
    }
}

/// Runs detection over stored quotes and maintains the opportunity store.
///
/// Cheap to share behind an `Arc`; concurrent scans of the same group wait
/// on that group's lock.
pub struct ScanService {
    config: ArbitrageConfig,
    store: Arc<dyn Store>,
    /// One async lock per outcome group, created on first use.
    group_locks: DashMap<GroupKey, Arc<Mutex<()>>>,
}

impl ScanService {
    /// Create a scanner with an empty lock table.
    pub fn new(config: ArbitrageConfig, store: Arc<dyn Store>) -> Self {
        Self {
            config,
            store,
            group_locks: DashMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ArbitrageConfig {
        &self.config
    }

    /// Scan every active event.
    ///
    /// A store failure while scanning one event is logged and counted in
    /// [`ScanSummary::failed`]; the remaining events are still scanned.
    ///
    /// # Errors
    /// Fails only if the event list cannot be read.
    pub async fn scan_all(&self) -> Result<ScanSummary> {
        let events = self
            .store
            .list_events(&EventFilter {
                active_only: true,
                ..EventFilter::default()
            })
            .await?;

        let mut summary = ScanSummary::default();
        for event in &events {
            match self.scan(event).await {
                Ok(scanned) => summary.absorb(scanned),
                Err(e) => {
                    summary.failed += 1;
                    warn!(event_id = %event.id, error = %e, "Event scan failed");
                }
            }
        }

        info!(
            events = summary.events_scanned,
            groups = summary.groups_evaluated,
            created = summary.created,
            superseded = summary.superseded,
            unchanged = summary.unchanged,
            expired = summary.expired,
            failed = summary.failed,
            "Arbitrage scan complete"
        );
        Ok(summary)
    }

    /// Scan one event.
    ///
    /// # Errors
    /// `NotFound` for an unknown event, `InvalidState` when it is final or
    /// cancelled.
    pub async fn scan_event(&self, id: SportsEventId) -> Result<ScanSummary> {
        let event = self
            .store
            .get_event(id)
            .await?
            .ok_or_else(|| DomainError::not_found("sports event", id))?;
        if !event.status.is_active() {
            return Err(DomainError::InvalidState {
                entity: "sports event",
                id: id.to_string(),
                actual: event.status.as_str(),
                expected: "scheduled or live",
            }
            .into());
        }
        self.scan(&event).await
    }

    async fn scan(&self, event: &SportsEvent) -> Result<ScanSummary> {
        let mut summary = ScanSummary {
            events_scanned: 1,
            ..ScanSummary::default()
        };

        let markets = self.event_markets(event.id).await?;
        let quotes = self.store.quotes_for_event(event.id).await?;
        let quoted: HashSet<MarketId> = quotes.iter().map(|q| q.market_id).collect();
        for key in group_keys(markets.iter().filter(|m| quoted.contains(&m.id))) {
            summary.groups_evaluated += 1;
            self.evaluate_group(key, &mut summary).await?;
        }
        Ok(summary)
    }

    async fn event_markets(&self, sports_event_id: SportsEventId) -> Result<Vec<Market>> {
        self.store
            .list_markets(&MarketFilter {
                sports_event_id: Some(sports_event_id),
                ..MarketFilter::default()
            })
            .await
    }

    /// Detect and persist for one group while holding its lock.
    async fn evaluate_group(&self, key: GroupKey, summary: &mut ScanSummary) -> Result<()> {
        let lock = self.group_lock(&key);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let candidates = self.current_legs(&key, now).await?;

        match detect(
            key.clone(),
            &candidates,
            self.config.budget,
            &self.config.solver,
            now,
        ) {
            Ok(opportunity) => {
                let roi = opportunity.worst_case_roi;
                match self.store.upsert_opportunity(opportunity).await? {
                    UpsertOutcome::Created(id) => {
                        summary.created += 1;
                        info!(%key, opportunity_id = %id, %roi, "Arbitrage opportunity detected");
                    }
                    UpsertOutcome::Superseded { id, previous } => {
                        summary.superseded += 1;
                        info!(%key, opportunity_id = %id, previous = %previous, %roi, "Arbitrage opportunity updated");
                    }
                    UpsertOutcome::Unchanged(id) => {
                        summary.unchanged += 1;
                        debug!(%key, opportunity_id = %id, "Quotes unchanged");
                    }
                }
            }
            Err(reason) => {
                debug!(%key, kind = reason.kind().as_str(), %reason, "No opportunity");
                summary.record_rejection(&reason);
                if let Some(id) = self.store.expire_group(&key).await? {
                    summary.expired += 1;
                    info!(%key, opportunity_id = %id, "Opportunity no longer qualifies");
                }
            }
        }
        Ok(())
    }

    /// Current quotes of the markets in `key`'s group, labelled from the
    /// event's side.
    async fn current_legs(&self, key: &GroupKey, now: DateTime<Utc>) -> Result<Vec<LegQuote>> {
        let markets: HashMap<MarketId, Market> = self
            .event_markets(key.sports_event_id)
            .await?
            .into_iter()
            .filter(|m| key.admits(m))
            .filter(|m| !self.config.open_markets_only || m.status.is_open())
            .map(|m| (m.id, m))
            .collect();
        let quotes = self.store.quotes_for_event(key.sports_event_id).await?;

        let labels = key.outcome_group.labels();
        Ok(select_current(&quotes, now, self.config.quote_policy)
            .into_iter()
            .filter_map(|q| {
                let label = markets.get(&q.market_id)?.event_label(q.outcome_label);
                labels.contains(&label).then(|| LegQuote {
                    venue_id: q.venue_id,
                    market_id: q.market_id,
                    outcome_label: label,
                    price: q.price,
                    quote_id: Some(q.id),
                })
            })
            .collect())
    }

    fn group_lock(&self, key: &GroupKey) -> Arc<Mutex<()>> {
        self.group_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Outcome groups priced by `markets`.
///
/// A three-way moneyline is the exhaustive group for its proposition, so a
/// two-way line on the same proposition is folded into it rather than
/// evaluated on its own.
fn group_keys<'a>(markets: impl IntoIterator<Item = &'a Market>) -> Vec<GroupKey> {
    let mut keys: BTreeSet<GroupKey> = markets.into_iter().filter_map(GroupKey::for_market).collect();
    let three_way: Vec<GroupKey> = keys
        .iter()
        .filter(|k| k.outcome_group == OutcomeGroup::HomeDrawAway)
        .cloned()
        .collect();
    keys.retain(|k| {
        k.outcome_group != OutcomeGroup::HomeAway
            || !three_way.contains(&GroupKey {
                outcome_group: OutcomeGroup::HomeDrawAway,
                ..k.clone()
            })
    });
    keys.into_iter().collect()
}
