//! SQLite store implementation.
//!
//! Diesel calls are synchronous; each port method checks out a pooled
//! connection, configures it, and runs to completion.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::SqliteConnection;

use super::database::connection::{checkout, create_pool, run_migrations, DbConn, DbPool};
use super::database::model::{
    format_ts, CandidateRow, LastInsertRowId, LegRow, MarketDataRow, MarketRow, NewCandidateRow,
    NewLegRow, NewOpportunityRow, NewQuoteRow, NewSportsEventRow, OpportunityRow, QuoteRow,
    SportsEventRow,
};
use super::database::schema::{
    arb_legs, arb_opportunities, mapping_candidates, markets, quotes, sports_events,
};
use crate::domain::{
    CandidateId, CandidateStatus, DomainError, EventStatus, GroupKey, MappingCandidate, Market,
    MarketId, NewMappingCandidate, NewMarket, NewOpportunity, NewQuote, NewSportsEvent,
    Opportunity, OpportunityId, OpportunityStatus, Quote, SportsEvent, SportsEventId, VenueId,
};
use crate::error::{Error, Result};
use crate::port::outbound::store::{
    CandidateFilter, CandidateStore, EventFilter, EventStore, MarketFilter, MarketStore,
    OpportunityFilter, OpportunityStore, QuoteFilter, QuoteStore, UpsertOutcome,
};

const ACTIVE_EVENT_STATUSES: [&str; 2] = ["scheduled", "live"];

/// SQLite-backed implementation of every store port.
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) and migrate the database at `database_url`.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be created or migrations fail.
    pub fn open(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url)?;
        run_migrations(&pool)?;
        Ok(Self::new(pool))
    }

    fn conn(&self) -> Result<DbConn> {
        checkout(&self.pool)
    }
}

fn last_insert_id(conn: &mut SqliteConnection) -> Result<i64> {
    Ok(diesel::sql_query("SELECT last_insert_rowid() AS id")
        .get_result::<LastInsertRowId>(conn)?
        .id)
}

fn limit_of(limit: Option<usize>) -> i64 {
    limit
        .and_then(|l| i64::try_from(l).ok())
        .unwrap_or(i64::MAX)
}

fn load_event(conn: &mut SqliteConnection, id: SportsEventId) -> Result<Option<SportsEvent>> {
    sports_events::table
        .find(id.value())
        .select(SportsEventRow::as_select())
        .first(conn)
        .optional()?
        .map(SportsEventRow::into_domain)
        .transpose()
}

fn require_event(conn: &mut SqliteConnection, id: SportsEventId) -> Result<SportsEvent> {
    load_event(conn, id)?.ok_or_else(|| DomainError::not_found("sports event", id).into())
}

fn load_market(conn: &mut SqliteConnection, id: MarketId) -> Result<Option<Market>> {
    markets::table
        .find(id.value())
        .select(MarketRow::as_select())
        .first(conn)
        .optional()?
        .map(MarketRow::into_domain)
        .transpose()
}

fn require_market(conn: &mut SqliteConnection, id: MarketId) -> Result<Market> {
    load_market(conn, id)?.ok_or_else(|| DomainError::not_found("market", id).into())
}

fn require_candidate(conn: &mut SqliteConnection, id: CandidateId) -> Result<MappingCandidate> {
    mapping_candidates::table
        .find(id.value())
        .select(CandidateRow::as_select())
        .first(conn)
        .optional()?
        .map(CandidateRow::into_domain)
        .transpose()?
        .ok_or_else(|| DomainError::not_found("mapping candidate", id).into())
}

fn write_candidate_review(
    conn: &mut SqliteConnection,
    candidate: &MappingCandidate,
) -> Result<()> {
    diesel::update(mapping_candidates::table.find(candidate.id.value()))
        .set((
            mapping_candidates::status.eq(candidate.status.as_str()),
            mapping_candidates::reviewed_at.eq(candidate.reviewed_at.map(format_ts)),
        ))
        .execute(conn)?;
    Ok(())
}

/// Attach legs to opportunity headers, keeping header order.
fn with_legs(conn: &mut SqliteConnection, rows: Vec<OpportunityRow>) -> Result<Vec<Opportunity>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let legs: Vec<LegRow> = arb_legs::table
        .filter(arb_legs::opportunity_id.eq_any(ids))
        .order((arb_legs::opportunity_id.asc(), arb_legs::leg_index.asc()))
        .select(LegRow::as_select())
        .load(conn)?;

    let mut by_opportunity: HashMap<i64, Vec<LegRow>> = HashMap::new();
    for leg in legs {
        by_opportunity.entry(leg.opportunity_id).or_default().push(leg);
    }
    rows.into_iter()
        .map(|row| {
            let legs = by_opportunity.remove(&row.id).unwrap_or_default();
            row.into_domain(legs)
        })
        .collect()
}

fn load_opportunity(conn: &mut SqliteConnection, id: OpportunityId) -> Result<Option<Opportunity>> {
    let row: Option<OpportunityRow> = arb_opportunities::table
        .find(id.value())
        .select(OpportunityRow::as_select())
        .first(conn)
        .optional()?;
    match row {
        Some(row) => Ok(with_legs(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}

fn active_for(conn: &mut SqliteConnection, key: &GroupKey) -> Result<Option<OpportunityRow>> {
    let mut rows: Vec<OpportunityRow> = arb_opportunities::table
        .filter(arb_opportunities::sports_event_id.eq(key.sports_event_id.value()))
        .filter(arb_opportunities::market_type.eq(key.market_type.as_str()))
        .filter(arb_opportunities::proposition.eq(&key.proposition))
        .filter(arb_opportunities::outcome_group.eq(key.outcome_group.as_str()))
        .filter(arb_opportunities::status.eq(OpportunityStatus::Active.as_str()))
        .select(OpportunityRow::as_select())
        .load(conn)?;
    if rows.len() > 1 {
        return Err(DomainError::ConflictingActiveOpportunity {
            group: key.to_string(),
        }
        .into());
    }
    Ok(rows.pop())
}

fn set_opportunity_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: OpportunityStatus,
) -> Result<()> {
    diesel::update(arb_opportunities::table.find(id))
        .set(arb_opportunities::status.eq(status.as_str()))
        .execute(conn)?;
    Ok(())
}

fn insert_opportunity(conn: &mut SqliteConnection, opportunity: &NewOpportunity) -> Result<i64> {
    let row = NewOpportunityRow {
        sports_event_id: opportunity.key.sports_event_id.value(),
        market_type: opportunity.key.market_type.as_str().to_string(),
        proposition: opportunity.key.proposition.clone(),
        outcome_group: opportunity.key.outcome_group.as_str().to_string(),
        detected_at: format_ts(opportunity.detected_at),
        num_outcomes: i32::try_from(opportunity.legs.len())
            .map_err(|e| Error::Parse(e.to_string()))?,
        total_stake: opportunity.total_stake.to_string(),
        worst_case_pnl: opportunity.worst_case_pnl.to_string(),
        best_case_pnl: opportunity.best_case_pnl.to_string(),
        worst_case_roi: opportunity.worst_case_roi.to_string(),
        status: OpportunityStatus::Active.as_str().to_string(),
        fingerprint: opportunity.fingerprint.to_string(),
    };
    match diesel::insert_into(arb_opportunities::table)
        .values(&row)
        .execute(conn)
    {
        Ok(_) => {}
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(DomainError::ConflictingActiveOpportunity {
                group: opportunity.key.to_string(),
            }
            .into());
        }
        Err(e) => return Err(e.into()),
    }
    let id = last_insert_id(conn)?;

    let legs: Vec<NewLegRow> = opportunity
        .legs
        .iter()
        .enumerate()
        .map(|(i, leg)| NewLegRow::new(id, i, leg))
        .collect();
    diesel::insert_into(arb_legs::table)
        .values(&legs)
        .execute(conn)?;
    Ok(id)
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn create_event(
        &self,
        event: NewSportsEvent,
        tolerance: Duration,
    ) -> Result<(SportsEvent, bool)> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| {
            let same_sport: Vec<SportsEventRow> = sports_events::table
                .filter(sports_events::sport.eq(&event.sport))
                .filter(sports_events::status.eq_any(ACTIVE_EVENT_STATUSES))
                .select(SportsEventRow::as_select())
                .load(conn)?;
            for row in same_sport {
                let existing = row.into_domain()?;
                if existing.is_duplicate_of(&event, tolerance) {
                    return Ok((existing, false));
                }
            }

            diesel::insert_into(sports_events::table)
                .values(NewSportsEventRow::from(&event))
                .execute(conn)?;
            let id = SportsEventId::new(last_insert_id(conn)?);
            Ok((require_event(conn, id)?, true))
        })
    }

    async fn get_event(&self, id: SportsEventId) -> Result<Option<SportsEvent>> {
        let mut conn = self.conn()?;
        load_event(&mut conn, id)
    }

    async fn find_event_by_ref(&self, external_ref: &str) -> Result<Option<SportsEvent>> {
        let mut conn = self.conn()?;
        sports_events::table
            .filter(sports_events::external_ref.eq(external_ref))
            .order(sports_events::id.asc())
            .select(SportsEventRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(SportsEventRow::into_domain)
            .transpose()
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<SportsEvent>> {
        let mut conn = self.conn()?;
        let mut query = sports_events::table
            .select(SportsEventRow::as_select())
            .into_boxed();
        if let Some(sport) = &filter.sport {
            query = query.filter(sports_events::sport.eq(sport.to_ascii_uppercase()));
        }
        if filter.active_only {
            query = query.filter(sports_events::status.eq_any(ACTIVE_EVENT_STATUSES));
        }
        if let Some((from, to)) = filter.starts_between {
            query = query
                .filter(sports_events::start_time.ge(format_ts(from)))
                .filter(sports_events::start_time.le(format_ts(to)));
        }
        let rows: Vec<SportsEventRow> = query
            .order((sports_events::start_time.asc(), sports_events::id.asc()))
            .load(&mut conn)?;
        rows.into_iter().map(SportsEventRow::into_domain).collect()
    }

    async fn update_event_status(
        &self,
        id: SportsEventId,
        status: EventStatus,
    ) -> Result<SportsEvent> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| {
            let mut event = require_event(conn, id)?;
            event.transition(status)?;
            diesel::update(sports_events::table.find(id.value()))
                .set(sports_events::status.eq(status.as_str()))
                .execute(conn)?;
            Ok(event)
        })
    }
}

#[async_trait]
impl MarketStore for SqliteStore {
    async fn upsert_market(&self, market: NewMarket) -> Result<Market> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| {
            let data = MarketDataRow::new(&market, Utc::now());
            let existing: Option<i64> = markets::table
                .filter(markets::venue_id.eq(market.venue_id.as_str()))
                .filter(markets::venue_market_key.eq(&market.venue_market_key))
                .select(markets::id)
                .first(conn)
                .optional()?;

            let id = match existing {
                Some(id) => {
                    diesel::update(markets::table.find(id))
                        .set(&data)
                        .execute(conn)?;
                    id
                }
                None => {
                    diesel::insert_into(markets::table)
                        .values(&data)
                        .execute(conn)?;
                    last_insert_id(conn)?
                }
            };
            require_market(conn, MarketId::new(id))
        })
    }

    async fn get_market(&self, id: MarketId) -> Result<Option<Market>> {
        let mut conn = self.conn()?;
        load_market(&mut conn, id)
    }

    async fn find_market(
        &self,
        venue_id: &VenueId,
        venue_market_key: &str,
    ) -> Result<Option<Market>> {
        let mut conn = self.conn()?;
        markets::table
            .filter(markets::venue_id.eq(venue_id.as_str()))
            .filter(markets::venue_market_key.eq(venue_market_key))
            .select(MarketRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(MarketRow::into_domain)
            .transpose()
    }

    async fn list_markets(&self, filter: &MarketFilter) -> Result<Vec<Market>> {
        let mut conn = self.conn()?;

        let sport_events: Option<(String, Vec<i64>)> = match &filter.sport {
            Some(sport) => {
                let sport = sport.to_ascii_uppercase();
                let ids = sports_events::table
                    .filter(sports_events::sport.eq(&sport))
                    .select(sports_events::id)
                    .load::<i64>(&mut conn)?;
                Some((sport, ids))
            }
            None => None,
        };

        let mut query = markets::table.select(MarketRow::as_select()).into_boxed();
        if let Some(venue) = &filter.venue_id {
            query = query.filter(markets::venue_id.eq(venue.to_string()));
        }
        if let Some(event) = filter.sports_event_id {
            query = query.filter(markets::sports_event_id.eq(event.value()));
        }
        if filter.unmapped_only {
            query = query.filter(markets::sports_event_id.is_null());
        }
        if let Some((sport, ids)) = sport_events {
            query = query.filter(
                markets::hint_sport
                    .eq(sport)
                    .or(markets::sports_event_id.eq_any(ids)),
            );
        }
        let rows: Vec<MarketRow> = query
            .order(markets::id.asc())
            .limit(limit_of(filter.limit))
            .load(&mut conn)?;
        rows.into_iter().map(MarketRow::into_domain).collect()
    }

    async fn link_market(&self, id: MarketId, sports_event_id: SportsEventId) -> Result<Market> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| {
            require_event(conn, sports_event_id)?;
            let mut market = require_market(conn, id)?;
            if let Some(existing) = market.sports_event_id {
                if existing != sports_event_id {
                    return Err(DomainError::AlreadyResolved {
                        market_id: id.value(),
                        sports_event_id: existing.value(),
                    }
                    .into());
                }
                return Ok(market);
            }
            diesel::update(markets::table.find(id.value()))
                .set(markets::sports_event_id.eq(Some(sports_event_id.value())))
                .execute(conn)?;
            market.sports_event_id = Some(sports_event_id);
            Ok(market)
        })
    }
}

#[async_trait]
impl CandidateStore for SqliteStore {
    async fn insert_candidate(
        &self,
        candidate: NewMappingCandidate,
    ) -> Result<Option<MappingCandidate>> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| {
            require_market(conn, candidate.market_id)?;
            require_event(conn, candidate.sports_event_id)?;

            let existing: i64 = mapping_candidates::table
                .filter(mapping_candidates::market_id.eq(candidate.market_id.value()))
                .filter(mapping_candidates::sports_event_id.eq(candidate.sports_event_id.value()))
                .count()
                .get_result(conn)?;
            if existing > 0 {
                return Ok(None);
            }

            diesel::insert_into(mapping_candidates::table)
                .values(NewCandidateRow::new(&candidate, Utc::now())?)
                .execute(conn)?;
            let id = CandidateId::new(last_insert_id(conn)?);
            require_candidate(conn, id).map(Some)
        })
    }

    async fn get_candidate(&self, id: CandidateId) -> Result<Option<MappingCandidate>> {
        let mut conn = self.conn()?;
        match require_candidate(&mut conn, id) {
            Ok(candidate) => Ok(Some(candidate)),
            Err(Error::Domain(DomainError::NotFound { .. })) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<MappingCandidate>> {
        let mut conn = self.conn()?;
        let mut query = mapping_candidates::table
            .select(CandidateRow::as_select())
            .into_boxed();
        if let Some(status) = filter.status {
            query = query.filter(mapping_candidates::status.eq(status.as_str()));
        }
        if let Some(market) = filter.market_id {
            query = query.filter(mapping_candidates::market_id.eq(market.value()));
        }
        let rows: Vec<CandidateRow> = query
            .order((
                mapping_candidates::created_at.desc(),
                mapping_candidates::id.desc(),
            ))
            .limit(limit_of(filter.limit))
            .load(&mut conn)?;
        rows.into_iter().map(CandidateRow::into_domain).collect()
    }

    async fn accept_candidate(
        &self,
        id: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<(MappingCandidate, Market)> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| {
            let mut candidate = require_candidate(conn, id)?;
            let mut market = require_market(conn, candidate.market_id)?;

            candidate.review(CandidateStatus::Accepted, now)?;
            candidate.check_market_link(market.sports_event_id)?;

            if !market.is_mapped() {
                market.sides_swapped = candidate.features.teams_swapped();
            }
            market.sports_event_id = Some(candidate.sports_event_id);
            diesel::update(markets::table.find(market.id.value()))
                .set((
                    markets::sports_event_id.eq(Some(candidate.sports_event_id.value())),
                    markets::sides_swapped.eq(market.sides_swapped),
                ))
                .execute(conn)?;
            write_candidate_review(conn, &candidate)?;
            Ok((candidate, market))
        })
    }

    async fn reject_candidate(
        &self,
        id: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<MappingCandidate> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| {
            let mut candidate = require_candidate(conn, id)?;
            candidate.review(CandidateStatus::Rejected, now)?;
            write_candidate_review(conn, &candidate)?;
            Ok(candidate)
        })
    }
}

#[async_trait]
impl QuoteStore for SqliteStore {
    async fn insert_quote(&self, quote: NewQuote) -> Result<Quote> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| {
            require_market(conn, quote.market_id)?;
            diesel::insert_into(quotes::table)
                .values(NewQuoteRow::from(&quote))
                .execute(conn)?;
            let id = last_insert_id(conn)?;
            quotes::table
                .find(id)
                .select(QuoteRow::as_select())
                .first(conn)?
                .into_domain()
        })
    }

    async fn quotes_for_event(&self, sports_event_id: SportsEventId) -> Result<Vec<Quote>> {
        let mut conn = self.conn()?;
        let rows: Vec<QuoteRow> = quotes::table
            .filter(
                quotes::market_id.eq_any(
                    markets::table
                        .filter(markets::sports_event_id.eq(sports_event_id.value()))
                        .select(markets::id),
                ),
            )
            .order(quotes::id.asc())
            .select(QuoteRow::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(QuoteRow::into_domain).collect()
    }

    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>> {
        let mut conn = self.conn()?;
        let event_markets: Option<Vec<i64>> = match filter.sports_event_id {
            Some(event) => Some(
                markets::table
                    .filter(markets::sports_event_id.eq(event.value()))
                    .select(markets::id)
                    .load(&mut conn)?,
            ),
            None => None,
        };

        let mut query = quotes::table.select(QuoteRow::as_select()).into_boxed();
        if let Some(ids) = event_markets {
            query = query.filter(quotes::market_id.eq_any(ids));
        }
        if let Some(market) = filter.market_id {
            query = query.filter(quotes::market_id.eq(market.value()));
        }
        let rows: Vec<QuoteRow> = query
            .order((quotes::observed_at.desc(), quotes::id.desc()))
            .limit(limit_of(filter.limit))
            .load(&mut conn)?;
        rows.into_iter().map(QuoteRow::into_domain).collect()
    }
}

#[async_trait]
impl OpportunityStore for SqliteStore {
    async fn upsert_opportunity(&self, opportunity: NewOpportunity) -> Result<UpsertOutcome> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| {
            let previous = active_for(conn, &opportunity.key)?;
            if let Some(prev) = &previous {
                if prev.fingerprint == opportunity.fingerprint.as_str() {
                    return Ok(UpsertOutcome::Unchanged(OpportunityId::new(prev.id)));
                }
                set_opportunity_status(conn, prev.id, OpportunityStatus::Stale)?;
            }

            let id = OpportunityId::new(insert_opportunity(conn, &opportunity)?);
            Ok(match previous {
                Some(prev) => UpsertOutcome::Superseded {
                    id,
                    previous: OpportunityId::new(prev.id),
                },
                None => UpsertOutcome::Created(id),
            })
        })
    }

    async fn get_opportunity(&self, id: OpportunityId) -> Result<Option<Opportunity>> {
        let mut conn = self.conn()?;
        load_opportunity(&mut conn, id)
    }

    async fn list_opportunities(&self, filter: &OpportunityFilter) -> Result<Vec<Opportunity>> {
        let mut conn = self.conn()?;
        let mut query = arb_opportunities::table
            .select(OpportunityRow::as_select())
            .into_boxed();
        if let Some(status) = filter.status {
            query = query.filter(arb_opportunities::status.eq(status.as_str()));
        }
        if let Some(event) = filter.sports_event_id {
            query = query.filter(arb_opportunities::sports_event_id.eq(event.value()));
        }
        // ROI is stored as exact decimal text, so the minimum is applied after
        // loading and the limit with it.
        if filter.min_roi.is_none() {
            query = query.limit(limit_of(filter.limit));
        }
        let rows: Vec<OpportunityRow> = query
            .order((
                arb_opportunities::detected_at.desc(),
                arb_opportunities::id.desc(),
            ))
            .load(&mut conn)?;

        let rows: Vec<OpportunityRow> = match filter.min_roi {
            Some(min) => {
                let mut kept = Vec::new();
                for row in rows {
                    let roi: rust_decimal::Decimal = row
                        .worst_case_roi
                        .parse()
                        .map_err(|e: rust_decimal::Error| Error::Parse(e.to_string()))?;
                    if roi >= min {
                        kept.push(row);
                    }
                }
                kept.truncate(filter.limit.unwrap_or(usize::MAX));
                kept
            }
            None => rows,
        };
        with_legs(&mut conn, rows)
    }

    async fn close_opportunity(&self, id: OpportunityId) -> Result<Opportunity> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| {
            if load_opportunity(conn, id)?.is_none() {
                return Err(DomainError::not_found("opportunity", id).into());
            }
            set_opportunity_status(conn, id.value(), OpportunityStatus::Closed)?;
            load_opportunity(conn, id)?
                .ok_or_else(|| DomainError::not_found("opportunity", id).into())
        })
    }

    async fn expire_group(&self, key: &GroupKey) -> Result<Option<OpportunityId>> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| match active_for(conn, key)? {
            Some(row) => {
                set_opportunity_status(conn, row.id, OpportunityStatus::Stale)?;
                Ok(Some(OpportunityId::new(row.id)))
            }
            None => Ok(None),
        })
    }

    async fn close_for_event(&self, sports_event_id: SportsEventId) -> Result<usize> {
        let mut conn = self.conn()?;
        let closed = diesel::update(
            arb_opportunities::table
                .filter(arb_opportunities::sports_event_id.eq(sports_event_id.value()))
                .filter(arb_opportunities::status.ne(OpportunityStatus::Closed.as_str())),
        )
        .set(arb_opportunities::status.eq(OpportunityStatus::Closed.as_str()))
        .execute(&mut conn)?;
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureSet, MatchFeature, OutcomeLabel};
    use crate::error::ErrorKind;
    use crate::testkit::domain::{
        event_at, market_with_hints, opportunity_for, seed_binary_event, seed_quote, tip_off,
    };
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    struct TempStore {
        store: Arc<SqliteStore>,
        path: std::path::PathBuf,
    }

    impl Drop for TempStore {
        fn drop(&mut self) {
            for suffix in ["", "-wal", "-shm"] {
                let _ = std::fs::remove_file(format!("{}{suffix}", self.path.display()));
            }
        }
    }

    fn temp_store(name: &str) -> TempStore {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("linesman-store-{name}-{nanos}.db"));
        let store = SqliteStore::open(&path.display().to_string()).unwrap();
        TempStore {
            store: Arc::new(store),
            path,
        }
    }

    fn swapped_features() -> FeatureSet {
        FeatureSet::new(vec![
            MatchFeature::SportMatch,
            MatchFeature::TeamSimilarity {
                score: 1.0,
                swapped: true,
            },
        ])
    }

    #[tokio::test]
    async fn duplicate_events_are_collapsed() {
        let db = temp_store("dup");
        let (first, inserted) = db
            .store
            .create_event(event_at("NBA", "Thunder", "Suns", tip_off()), Duration::hours(1))
            .await
            .unwrap();
        assert!(inserted);

        let (second, inserted) = db
            .store
            .create_event(
                event_at("nba", "thunder", "suns", tip_off() + Duration::minutes(20)),
                Duration::hours(1),
            )
            .await
            .unwrap();
        assert!(!inserted);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn upsert_keeps_event_link() {
        let db = temp_store("upsert");
        let (event, kalshi, _) = seed_binary_event(&db.store).await;

        let mut refreshed = crate::testkit::domain::new_market_from(&kalshi);
        refreshed.question = "Thunder to win?".into();
        let market = db.store.upsert_market(refreshed).await.unwrap();

        assert_eq!(market.id, kalshi.id);
        assert_eq!(market.question, "Thunder to win?");
        assert_eq!(market.sports_event_id, Some(event.id));
    }

    #[tokio::test]
    async fn sport_filter_matches_hint_or_linked_event() {
        let db = temp_store("sport");
        seed_binary_event(&db.store).await;
        let mut unhinted = market_with_hints("polymarket", "nfl-1", "NFL", "Chiefs", "Bills");
        unhinted.hints.sport = None;
        db.store.upsert_market(unhinted).await.unwrap();

        let nba = db
            .store
            .list_markets(&MarketFilter {
                sport: Some("nba".into()),
                ..MarketFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(nba.len(), 2);
    }

    #[tokio::test]
    async fn swapped_accept_records_orientation_not_relabels() {
        let db = temp_store("swap");
        let (event, _) = db
            .store
            .create_event(event_at("NBA", "Thunder", "Suns", tip_off()), Duration::zero())
            .await
            .unwrap();
        let market = db
            .store
            .upsert_market(market_with_hints("polymarket", "m1", "NBA", "Suns", "Thunder"))
            .await
            .unwrap();
        let quote = seed_quote(&db.store, &market, OutcomeLabel::HomeWin, dec!(0.6)).await;

        let candidate = db
            .store
            .insert_candidate(NewMappingCandidate {
                market_id: market.id,
                sports_event_id: event.id,
                confidence: 0.95,
                features: swapped_features(),
            })
            .await
            .unwrap()
            .unwrap();

        let (accepted, linked) = db
            .store
            .accept_candidate(candidate.id, Utc::now())
            .await
            .unwrap();
        assert_eq!(accepted.status, CandidateStatus::Accepted);
        assert_eq!(linked.sports_event_id, Some(event.id));
        assert!(linked.sides_swapped);
        assert_eq!(linked.outcomes, market.outcomes);
        assert_eq!(linked.event_label(OutcomeLabel::HomeWin), OutcomeLabel::AwayWin);

        let quotes = db.store.quotes_for_event(event.id).await.unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].id, quote.id);
        assert_eq!(quotes[0].outcome_label, OutcomeLabel::HomeWin);

        // A venue refresh rewrites the outcomes but keeps the orientation.
        let refreshed = db
            .store
            .upsert_market(market_with_hints("polymarket", "m1", "NBA", "Suns", "Thunder"))
            .await
            .unwrap();
        assert!(refreshed.sides_swapped);
        assert_eq!(
            refreshed.event_outcomes(),
            vec![OutcomeLabel::AwayWin, OutcomeLabel::HomeWin]
        );
    }

    #[tokio::test]
    async fn different_propositions_are_active_together() {
        let db = temp_store("props");
        let (event, _, _) = seed_binary_event(&db.store).await;

        let first = opportunity_for(event.id, 1);
        let mut other_line = opportunity_for(event.id, 2);
        other_line.key.proposition = "will the thunder cover -5.5".into();

        let a = db.store.upsert_opportunity(first).await.unwrap();
        let b = db.store.upsert_opportunity(other_line).await.unwrap();
        assert!(matches!(a, UpsertOutcome::Created(_)));
        assert!(matches!(b, UpsertOutcome::Created(_)));

        let stored = db.store.get_opportunity(b.id()).await.unwrap().unwrap();
        assert_eq!(stored.proposition, "will the thunder cover -5.5");
        assert_eq!(stored.status, OpportunityStatus::Active);
    }

    #[tokio::test]
    async fn candidate_pair_is_unique() {
        let db = temp_store("pair");
        let (event, kalshi, _) = seed_binary_event(&db.store).await;
        let candidate = || NewMappingCandidate {
            market_id: kalshi.id,
            sports_event_id: event.id,
            confidence: 0.8,
            features: FeatureSet::new(vec![MatchFeature::SportMatch]),
        };
        assert!(db.store.insert_candidate(candidate()).await.unwrap().is_some());
        assert!(db.store.insert_candidate(candidate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_opportunity_supersedes_and_dedups() {
        let db = temp_store("opps");
        let (event, _, _) = seed_binary_event(&db.store).await;

        let first = db
            .store
            .upsert_opportunity(opportunity_for(event.id, 1))
            .await
            .unwrap();
        assert!(matches!(first, UpsertOutcome::Created(_)));

        let same = db
            .store
            .upsert_opportunity(opportunity_for(event.id, 1))
            .await
            .unwrap();
        assert_eq!(same, UpsertOutcome::Unchanged(first.id()));

        let next = db
            .store
            .upsert_opportunity(opportunity_for(event.id, 2))
            .await
            .unwrap();
        assert_eq!(
            next,
            UpsertOutcome::Superseded {
                id: next.id(),
                previous: first.id(),
            }
        );

        let previous = db.store.get_opportunity(first.id()).await.unwrap().unwrap();
        assert_eq!(previous.status, OpportunityStatus::Stale);
        let current = db.store.get_opportunity(next.id()).await.unwrap().unwrap();
        assert_eq!(current.status, OpportunityStatus::Active);
        assert_eq!(current.legs.len(), 2);
        assert_eq!(current.worst_case_roi, dec!(0.05));
    }

    #[tokio::test]
    async fn min_roi_filter_and_close() {
        let db = temp_store("roi");
        let (event, _, _) = seed_binary_event(&db.store).await;
        let id = db
            .store
            .upsert_opportunity(opportunity_for(event.id, 1))
            .await
            .unwrap()
            .id();

        let high = db
            .store
            .list_opportunities(&OpportunityFilter {
                min_roi: Some(dec!(0.10)),
                ..OpportunityFilter::default()
            })
            .await
            .unwrap();
        assert!(high.is_empty());

        let closed = db.store.close_opportunity(id).await.unwrap();
        assert_eq!(closed.status, OpportunityStatus::Closed);
        let again = db.store.close_opportunity(id).await.unwrap();
        assert_eq!(again.status, OpportunityStatus::Closed);
    }

    #[tokio::test]
    async fn missing_entities_are_not_found() {
        let db = temp_store("missing");
        let err = db
            .store
            .link_market(MarketId::new(9), SportsEventId::new(9))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(db.store.get_candidate(CandidateId::new(1)).await.unwrap().is_none());
    }
}
