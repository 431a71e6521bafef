//! Database model types for Diesel ORM.
//!
//! Timestamps are RFC 3339 text with microsecond precision in UTC, so that
//! text ordering matches time ordering. Decimals are text.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{
    arb_legs, arb_opportunities, mapping_candidates, markets, quotes, sports_events,
};
use crate::domain::market::{join_labels, split_labels};
use crate::domain::{
    ArbLeg, CandidateId, FeatureSet, LegFingerprint, MappingCandidate, Market, MarketId,
    NewMappingCandidate, NewMarket, NewQuote, NewSportsEvent, NormalizedPrice, Opportunity,
    OpportunityId, ParsedHints, Quote, QuoteId, SportsEvent, SportsEventId, VenueId,
};
use crate::error::{Error, Result};

pub(crate) fn format_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("timestamp '{value}': {e}")))
}

fn parse_opt_ts(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value.map(parse_ts).transpose()
}

fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| Error::Parse(format!("decimal '{value}': {e}")))
}

/// Database row for a sports event (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = sports_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SportsEventRow {
    pub id: i64,
    pub sport: String,
    pub league: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub start_time: String,
    pub status: String,
    pub canonical_name: String,
    pub source: String,
    pub external_ref: Option<String>,
}

impl SportsEventRow {
    pub fn into_domain(self) -> Result<SportsEvent> {
        Ok(SportsEvent {
            id: SportsEventId::new(self.id),
            sport: self.sport,
            league: self.league,
            home_team: self.home_team,
            away_team: self.away_team,
            start_time: parse_ts(&self.start_time)?,
            status: self.status.parse()?,
            canonical_name: self.canonical_name,
            source: self.source.parse()?,
            external_ref: self.external_ref,
        })
    }
}

/// Database row for a sports event (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = sports_events)]
pub struct NewSportsEventRow {
    pub sport: String,
    pub league: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub start_time: String,
    pub status: String,
    pub canonical_name: String,
    pub source: String,
    pub external_ref: Option<String>,
}

impl From<&NewSportsEvent> for NewSportsEventRow {
    fn from(event: &NewSportsEvent) -> Self {
        Self {
            sport: event.sport.clone(),
            league: event.league.clone(),
            home_team: event.home_team.clone(),
            away_team: event.away_team.clone(),
            start_time: format_ts(event.start_time),
            status: "scheduled".to_string(),
            canonical_name: event.display_name(),
            source: event.source.as_str().to_string(),
            external_ref: event.external_ref.clone(),
        }
    }
}

/// Database row for a market (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = markets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MarketRow {
    pub id: i64,
    pub venue_id: String,
    pub venue_market_key: String,
    pub market_type: String,
    pub question: String,
    pub sports_event_id: Option<i64>,
    pub status: String,
    pub hint_sport: Option<String>,
    pub hint_league: Option<String>,
    pub hint_home_team: Option<String>,
    pub hint_away_team: Option<String>,
    pub hint_start_time: Option<String>,
    pub outcomes: String,
    pub expires_at: Option<String>,
    pub event_ref: Option<String>,
    pub sides_swapped: bool,
    pub updated_at: String,
}

impl MarketRow {
    pub fn into_domain(self) -> Result<Market> {
        Ok(Market {
            id: MarketId::new(self.id),
            venue_id: VenueId::new(self.venue_id),
            venue_market_key: self.venue_market_key,
            market_type: self.market_type.parse()?,
            question: self.question,
            sports_event_id: self.sports_event_id.map(SportsEventId::new),
            status: self.status.parse()?,
            hints: ParsedHints {
                sport: self.hint_sport,
                league: self.hint_league,
                home_team: self.hint_home_team,
                away_team: self.hint_away_team,
                start_time: parse_opt_ts(self.hint_start_time.as_deref())?,
            },
            outcomes: split_labels(&self.outcomes)?,
            expires_at: parse_opt_ts(self.expires_at.as_deref())?,
            event_ref: self.event_ref,
            sides_swapped: self.sides_swapped,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

/// Market columns written on insert and refresh. The event link and side
/// orientation are not among them; they change only through linking or
/// candidate acceptance.
#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = markets)]
#[diesel(treat_none_as_null = true)]
pub struct MarketDataRow {
    pub venue_id: String,
    pub venue_market_key: String,
    pub market_type: String,
    pub question: String,
    pub status: String,
    pub hint_sport: Option<String>,
    pub hint_league: Option<String>,
    pub hint_home_team: Option<String>,
    pub hint_away_team: Option<String>,
    pub hint_start_time: Option<String>,
    pub outcomes: String,
    pub expires_at: Option<String>,
    pub event_ref: Option<String>,
    pub updated_at: String,
}

impl MarketDataRow {
    pub fn new(market: &NewMarket, now: DateTime<Utc>) -> Self {
        Self {
            venue_id: market.venue_id.to_string(),
            venue_market_key: market.venue_market_key.clone(),
            market_type: market.market_type.as_str().to_string(),
            question: market.question.clone(),
            status: market.status.as_str().to_string(),
            hint_sport: market.hints.sport.clone(),
            hint_league: market.hints.league.clone(),
            hint_home_team: market.hints.home_team.clone(),
            hint_away_team: market.hints.away_team.clone(),
            hint_start_time: market.hints.start_time.map(format_ts),
            outcomes: join_labels(&market.outcomes),
            expires_at: market.expires_at.map(format_ts),
            event_ref: market.event_ref.clone(),
            updated_at: format_ts(now),
        }
    }
}

/// Database row for a mapping candidate (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = mapping_candidates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CandidateRow {
    pub id: i64,
    pub market_id: i64,
    pub sports_event_id: i64,
    pub confidence: f64,
    pub features: String,
    pub status: String,
    pub created_at: String,
    pub reviewed_at: Option<String>,
}

impl CandidateRow {
    pub fn into_domain(self) -> Result<MappingCandidate> {
        let features: FeatureSet = serde_json::from_str(&self.features)?;
        Ok(MappingCandidate {
            id: CandidateId::new(self.id),
            market_id: MarketId::new(self.market_id),
            sports_event_id: SportsEventId::new(self.sports_event_id),
            confidence: self.confidence,
            features,
            status: self.status.parse()?,
            created_at: parse_ts(&self.created_at)?,
            reviewed_at: parse_opt_ts(self.reviewed_at.as_deref())?,
        })
    }
}

/// Database row for a mapping candidate (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = mapping_candidates)]
pub struct NewCandidateRow {
    pub market_id: i64,
    pub sports_event_id: i64,
    pub confidence: f64,
    pub features: String,
    pub status: String,
    pub created_at: String,
}

impl NewCandidateRow {
    pub fn new(candidate: &NewMappingCandidate, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            market_id: candidate.market_id.value(),
            sports_event_id: candidate.sports_event_id.value(),
            confidence: candidate.confidence,
            features: serde_json::to_string(&candidate.features)?,
            status: "pending".to_string(),
            created_at: format_ts(now),
        })
    }
}

/// Database row for a quote (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = quotes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QuoteRow {
    pub id: i64,
    pub market_id: i64,
    pub venue_id: String,
    pub outcome_label: String,
    pub observed_at: String,
    pub raw_price: String,
    pub price_format: String,
    pub share_price: String,
    pub win_pnl: String,
    pub lose_pnl: String,
}

impl QuoteRow {
    pub fn into_domain(self) -> Result<Quote> {
        Ok(Quote {
            id: QuoteId::new(self.id),
            market_id: MarketId::new(self.market_id),
            venue_id: VenueId::new(self.venue_id),
            outcome_label: self.outcome_label.parse()?,
            observed_at: parse_ts(&self.observed_at)?,
            raw_price: parse_decimal(&self.raw_price)?,
            price_format: self.price_format.parse()?,
            price: NormalizedPrice {
                share_price: parse_decimal(&self.share_price)?,
                win_pnl: parse_decimal(&self.win_pnl)?,
                lose_pnl: parse_decimal(&self.lose_pnl)?,
            },
        })
    }
}

/// Database row for a quote (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = quotes)]
pub struct NewQuoteRow {
    pub market_id: i64,
    pub venue_id: String,
    pub outcome_label: String,
    pub observed_at: String,
    pub raw_price: String,
    pub price_format: String,
    pub share_price: String,
    pub win_pnl: String,
    pub lose_pnl: String,
}

impl From<&NewQuote> for NewQuoteRow {
    fn from(quote: &NewQuote) -> Self {
        Self {
            market_id: quote.market_id.value(),
            venue_id: quote.venue_id.to_string(),
            outcome_label: quote.outcome_label.as_str().to_string(),
            observed_at: format_ts(quote.observed_at),
            raw_price: quote.raw_price.to_string(),
            price_format: quote.price_format.as_str().to_string(),
            share_price: quote.price.share_price.to_string(),
            win_pnl: quote.price.win_pnl.to_string(),
            lose_pnl: quote.price.lose_pnl.to_string(),
        }
    }
}

/// Database row for an opportunity header (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = arb_opportunities)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OpportunityRow {
    pub id: i64,
    pub sports_event_id: i64,
    pub market_type: String,
    pub proposition: String,
    pub outcome_group: String,
    pub detected_at: String,
    pub num_outcomes: i32,
    pub total_stake: String,
    pub worst_case_pnl: String,
    pub best_case_pnl: String,
    pub worst_case_roi: String,
    pub status: String,
    pub fingerprint: String,
}

impl OpportunityRow {
    pub fn into_domain(self, legs: Vec<LegRow>) -> Result<Opportunity> {
        Ok(Opportunity {
            id: OpportunityId::new(self.id),
            sports_event_id: SportsEventId::new(self.sports_event_id),
            market_type: self.market_type.parse()?,
            proposition: self.proposition,
            outcome_group: self.outcome_group.parse()?,
            detected_at: parse_ts(&self.detected_at)?,
            num_outcomes: usize::try_from(self.num_outcomes)
                .map_err(|e| Error::Parse(e.to_string()))?,
            total_stake: parse_decimal(&self.total_stake)?,
            worst_case_pnl: parse_decimal(&self.worst_case_pnl)?,
            best_case_pnl: parse_decimal(&self.best_case_pnl)?,
            worst_case_roi: parse_decimal(&self.worst_case_roi)?,
            status: self.status.parse()?,
            fingerprint: LegFingerprint::new(self.fingerprint),
            legs: legs
                .into_iter()
                .map(LegRow::into_domain)
                .collect::<Result<_>>()?,
        })
    }
}

/// Database row for an opportunity header (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = arb_opportunities)]
pub struct NewOpportunityRow {
    pub sports_event_id: i64,
    pub market_type: String,
    pub proposition: String,
    pub outcome_group: String,
    pub detected_at: String,
    pub num_outcomes: i32,
    pub total_stake: String,
    pub worst_case_pnl: String,
    pub best_case_pnl: String,
    pub worst_case_roi: String,
    pub status: String,
    pub fingerprint: String,
}

/// Database row for an opportunity leg (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = arb_legs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LegRow {
    pub id: i64,
    pub opportunity_id: i64,
    pub leg_index: i32,
    pub venue_id: String,
    pub market_id: i64,
    pub outcome_label: String,
    pub stake_shares: String,
    pub stake: String,
    pub share_price: String,
    pub win_pnl_per_share: String,
    pub lose_pnl_per_share: String,
    pub source_quote_id: Option<i64>,
}

impl LegRow {
    fn into_domain(self) -> Result<ArbLeg> {
        Ok(ArbLeg {
            venue_id: VenueId::new(self.venue_id),
            market_id: MarketId::new(self.market_id),
            outcome_label: self.outcome_label.parse()?,
            stake_shares: parse_decimal(&self.stake_shares)?,
            stake: parse_decimal(&self.stake)?,
            share_price: parse_decimal(&self.share_price)?,
            win_pnl_per_share: parse_decimal(&self.win_pnl_per_share)?,
            lose_pnl_per_share: parse_decimal(&self.lose_pnl_per_share)?,
            source_quote_id: self.source_quote_id.map(QuoteId::new),
        })
    }
}

/// Database row for an opportunity leg (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = arb_legs)]
pub struct NewLegRow {
    pub opportunity_id: i64,
    pub leg_index: i32,
    pub venue_id: String,
    pub market_id: i64,
    pub outcome_label: String,
    pub stake_shares: String,
    pub stake: String,
    pub share_price: String,
    pub win_pnl_per_share: String,
    pub lose_pnl_per_share: String,
    pub source_quote_id: Option<i64>,
}

impl NewLegRow {
    pub fn new(opportunity_id: i64, index: usize, leg: &ArbLeg) -> Self {
        Self {
            opportunity_id,
            leg_index: i32::try_from(index).unwrap_or(i32::MAX),
            venue_id: leg.venue_id.to_string(),
            market_id: leg.market_id.value(),
            outcome_label: leg.outcome_label.as_str().to_string(),
            stake_shares: leg.stake_shares.to_string(),
            stake: leg.stake.to_string(),
            share_price: leg.share_price.to_string(),
            win_pnl_per_share: leg.win_pnl_per_share.to_string(),
            lose_pnl_per_share: leg.lose_pnl_per_share.to_string(),
            source_quote_id: leg.source_quote_id.map(QuoteId::value),
        }
    }
}

/// Row id read back after an insert.
#[derive(QueryableByName, Debug)]
pub struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub id: i64,
}
