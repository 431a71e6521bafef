//! Quote and opportunity handlers.

use std::collections::{BTreeSet, HashMap};

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{optional_json, ApiError};
use crate::application::arbitrage::ScanSummary;
use crate::application::Engine;
use crate::domain::{
    DomainError, Market, MarketId, Opportunity, OpportunityId, OpportunityStatus, OutcomeLabel,
    Quote, SportsEventId,
};
use crate::port::outbound::store::{OpportunityFilter, QuoteFilter};

const DEFAULT_QUOTE_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub sports_event_id: Option<i64>,
    pub market_id: Option<i64>,
    pub limit: Option<usize>,
}

/// A stored quote plus its outcome as seen from the linked event. The two
/// labels differ when the venue lists the teams the other way round.
#[derive(Debug, Serialize)]
pub struct QuoteView {
    #[serde(flatten)]
    pub quote: Quote,
    pub event_outcome_label: OutcomeLabel,
}

pub async fn list_quotes(
    State(engine): State<Engine>,
    query: Result<Query<QuoteQuery>, QueryRejection>,
) -> Result<Json<Vec<QuoteView>>, ApiError> {
    let Query(query) = query.map_err(ApiError::from_query)?;
    let quotes = engine
        .store
        .list_quotes(&QuoteFilter {
            sports_event_id: query.sports_event_id.map(SportsEventId::new),
            market_id: query.market_id.map(MarketId::new),
            limit: Some(query.limit.unwrap_or(DEFAULT_QUOTE_LIMIT)),
        })
        .await?;

    let market_ids: BTreeSet<MarketId> = quotes.iter().map(|q| q.market_id).collect();
    let mut markets: HashMap<MarketId, Market> = HashMap::with_capacity(market_ids.len());
    for id in market_ids {
        if let Some(market) = engine.store.get_market(id).await? {
            markets.insert(id, market);
        }
    }

    let views = quotes
        .into_iter()
        .map(|quote| {
            let event_outcome_label = markets
                .get(&quote.market_id)
                .map_or(quote.outcome_label, |m| m.event_label(quote.outcome_label));
            QuoteView {
                quote,
                event_outcome_label,
            }
        })
        .collect();
    Ok(Json(views))
}

#[derive(Debug, Deserialize)]
pub struct ArbQuery {
    pub min_roi: Option<Decimal>,
    pub status: Option<OpportunityStatus>,
    pub sports_event_id: Option<i64>,
    pub limit: Option<usize>,
}

pub async fn list_arbs(
    State(engine): State<Engine>,
    query: Result<Query<ArbQuery>, QueryRejection>,
) -> Result<Json<Vec<Opportunity>>, ApiError> {
    let Query(query) = query.map_err(ApiError::from_query)?;
    let opportunities = engine
        .store
        .list_opportunities(&OpportunityFilter {
            min_roi: query.min_roi,
            status: query.status,
            sports_event_id: query.sports_event_id.map(SportsEventId::new),
            limit: query.limit,
        })
        .await?;
    Ok(Json(opportunities))
}

pub async fn get_arb(
    State(engine): State<Engine>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Opportunity>, ApiError> {
    let Path(id) = id.map_err(ApiError::from_path)?;
    let id = OpportunityId::new(id);
    let opportunity = engine
        .store
        .get_opportunity(id)
        .await?
        .ok_or_else(|| DomainError::not_found("opportunity", id))?;
    Ok(Json(opportunity))
}

pub async fn close_arb(
    State(engine): State<Engine>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id.map_err(ApiError::from_path)?;
    engine
        .store
        .close_opportunity(OpportunityId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanRequest {
    /// Scan one event instead of every active event.
    pub sports_event_id: Option<i64>,
}

pub async fn scan(
    State(engine): State<Engine>,
    body: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanSummary>, ApiError> {
    let req = optional_json(body)?;
    let summary = match req.sports_event_id {
        Some(id) => engine.scanner.scan_event(SportsEventId::new(id)).await?,
        None => engine.scanner.scan_all().await?,
    };
    Ok(Json(summary))
}
