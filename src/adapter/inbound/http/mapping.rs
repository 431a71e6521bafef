//! Mapping candidate handlers.

use std::time::{Duration, Instant};

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use super::error::{optional_json, ApiError};
use crate::application::matcher::SuggestSummary;
use crate::application::Engine;
use crate::domain::{CandidateId, CandidateStatus, MappingCandidate, Market, MarketId};
use crate::port::outbound::store::CandidateFilter;

#[derive(Debug, Deserialize)]
pub struct CandidateQuery {
    pub status: Option<CandidateStatus>,
    pub market_id: Option<i64>,
    pub limit: Option<usize>,
}

pub async fn list_candidates(
    State(engine): State<Engine>,
    query: Result<Query<CandidateQuery>, QueryRejection>,
) -> Result<Json<Vec<MappingCandidate>>, ApiError> {
    let Query(query) = query.map_err(ApiError::from_query)?;
    let candidates = engine
        .store
        .list_candidates(&CandidateFilter {
            status: query.status,
            market_id: query.market_id.map(MarketId::new),
            limit: query.limit,
        })
        .await?;
    Ok(Json(candidates))
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestRequest {
    /// Markets to examine; the configured batch limit when absent.
    pub limit: Option<usize>,
    /// Stop starting new markets after this many milliseconds.
    pub timeout_ms: Option<u64>,
}

pub async fn suggest(
    State(engine): State<Engine>,
    body: Result<Json<SuggestRequest>, JsonRejection>,
) -> Result<Json<SuggestSummary>, ApiError> {
    let req = optional_json(body)?;
    let deadline = req
        .timeout_ms
        .map(|ms| Instant::now() + Duration::from_millis(ms));
    let summary = engine.matcher.suggest(req.limit, deadline).await?;
    Ok(Json(summary))
}

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub candidate: MappingCandidate,
    pub market: Market,
}

pub async fn accept(
    State(engine): State<Engine>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<AcceptResponse>, ApiError> {
    let Path(id) = id.map_err(ApiError::from_path)?;
    let (candidate, market) = engine.matcher.accept(CandidateId::new(id)).await?;
    Ok(Json(AcceptResponse { candidate, market }))
}

pub async fn reject(
    State(engine): State<Engine>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MappingCandidate>, ApiError> {
    let Path(id) = id.map_err(ApiError::from_path)?;
    let candidate = engine.matcher.reject(CandidateId::new(id)).await?;
    Ok(Json(candidate))
}
