//! Venue ingestion handlers.

use axum::extract::{Path, State};
use axum::response::Json;

use super::error::ApiError;
use crate::application::ingestion::{IngestSummary, VenueReport};
use crate::application::Engine;
use crate::domain::VenueId;

pub async fn ingest_markets(
    State(engine): State<Engine>,
    Path(venue): Path<String>,
) -> Result<Json<IngestSummary>, ApiError> {
    let summary = engine
        .ingestion
        .ingest_markets(&VenueId::new(venue))
        .await?;
    Ok(Json(summary))
}

pub async fn ingest_quotes(
    State(engine): State<Engine>,
    Path(venue): Path<String>,
) -> Result<Json<IngestSummary>, ApiError> {
    let summary = engine.ingestion.ingest_quotes(&VenueId::new(venue)).await?;
    Ok(Json(summary))
}

/// Markets and quotes for every configured venue. Per-venue failures are
/// reported inline.
pub async fn ingest_all(State(engine): State<Engine>) -> Json<Vec<VenueReport>> {
    Json(engine.ingestion.ingest_all(true).await)
}
