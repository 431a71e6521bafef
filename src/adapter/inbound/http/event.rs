//! Sports event and market handlers.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::application::Engine;
use crate::domain::{
    DomainError, EventSource, EventStatus, Market, NewSportsEvent, SportsEvent, SportsEventId,
    VenueId,
};
use crate::port::outbound::store::{EventFilter, MarketFilter};

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    pub sport: Option<String>,
    #[serde(default)]
    pub active_only: bool,
}

pub async fn list_events(
    State(engine): State<Engine>,
    query: Result<Query<EventQuery>, QueryRejection>,
) -> Result<Json<Vec<SportsEvent>>, ApiError> {
    let Query(query) = query.map_err(ApiError::from_query)?;
    let events = engine
        .store
        .list_events(&EventFilter {
            sport: query.sport,
            active_only: query.active_only,
            starts_between: None,
        })
        .await?;
    Ok(Json(events))
}

#[derive(Debug, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: SportsEvent,
    pub markets: Vec<Market>,
}

pub async fn get_event(
    State(engine): State<Engine>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<EventDetail>, ApiError> {
    let Path(id) = id.map_err(ApiError::from_path)?;
    let id = SportsEventId::new(id);
    let event = engine
        .store
        .get_event(id)
        .await?
        .ok_or_else(|| DomainError::not_found("sports event", id))?;
    let markets = engine
        .store
        .list_markets(&MarketFilter {
            sports_event_id: Some(id),
            ..MarketFilter::default()
        })
        .await?;
    Ok(Json(EventDetail { event, markets }))
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub sport: String,
    pub league: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
    pub external_ref: Option<String>,
    pub canonical_name: Option<String>,
}

/// 201 with the new event, or 200 with the active duplicate.
pub async fn create_event(
    State(engine): State<Engine>,
    body: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SportsEvent>), ApiError> {
    let Json(req) = body.map_err(ApiError::from_json)?;
    if req.sport.trim().is_empty() || req.home_team.trim().is_empty() || req.away_team.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "sport, home_team and away_team must not be empty".into(),
        ));
    }

    let mut event = NewSportsEvent::new(
        req.sport.trim(),
        req.home_team.trim(),
        req.away_team.trim(),
        req.start_time,
        EventSource::Manual,
    );
    if let Some(league) = req.league {
        event = event.with_league(league);
    }
    if let Some(external_ref) = req.external_ref {
        event = event.with_external_ref(external_ref);
    }
    if let Some(name) = req.canonical_name {
        event = event.with_canonical_name(name);
    }

    let (event, inserted) = engine.events.create(event).await?;
    let status = if inserted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(event)))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: EventStatus,
}

pub async fn update_event_status(
    State(engine): State<Engine>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id.map_err(ApiError::from_path)?;
    let Json(req) = body.map_err(ApiError::from_json)?;
    engine
        .events
        .update_status(SportsEventId::new(id), req.status)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct MarketQuery {
    pub sport: Option<String>,
    pub venue_id: Option<String>,
    #[serde(default)]
    pub unmapped: bool,
    pub limit: Option<usize>,
}

pub async fn list_markets(
    State(engine): State<Engine>,
    query: Result<Query<MarketQuery>, QueryRejection>,
) -> Result<Json<Vec<Market>>, ApiError> {
    let Query(query) = query.map_err(ApiError::from_query)?;
    let markets = engine
        .store
        .list_markets(&MarketFilter {
            sport: query.sport,
            venue_id: query.venue_id.map(VenueId::new),
            sports_event_id: None,
            unmapped_only: query.unmapped,
            limit: query.limit,
        })
        .await?;
    Ok(Json(markets))
}
