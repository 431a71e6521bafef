//! Route table.

use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{arbitrage, event, ingest, mapping};
use crate::application::Engine;

/// Build the API router over an assembled engine.
pub fn router(engine: Engine) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/sports-events",
            get(event::list_events).post(event::create_event),
        )
        .route("/sports-events/:id", get(event::get_event))
        .route("/sports-events/:id/status", post(event::update_event_status))
        .route("/markets", get(event::list_markets))
        .route("/mapping-candidates", get(mapping::list_candidates))
        .route("/mapping-candidates/suggest", post(mapping::suggest))
        .route("/mapping-candidates/:id/accept", post(mapping::accept))
        .route("/mapping-candidates/:id/reject", post(mapping::reject))
        .route("/quotes", get(arbitrage::list_quotes))
        .route("/arbs", get(arbitrage::list_arbs))
        .route("/arbs/scan", post(arbitrage::scan))
        .route("/arbs/:id", get(arbitrage::get_arb))
        .route("/arbs/:id/close", post(arbitrage::close_arb))
        .route("/ingest", post(ingest::ingest_all))
        .route("/ingest/:venue", post(ingest::ingest_markets))
        .route("/ingest/:venue/quotes", post(ingest::ingest_quotes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
