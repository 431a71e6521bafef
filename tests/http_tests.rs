//! HTTP API over the in-memory store.

mod support;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use linesman::adapter::inbound::http::router;
use linesman::adapter::outbound::memory::MemoryStore;
use linesman::domain::OutcomeLabel;
use linesman::port::outbound::store::Store;
use linesman::testkit::domain::{seed_binary_event, seed_quote};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use support::engine::offline_engine;

fn app() -> (Router, Arc<dyn Store>) {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    (router(offline_engine(store.clone())), store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn thunder_suns() -> Value {
    json!({
        "sport": "nba",
        "home_team": "Thunder",
        "away_team": "Suns",
        "start_time": "2025-12-10T00:00:00Z",
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn create_event_then_duplicate() {
    let (app, _) = app();
    let (status, created) = send(&app, "POST", "/sports-events", Some(thunder_suns())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["sport"], "NBA");

    let (status, again) = send(&app, "POST", "/sports-events", Some(thunder_suns())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["id"], created["id"]);

    let (status, list) = send(&app, "GET", "/sports-events?sport=NBA", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn event_detail_includes_markets() {
    let (app, store) = app();
    let (event, _, _) = seed_binary_event(&store).await;

    let (status, body) = send(&app, "GET", &format!("/sports-events/{}", event.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["markets"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn missing_event_is_not_found() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/sports-events/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "NotFound");
}

#[tokio::test]
async fn backward_status_is_conflict() {
    let (app, _) = app();
    let (_, created) = send(&app, "POST", "/sports-events", Some(thunder_suns())).await;
    let uri = format!("/sports-events/{}/status", created["id"]);

    let (status, _) = send(&app, "POST", &uri, Some(json!({ "status": "live" }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "status": "scheduled" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "InvalidStatusTransition");
}

#[tokio::test]
async fn malformed_query_is_bad_request() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/arbs?min_roi=lots", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "InvalidInput");
}

#[tokio::test]
async fn scan_list_get_and_close() {
    let (app, store) = app();
    let (event, kalshi, poly) = seed_binary_event(&store).await;
    seed_quote(&store, &kalshi, OutcomeLabel::Yes, dec!(0.55)).await;
    seed_quote(&store, &poly, OutcomeLabel::No, dec!(0.40)).await;

    let (status, summary) = send(
        &app,
        "POST",
        "/arbs/scan",
        Some(json!({ "sports_event_id": event.id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["created"], 1);

    let (_, arbs) = send(&app, "GET", "/arbs?status=active&min_roi=0.05", None).await;
    let arbs = arbs.as_array().unwrap();
    assert_eq!(arbs.len(), 1);
    let id = arbs[0]["id"].clone();

    let (status, detail) = send(&app, "GET", &format!("/arbs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["legs"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "POST", &format!("/arbs/{id}/close"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "POST", &format!("/arbs/{id}/close"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, active) = send(&app, "GET", "/arbs?status=active", None).await;
    assert!(active.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn scan_without_body_scans_everything() {
    let (app, store) = app();
    seed_binary_event(&store).await;
    let (status, summary) = send(&app, "POST", "/arbs/scan", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["events_scanned"], 1);
}

#[tokio::test]
async fn malformed_scan_body_is_bad_request() {
    let (app, store) = app();
    seed_binary_event(&store).await;
    let (status, body) = send(
        &app,
        "POST",
        "/arbs/scan",
        Some(json!({ "sports_event_id": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "InvalidInput");
}

#[tokio::test]
async fn malformed_suggest_body_is_bad_request() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/mapping-candidates/suggest",
        Some(json!({ "limit": -3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "InvalidInput");
}

#[tokio::test]
async fn quotes_show_the_event_side_label() {
    let (app, store) = app();
    let (event, _) = store
        .create_event(
            linesman::testkit::domain::event_at(
                "NBA",
                "Thunder",
                "Suns",
                linesman::testkit::domain::tip_off(),
            ),
            chrono::Duration::zero(),
        )
        .await
        .unwrap();
    let market = store
        .upsert_market(linesman::testkit::domain::market_with_hints(
            "polymarket", "p1", "NBA", "Suns", "Thunder",
        ))
        .await
        .unwrap();
    let candidate = store
        .insert_candidate(linesman::domain::NewMappingCandidate {
            market_id: market.id,
            sports_event_id: event.id,
            confidence: 0.95,
            features: linesman::domain::FeatureSet::new(vec![
                linesman::domain::MatchFeature::TeamSimilarity {
                    score: 1.0,
                    swapped: true,
                },
            ]),
        })
        .await
        .unwrap()
        .unwrap();
    let uri = format!("/mapping-candidates/{}/accept", candidate.id);
    let (status, _) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    seed_quote(&store, &market, OutcomeLabel::HomeWin, dec!(0.40)).await;

    let (status, quotes) = send(&app, "GET", &format!("/quotes?market_id={}", market.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quotes[0]["outcome_label"], "home_win");
    assert_eq!(quotes[0]["event_outcome_label"], "away_win");
}

#[tokio::test]
async fn quotes_are_listed_newest_first() {
    let (app, store) = app();
    let (_, kalshi, _) = seed_binary_event(&store).await;
    seed_quote(&store, &kalshi, OutcomeLabel::Yes, dec!(0.55)).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    seed_quote(&store, &kalshi, OutcomeLabel::Yes, dec!(0.57)).await;

    let (status, quotes) = send(
        &app,
        "GET",
        &format!("/quotes?market_id={}&limit=1", kalshi.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let quotes = quotes.as_array().unwrap();
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0]["raw_price"], "0.57");
}

#[tokio::test]
async fn suggest_accept_and_double_accept() {
    let (app, store) = app();
    send(&app, "POST", "/sports-events", Some(thunder_suns())).await;
    store
        .upsert_market(linesman::testkit::domain::market_with_hints(
            "kalshi", "KX-OKC", "NBA", "Thunder", "Suns",
        ))
        .await
        .unwrap();

    let (status, summary) = send(&app, "POST", "/mapping-candidates/suggest", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["candidates_created"], 1);

    let (_, pending) = send(&app, "GET", "/mapping-candidates?status=pending&limit=10", None).await;
    let id = pending[0]["id"].clone();

    let uri = format!("/mapping-candidates/{id}/accept");
    let (status, accepted) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["candidate"]["status"], "accepted");
    assert!(accepted["market"]["sports_event_id"].is_number());

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "InvalidState");

    let (_, unmapped) = send(&app, "GET", "/markets?unmapped=true", None).await;
    assert!(unmapped.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unconfigured_venue_is_not_found() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/ingest/betfair", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "UnknownVenue");

    let (status, reports) = send(&app, "POST", "/ingest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(reports.as_array().unwrap().is_empty());
}
