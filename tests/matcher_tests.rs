//! Ingestion, matching and review flows across both store backends.

mod support;

use std::sync::Arc;

use chrono::Duration;
use linesman::adapter::outbound::memory::MemoryStore;
use linesman::application::arbitrage::ArbitrageConfig;
use linesman::application::ingestion::IngestionService;
use linesman::application::matcher::MatcherConfig;
use linesman::application::Engine;
use linesman::domain::{
    CandidateStatus, FeatureSet, FeeModel, MarketType, NewMappingCandidate, ParsedHints, PriceFormat,
};
use linesman::error::ErrorKind;
use linesman::port::outbound::store::{CandidateFilter, MarketFilter, Store};
use linesman::port::outbound::venue::{VenueMarket, VenueQuote};
use linesman::testkit::domain::{event_at, market_with_hints, tip_off};
use linesman::testkit::venue::StaticFeed;
use rust_decimal_macros::dec;

use support::temp_db::TempDb;

fn moneyline(key: &str) -> VenueMarket {
    VenueMarket {
        venue_market_key: key.to_string(),
        question: "Suns at Thunder".to_string(),
        market_type: Some(MarketType::Moneyline),
        status: "open".to_string(),
        hints: ParsedHints {
            sport: Some("NBA".to_string()),
            home_team: Some("Thunder".to_string()),
            away_team: Some("Suns".to_string()),
            start_time: Some(tip_off()),
            ..ParsedHints::default()
        },
        outcome_names: vec!["Thunder".to_string(), "Suns".to_string()],
        expires_at: None,
        event_ref: None,
    }
}

fn venue_quote(key: &str, index: usize, raw: rust_decimal::Decimal, format: PriceFormat) -> VenueQuote {
    VenueQuote {
        venue_market_key: key.to_string(),
        outcome_index: index,
        raw_price: raw,
        price_format: format,
        observed_at: chrono::Utc::now(),
    }
}

fn engine_with_feeds(store: Arc<dyn Store>) -> Engine {
    let kalshi = StaticFeed::new("kalshi")
        .with_markets(vec![moneyline("KXNBAGAME-25DEC09PHXOKC-OKC")])
        .with_quotes(vec![venue_quote(
            "KXNBAGAME-25DEC09PHXOKC-OKC",
            0,
            dec!(55),
            PriceFormat::Cents,
        )]);
    let polymarket = StaticFeed::new("polymarket")
        .with_markets(vec![moneyline("nba-phx-okc-2025-12-09")])
        .with_quotes(vec![venue_quote(
            "nba-phx-okc-2025-12-09",
            1,
            dec!(0.40),
            PriceFormat::Probability,
        )]);
    let ingestion = IngestionService::new(store.clone(), Duration::minutes(90))
        .with_feed(Arc::new(kalshi), FeeModel::None)
        .with_feed(Arc::new(polymarket), FeeModel::None);
    Engine::new(
        store,
        MatcherConfig::default(),
        ArbitrageConfig::default(),
        ingestion,
    )
}

async fn ingest_match_and_scan(store: Arc<dyn Store>) {
    let engine = engine_with_feeds(store.clone());
    engine
        .events
        .create(event_at("NBA", "Thunder", "Suns", tip_off()))
        .await
        .unwrap();

    let reports = engine.ingestion.ingest_all(false).await;
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.error.is_none()));

    let summary = engine.matcher.suggest(None, None).await.unwrap();
    assert_eq!(summary.markets_scanned, 2);
    assert_eq!(summary.candidates_created, 2);

    let pending = store
        .list_candidates(&CandidateFilter {
            status: Some(CandidateStatus::Pending),
            ..CandidateFilter::default()
        })
        .await
        .unwrap();
    for candidate in &pending {
        assert!(candidate.confidence > 0.8, "{candidate:?}");
        engine.matcher.accept(candidate.id).await.unwrap();
    }

    let unmapped = store
        .list_markets(&MarketFilter {
            unmapped_only: true,
            ..MarketFilter::default()
        })
        .await
        .unwrap();
    assert!(unmapped.is_empty());

    for venue in engine.ingestion.venue_ids() {
        let summary = engine.ingestion.ingest_quotes(&venue).await.unwrap();
        assert_eq!(summary.quotes_recorded, 1);
    }

    let scan = engine.scanner.scan_all().await.unwrap();
    assert_eq!(scan.created, 1);
}

#[tokio::test]
async fn ingest_match_and_scan_memory() {
    ingest_match_and_scan(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn ingest_match_and_scan_sqlite() {
    let db = TempDb::create("flow");
    ingest_match_and_scan(db.store()).await;
}

async fn concurrent_accepts_have_one_winner(store: Arc<dyn Store>) {
    let (first, _) = store
        .create_event(event_at("NBA", "Thunder", "Suns", tip_off()), Duration::zero())
        .await
        .unwrap();
    let (second, _) = store
        .create_event(
            event_at("NBA", "Thunder", "Suns", tip_off() + Duration::days(3)),
            Duration::zero(),
        )
        .await
        .unwrap();
    let market = store
        .upsert_market(market_with_hints("kalshi", "KX-OKC", "NBA", "Thunder", "Suns"))
        .await
        .unwrap();

    let mut ids = Vec::new();
    for event in [&first, &second] {
        let candidate = store
            .insert_candidate(NewMappingCandidate {
                market_id: market.id,
                sports_event_id: event.id,
                confidence: 0.9,
                features: FeatureSet::new(Vec::new()),
            })
            .await
            .unwrap()
            .unwrap();
        ids.push(candidate.id);
    }

    let now = chrono::Utc::now();
    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let store = store.clone();
            tokio::spawn(async move { store.accept_candidate(id, now).await })
        })
        .collect();

    let mut accepted = 0;
    let mut resolved = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::AlreadyResolved, "{e}");
                resolved += 1;
            }
        }
    }
    assert_eq!((accepted, resolved), (1, 1));

    let market = store.get_market(market.id).await.unwrap().unwrap();
    assert!(market.sports_event_id == Some(first.id) || market.sports_event_id == Some(second.id));
}

#[tokio::test]
async fn concurrent_accepts_memory() {
    concurrent_accepts_have_one_winner(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn concurrent_accepts_sqlite() {
    let db = TempDb::create("accept-race");
    concurrent_accepts_have_one_winner(db.store()).await;
}

#[tokio::test]
async fn failing_venue_does_not_block_others() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let ingestion = IngestionService::new(store.clone(), Duration::minutes(90))
        .with_feed(Arc::new(StaticFeed::new("kalshi").failing()), FeeModel::None)
        .with_feed(
            Arc::new(StaticFeed::new("polymarket").with_markets(vec![moneyline("okc")])),
            FeeModel::None,
        );

    let reports = ingestion.ingest_all(false).await;
    let kalshi = reports.iter().find(|r| r.venue_id.as_str() == "kalshi").unwrap();
    let poly = reports
        .iter()
        .find(|r| r.venue_id.as_str() == "polymarket")
        .unwrap();
    assert!(kalshi.error.is_some());
    assert_eq!(poly.summary.unwrap().markets_upserted, 1);
}

#[tokio::test]
async fn unparseable_market_gets_zero_confidence_candidate() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let engine = engine_with_feeds(store.clone());
    engine
        .events
        .create(event_at("NBA", "Thunder", "Suns", tip_off()))
        .await
        .unwrap();

    let mut market = market_with_hints("kalshi", "KX-MYSTERY", "NBA", "Thunder", "Suns");
    market.hints.home_team = None;
    market.hints.away_team = None;
    market.question = "NBA: who wins tonight?".to_string();
    store.upsert_market(market).await.unwrap();

    engine.matcher.suggest(None, None).await.unwrap();
    let candidates = store
        .list_candidates(&CandidateFilter::default())
        .await
        .unwrap();
    assert_eq!(candidates.len(), 1);
    assert!(candidates[0].confidence.abs() < f64::EPSILON);
}
