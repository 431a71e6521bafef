//! Builders for domain primitives used across tests.
//!
//! Factory functions keep tests focused on assertions rather than on
//! constructing events, markets and quotes field by field.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::market::proposition_key;
use crate::domain::{
    normalize, ArbLeg, EventSource, GroupKey, Market, MarketId, MarketStatus, MarketType,
    NewMarket, NewOpportunity, NewQuote, NewSportsEvent, OutcomeGroup, OutcomeLabel, ParsedHints,
    PriceFormat, Quote, QuoteId, SportsEvent, SportsEventId, VenueId,
};
use crate::port::outbound::store::Store;

/// Fixed kickoff used throughout the tests: 2025-12-10 00:00 UTC.
pub fn tip_off() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 10, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A manually created event.
pub fn event_at(sport: &str, home: &str, away: &str, start: DateTime<Utc>) -> NewSportsEvent {
    NewSportsEvent::new(sport, home, away, start, EventSource::Manual)
}

/// An open moneyline market with parsed hints and home/away outcomes.
pub fn market_with_hints(venue: &str, key: &str, sport: &str, home: &str, away: &str) -> NewMarket {
    NewMarket {
        venue_id: VenueId::new(venue),
        venue_market_key: key.to_string(),
        market_type: MarketType::Moneyline,
        question: format!("{sport}: {away} @ {home}"),
        status: MarketStatus::Open,
        hints: ParsedHints {
            sport: Some(sport.to_ascii_uppercase()),
            league: None,
            home_team: Some(home.to_string()),
            away_team: Some(away.to_string()),
            start_time: Some(tip_off()),
        },
        outcomes: vec![OutcomeLabel::HomeWin, OutcomeLabel::AwayWin],
        expires_at: None,
        event_ref: None,
    }
}

/// Question shared by [`binary_market`] listings, so venues pair up.
pub const BINARY_QUESTION: &str = "Will the Thunder beat the Suns?";

/// An open yes/no market.
pub fn binary_market(venue: &str, key: &str) -> NewMarket {
    NewMarket {
        venue_id: VenueId::new(venue),
        venue_market_key: key.to_string(),
        market_type: MarketType::Binary,
        question: BINARY_QUESTION.to_string(),
        status: MarketStatus::Open,
        hints: ParsedHints {
            sport: Some("NBA".to_string()),
            home_team: Some("Thunder".to_string()),
            away_team: Some("Suns".to_string()),
            start_time: Some(tip_off()),
            ..ParsedHints::default()
        },
        outcomes: vec![OutcomeLabel::Yes, OutcomeLabel::No],
        expires_at: None,
        event_ref: None,
    }
}

/// The upsert payload that reproduces a stored market.
pub fn new_market_from(market: &Market) -> NewMarket {
    NewMarket {
        venue_id: market.venue_id.clone(),
        venue_market_key: market.venue_market_key.clone(),
        market_type: market.market_type,
        question: market.question.clone(),
        status: market.status,
        hints: market.hints.clone(),
        outcomes: market.outcomes.clone(),
        expires_at: market.expires_at,
        event_ref: market.event_ref.clone(),
    }
}

/// A quote in probability format, observed at [`tip_off`].
///
/// # Panics
/// If `price` is not strictly between 0 and 1.
pub fn quote(id: QuoteId, venue: &str, market_id: i64, label: OutcomeLabel, price: Decimal) -> Quote {
    NewQuote {
        market_id: MarketId::new(market_id),
        venue_id: VenueId::new(venue),
        outcome_label: label,
        observed_at: tip_off(),
        raw_price: price,
        price_format: PriceFormat::Probability,
        price: normalize(price, PriceFormat::Probability).unwrap(),
    }
    .into_quote(id)
}

/// A valid two-leg yes/no opportunity on the [`binary_market`] proposition.
/// Different `variant`s give different fingerprints for the same group.
pub fn opportunity_for(event: SportsEventId, variant: i64) -> NewOpportunity {
    let leg = |venue: &str, market: i64, label, quote| ArbLeg {
        venue_id: VenueId::new(venue),
        market_id: MarketId::new(market),
        outcome_label: label,
        stake_shares: Decimal::from(100),
        stake: Decimal::from(50),
        share_price: Decimal::new(5, 1),
        win_pnl_per_share: Decimal::new(5, 1),
        lose_pnl_per_share: Decimal::new(-5, 1),
        source_quote_id: Some(QuoteId::new(quote)),
    };
    NewOpportunity::builder()
        .key(GroupKey::new(
            event,
            MarketType::Binary,
            proposition_key(MarketType::Binary, BINARY_QUESTION),
            OutcomeGroup::YesNo,
        ))
        .detected_at(Utc::now())
        .leg(leg("kalshi", 1, OutcomeLabel::Yes, variant * 10))
        .leg(leg("polymarket", 2, OutcomeLabel::No, variant * 10 + 1))
        .pnl(Decimal::from(5), Decimal::from(5))
        .build()
        .unwrap()
}

/// Seed an NBA event with one linked yes/no market on each of two venues.
///
/// Returns `(event, kalshi market, polymarket market)`.
pub async fn seed_binary_event<S>(store: &Arc<S>) -> (SportsEvent, Market, Market)
where
    S: Store + ?Sized,
{
    let (event, _) = store
        .create_event(
            event_at("NBA", "Thunder", "Suns", tip_off()),
            chrono::Duration::zero(),
        )
        .await
        .unwrap();
    let mut linked = Vec::new();
    for (venue, key) in [("kalshi", "KXNBA-OKC"), ("polymarket", "okc-phx")] {
        let market = store.upsert_market(binary_market(venue, key)).await.unwrap();
        linked.push(store.link_market(market.id, event.id).await.unwrap());
    }
    let poly = linked.pop().unwrap();
    let kalshi = linked.pop().unwrap();
    (event, kalshi, poly)
}

/// Record a probability-format quote for `market`, observed now.
pub async fn seed_quote<S>(store: &Arc<S>, market: &Market, label: OutcomeLabel, price: Decimal) -> Quote
where
    S: Store + ?Sized,
{
    store
        .insert_quote(NewQuote {
            market_id: market.id,
            venue_id: market.venue_id.clone(),
            outcome_label: label,
            observed_at: Utc::now(),
            raw_price: price,
            price_format: PriceFormat::Probability,
            price: normalize(price, PriceFormat::Probability).unwrap(),
        })
        .await
        .unwrap()
}
