//! Quote observations and current-quote selection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{MarketId, QuoteId, VenueId};
use super::market::OutcomeLabel;
use super::price::{NormalizedPrice, PriceFormat};

/// An immutable price observation for one outcome of one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub market_id: MarketId,
    pub venue_id: VenueId,
    pub outcome_label: OutcomeLabel,
    pub observed_at: DateTime<Utc>,
    pub raw_price: Decimal,
    pub price_format: PriceFormat,
    #[serde(flatten)]
    pub price: NormalizedPrice,
}

impl Quote {
    fn pair(&self) -> (VenueId, MarketId, OutcomeLabel) {
        (self.venue_id.clone(), self.market_id, self.outcome_label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuote {
    pub market_id: MarketId,
    pub venue_id: VenueId,
    pub outcome_label: OutcomeLabel,
    pub observed_at: DateTime<Utc>,
    pub raw_price: Decimal,
    pub price_format: PriceFormat,
    pub price: NormalizedPrice,
}

impl NewQuote {
    #[must_use]
    pub fn into_quote(self, id: QuoteId) -> Quote {
        Quote {
            id,
            market_id: self.market_id,
            venue_id: self.venue_id,
            outcome_label: self.outcome_label,
            observed_at: self.observed_at,
            raw_price: self.raw_price,
            price_format: self.price_format,
            price: self.price,
        }
    }
}

/// How to pick between quotes for the same pair sharing a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSelectionPolicy {
    /// The quote furthest from the pair's previous (older) quote.
    #[default]
    LargestPriceChange,
    /// The quote with the highest share price.
    HighestPrice,
    /// The most recently recorded quote.
    LatestId,
}

/// Pick the current quote per (venue, market, outcome): the latest observed
/// strictly before `before`, ties broken by `policy`, then by id.
///
/// Output is ordered by quote id.
#[must_use]
pub fn select_current(
    quotes: &[Quote],
    before: DateTime<Utc>,
    policy: QuoteSelectionPolicy,
) -> Vec<Quote> {
    let mut by_pair: HashMap<(VenueId, MarketId, OutcomeLabel), Vec<&Quote>> = HashMap::new();
    for quote in quotes.iter().filter(|q| q.observed_at < before) {
        by_pair.entry(quote.pair()).or_default().push(quote);
    }

    let mut selected: Vec<Quote> = by_pair
        .into_values()
        .filter_map(|history| pick(&history, policy).cloned())
        .collect();
    selected.sort_by_key(|q| q.id);
    selected
}

fn pick<'a>(history: &[&'a Quote], policy: QuoteSelectionPolicy) -> Option<&'a Quote> {
    let latest_ts = history.iter().map(|q| q.observed_at).max()?;
    let tied: Vec<&Quote> = history
        .iter()
        .copied()
        .filter(|q| q.observed_at == latest_ts)
        .collect();
    if tied.len() == 1 {
        return tied.first().copied();
    }

    match policy {
        QuoteSelectionPolicy::LatestId => tied.into_iter().max_by_key(|q| q.id),
        QuoteSelectionPolicy::HighestPrice => tied
            .into_iter()
            .max_by(|a, b| (a.price.share_price, a.id).cmp(&(b.price.share_price, b.id))),
        QuoteSelectionPolicy::LargestPriceChange => {
            let previous = history
                .iter()
                .filter(|q| q.observed_at < latest_ts)
                .max_by_key(|q| (q.observed_at, q.id))
                .map(|q| q.price.share_price);
            tied.into_iter().max_by(|a, b| {
                let change = |q: &Quote| {
                    previous.map_or(Decimal::ZERO, |p| (q.price.share_price - p).abs())
                };
                (change(*a), a.id).cmp(&(change(*b), b.id))
            })
        }
    }
}
