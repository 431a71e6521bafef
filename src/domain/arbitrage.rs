//! Cross-venue arbitrage solver.
//!
//! For each outcome `i` of a group, let `c_i = -lose_i` be the cash paid per
//! share and `g_i = win_i - lose_i` the cash returned per share on a win.
//! Backing every outcome is a sure profit iff `sum(c_i / g_i) < 1`. Shares
//! `n_i = K / g_i` with `K = budget / sum(c_i / g_i)` pay exactly `K` whichever
//! outcome occurs, for a total outlay of `budget`. After rounding shares to
//! the venue lot size, each outcome's PnL is recomputed exactly.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{MarketId, QuoteId, VenueId};
use super::market::{OutcomeGroup, OutcomeLabel};
use super::opportunity::{ArbLeg, GroupKey, NewOpportunity};
use super::price::NormalizedPrice;
use crate::error::ErrorKind;

/// A priced outcome available for an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegQuote {
    pub venue_id: VenueId,
    pub market_id: MarketId,
    pub outcome_label: OutcomeLabel,
    pub price: NormalizedPrice,
    pub quote_id: Option<QuoteId>,
}

impl LegQuote {
    /// Cost per unit of guaranteed payout, `c / g`. Lower is cheaper.
    #[must_use]
    pub fn implied_cost(&self) -> Option<Decimal> {
        let gross = self.price.gross_return();
        let cost = self.price.effective_cost();
        if gross <= Decimal::ZERO || cost <= Decimal::ZERO {
            return None;
        }
        Some(cost / gross)
    }
}

/// Solver thresholds and granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Shares are rounded to a multiple of this. Zero disables rounding.
    #[serde(default = "default_share_lot")]
    pub share_lot: Decimal,
    #[serde(default = "default_min_worst_case_roi")]
    pub min_worst_case_roi: Decimal,
    #[serde(default = "default_min_total_stake")]
    pub min_total_stake: Decimal,
}

fn default_share_lot() -> Decimal {
    Decimal::ONE
}

fn default_min_worst_case_roi() -> Decimal {
    dec!(0.005)
}

fn default_min_total_stake() -> Decimal {
    dec!(10)
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            share_lot: default_share_lot(),
            min_worst_case_roi: default_min_worst_case_roi(),
            min_total_stake: default_min_total_stake(),
        }
    }
}

/// Why a group did not yield an opportunity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NoOpportunity {
    #[error("no arbitrage: implied costs sum to {implied_sum}")]
    NoArbitrage { implied_sum: Decimal },

    #[error("legs span {venues} venue(s); at least 2 are required")]
    InsufficientVenues { venues: usize },

    #[error("no quote for outcome(s) {missing:?}")]
    IncompleteGroup { missing: Vec<OutcomeLabel> },

    #[error("below threshold: {reason}")]
    BelowThreshold { reason: String },
}

impl NoOpportunity {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoArbitrage { .. } => ErrorKind::NoArbitrage,
            Self::InsufficientVenues { .. } => ErrorKind::InsufficientVenues,
            Self::IncompleteGroup { .. } => ErrorKind::IncompleteGroup,
            Self::BelowThreshold { .. } => ErrorKind::BelowThreshold,
        }
    }
}

/// Shares per leg and the resulting PnL for each outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Shares, aligned with the input legs.
    pub shares: Vec<Decimal>,
    /// PnL if outcome `i` occurs, aligned with the input legs.
    pub outcome_pnl: Vec<Decimal>,
    pub total_stake: Decimal,
    pub worst_case_pnl: Decimal,
    pub best_case_pnl: Decimal,
    pub worst_case_roi: Decimal,
}

/// Choose the cheapest quote for each label of `group`.
///
/// When the cheapest quotes all sit on one venue, the cheapest mix that
/// spans at least two venues is taken instead. If no such mix exists the
/// single-venue picks are returned and [`solve`] rejects them.
///
/// # Errors
/// `IncompleteGroup` when a label has no usable quote.
pub fn select_best_legs(
    group: OutcomeGroup,
    candidates: &[LegQuote],
) -> Result<Vec<LegQuote>, NoOpportunity> {
    let mut options = Vec::with_capacity(group.labels().len());
    let mut missing = Vec::new();
    for label in group.labels() {
        let mut by_venue: BTreeMap<&VenueId, (Decimal, &LegQuote)> = BTreeMap::new();
        for candidate in candidates.iter().filter(|c| c.outcome_label == *label) {
            let Some(cost) = candidate.implied_cost() else {
                continue;
            };
            let entry = by_venue
                .entry(&candidate.venue_id)
                .or_insert((cost, candidate));
            if cost < entry.0 {
                *entry = (cost, candidate);
            }
        }
        if by_venue.is_empty() {
            missing.push(*label);
        }
        options.push(by_venue.into_values().collect::<Vec<_>>());
    }
    if !missing.is_empty() {
        return Err(NoOpportunity::IncompleteGroup { missing });
    }

    let cheapest: Vec<usize> = options
        .iter()
        .map(|per_venue| {
            per_venue
                .iter()
                .enumerate()
                .min_by(|(_, (a, _)), (_, (b, _))| a.cmp(b))
                .map_or(0, |(i, _)| i)
        })
        .collect();
    let picks = if venue_count(&options, &cheapest) >= 2 {
        cheapest
    } else {
        cheapest_cross_venue(&options).unwrap_or(cheapest)
    };
    Ok(picks
        .iter()
        .zip(&options)
        .map(|(&i, per_venue)| per_venue[i].1.clone())
        .collect())
}

fn venue_count(options: &[Vec<(Decimal, &LegQuote)>], picks: &[usize]) -> usize {
    picks
        .iter()
        .zip(options)
        .map(|(&i, per_venue)| &per_venue[i].1.venue_id)
        .collect::<HashSet<_>>()
        .len()
}

/// Walk every per-venue combination and keep the cheapest one on two or
/// more venues. Each label has at most one option per venue.
fn cheapest_cross_venue(options: &[Vec<(Decimal, &LegQuote)>]) -> Option<Vec<usize>> {
    let mut best: Option<(Decimal, Vec<usize>)> = None;
    let mut picks = vec![0; options.len()];
    loop {
        if venue_count(options, &picks) >= 2 {
            let sum: Decimal = picks
                .iter()
                .zip(options)
                .map(|(&i, per_venue)| per_venue[i].0)
                .sum();
            if best.as_ref().map_or(true, |(lowest, _)| sum < *lowest) {
                best = Some((sum, picks.clone()));
            }
        }

        let mut slot = 0;
        loop {
            if slot == picks.len() {
                return best.map(|(_, picks)| picks);
            }
            picks[slot] += 1;
            if picks[slot] < options[slot].len() {
                break;
            }
            picks[slot] = 0;
            slot += 1;
        }
    }
}

/// Allocate `budget` across `legs`, one leg per mutually exclusive outcome.
///
/// # Errors
/// `NoArbitrage` when implied costs sum to 1 or more, `InsufficientVenues`
/// when every leg is on one venue, `BelowThreshold` when the rounded worst
/// case misses the configured minimums.
pub fn solve(
    legs: &[LegQuote],
    budget: Decimal,
    config: &SolverConfig,
) -> Result<Allocation, NoOpportunity> {
    let mut implied = Vec::with_capacity(legs.len());
    for leg in legs {
        let cost = leg.implied_cost().ok_or_else(|| NoOpportunity::BelowThreshold {
            reason: format!("leg {} has no positive return", leg.outcome_label),
        })?;
        implied.push(cost);
    }
    let implied_sum: Decimal = implied.iter().copied().sum();
    if implied_sum >= Decimal::ONE {
        return Err(NoOpportunity::NoArbitrage { implied_sum });
    }

    let venues = legs.iter().map(|l| &l.venue_id).collect::<HashSet<_>>().len();
    if venues < 2 {
        return Err(NoOpportunity::InsufficientVenues { venues });
    }
    if budget <= Decimal::ZERO {
        return Err(NoOpportunity::BelowThreshold {
            reason: format!("budget {budget} is not positive"),
        });
    }

    let payout = budget / implied_sum;
    let shares: Vec<Decimal> = legs
        .iter()
        .map(|leg| round_to_lot(payout / leg.price.gross_return(), config.share_lot))
        .collect();

    let total_stake: Decimal = legs
        .iter()
        .zip(&shares)
        .map(|(leg, n)| *n * leg.price.effective_cost())
        .sum();
    let losing_sum: Decimal = legs
        .iter()
        .zip(&shares)
        .map(|(leg, n)| *n * leg.price.lose_pnl)
        .sum();
    let outcome_pnl: Vec<Decimal> = legs
        .iter()
        .zip(&shares)
        .map(|(leg, n)| losing_sum - *n * leg.price.lose_pnl + *n * leg.price.win_pnl)
        .collect();

    let worst_case_pnl = outcome_pnl.iter().copied().min().unwrap_or(Decimal::ZERO);
    let best_case_pnl = outcome_pnl.iter().copied().max().unwrap_or(Decimal::ZERO);
    if total_stake <= Decimal::ZERO || worst_case_pnl <= Decimal::ZERO {
        return Err(NoOpportunity::BelowThreshold {
            reason: format!("worst case pnl {worst_case_pnl} after rounding is not positive"),
        });
    }
    let worst_case_roi = worst_case_pnl / total_stake;
    if worst_case_roi < config.min_worst_case_roi {
        return Err(NoOpportunity::BelowThreshold {
            reason: format!(
                "worst case roi {} below minimum {}",
                worst_case_roi.round_dp(6),
                config.min_worst_case_roi
            ),
        });
    }
    if total_stake < config.min_total_stake {
        return Err(NoOpportunity::BelowThreshold {
            reason: format!(
                "total stake {} below minimum {}",
                total_stake.round_dp(2),
                config.min_total_stake
            ),
        });
    }

    Ok(Allocation {
        shares,
        outcome_pnl,
        total_stake,
        worst_case_pnl,
        best_case_pnl,
        worst_case_roi,
    })
}

/// Select legs for `key`'s group from `candidates` and solve.
///
/// # Errors
/// Any [`NoOpportunity`] reason.
pub fn detect(
    key: GroupKey,
    candidates: &[LegQuote],
    budget: Decimal,
    config: &SolverConfig,
    detected_at: DateTime<Utc>,
) -> Result<NewOpportunity, NoOpportunity> {
    let legs = select_best_legs(key.outcome_group, candidates)?;
    let allocation = solve(&legs, budget, config)?;

    let arb_legs = legs.iter().zip(&allocation.shares).map(|(leg, n)| ArbLeg {
        venue_id: leg.venue_id.clone(),
        market_id: leg.market_id,
        outcome_label: leg.outcome_label,
        stake_shares: *n,
        stake: *n * leg.price.effective_cost(),
        share_price: leg.price.share_price,
        win_pnl_per_share: leg.price.win_pnl,
        lose_pnl_per_share: leg.price.lose_pnl,
        source_quote_id: leg.quote_id,
    });

    NewOpportunity::builder()
        .key(key)
        .detected_at(detected_at)
        .legs(arb_legs)
        .pnl(allocation.worst_case_pnl, allocation.best_case_pnl)
        .build()
        .map_err(|e| NoOpportunity::BelowThreshold {
            reason: e.to_string(),
        })
}

fn round_to_lot(shares: Decimal, lot: Decimal) -> Decimal {
    if lot <= Decimal::ZERO {
        return shares;
    }
    (shares / lot).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * lot
}
