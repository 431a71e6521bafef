//! Arbitrage opportunity with builder pattern.
//!
//! An opportunity belongs to one outcome group of one proposition of one
//! sports event, identified by [`GroupKey`]. At most one opportunity per key is `active` at a time; a
//! newer detection marks its predecessor `stale`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{MarketId, OpportunityId, QuoteId, SportsEventId, VenueId};
use super::market::{Market, MarketType, OutcomeGroup, OutcomeLabel};
use super::price::Price;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Active,
    Stale,
    Closed,
}

impl OpportunityStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Stale => "stale",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpportunityStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "stale" => Ok(Self::Stale),
            "closed" => Ok(Self::Closed),
            other => Err(DomainError::InvalidValue {
                field: "opportunity status",
                value: other.to_string(),
            }),
        }
    }
}

/// Identity of an outcome group: (sports event, market type, proposition,
/// outcome group).
///
/// Only markets pricing the same proposition are mutually exclusive, so a
/// spread and a moneyline on the same event, or two totals at different
/// lines, never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub sports_event_id: SportsEventId,
    pub market_type: MarketType,
    pub proposition: String,
    pub outcome_group: OutcomeGroup,
}

impl GroupKey {
    #[must_use]
    pub fn new(
        sports_event_id: SportsEventId,
        market_type: MarketType,
        proposition: impl Into<String>,
        outcome_group: OutcomeGroup,
    ) -> Self {
        Self {
            sports_event_id,
            market_type,
            proposition: proposition.into(),
            outcome_group,
        }
    }

    /// The group a linked market prices, if its labels form one.
    #[must_use]
    pub fn for_market(market: &Market) -> Option<Self> {
        let sports_event_id = market.sports_event_id?;
        let outcome_group = market.outcome_group()?;
        Some(Self::new(
            sports_event_id,
            market.market_type,
            market.proposition(),
            outcome_group,
        ))
    }

    /// Whether `market`'s quotes belong in this group. A two-way moneyline
    /// contributes its home and away legs to the three-way group.
    #[must_use]
    pub fn admits(&self, market: &Market) -> bool {
        let Some(theirs) = Self::for_market(market) else {
            return false;
        };
        let same_group = theirs.outcome_group == self.outcome_group
            || (theirs.outcome_group == OutcomeGroup::HomeAway
                && self.outcome_group == OutcomeGroup::HomeDrawAway);
        theirs.sports_event_id == self.sports_event_id
            && theirs.market_type == self.market_type
            && theirs.proposition == self.proposition
            && same_group
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event {} {}", self.sports_event_id, self.market_type)?;
        if !self.proposition.is_empty() {
            write!(f, " [{}]", self.proposition)?;
        }
        write!(f, "/{}", self.outcome_group)
    }
}

/// One position of an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbLeg {
    pub venue_id: VenueId,
    pub market_id: MarketId,
    pub outcome_label: OutcomeLabel,
    pub stake_shares: Decimal,
    /// Cash outlay for this leg: shares times per-share cost.
    pub stake: Decimal,
    pub share_price: Price,
    pub win_pnl_per_share: Price,
    pub lose_pnl_per_share: Price,
    /// Quote the leg was priced from. The quote may be pruned later.
    pub source_quote_id: Option<QuoteId>,
}

/// Identity of the quote set an opportunity was computed from.
///
/// Sorted `venue|outcome|quote_id` tuples joined by `;`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegFingerprint(String);

impl LegFingerprint {
    #[must_use]
    pub fn from_legs(legs: &[ArbLeg]) -> Self {
        let mut parts: Vec<String> = legs
            .iter()
            .map(|leg| {
                let quote = leg
                    .source_quote_id
                    .map_or_else(|| "-".to_string(), |id| id.to_string());
                format!("{}|{}|{}", leg.venue_id, leg.outcome_label, quote)
            })
            .collect();
        parts.sort();
        Self(parts.join(";"))
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LegFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored arbitrage opportunity with its legs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub sports_event_id: SportsEventId,
    pub market_type: MarketType,
    pub proposition: String,
    pub outcome_group: OutcomeGroup,
    pub detected_at: DateTime<Utc>,
    pub num_outcomes: usize,
    pub total_stake: Decimal,
    pub worst_case_pnl: Decimal,
    pub best_case_pnl: Decimal,
    pub worst_case_roi: Decimal,
    pub status: OpportunityStatus,
    pub fingerprint: LegFingerprint,
    pub legs: Vec<ArbLeg>,
}

impl Opportunity {
    #[must_use]
    pub fn key(&self) -> GroupKey {
        GroupKey {
            sports_event_id: self.sports_event_id,
            market_type: self.market_type,
            proposition: self.proposition.clone(),
            outcome_group: self.outcome_group,
        }
    }
}

/// Error returned when building a `NewOpportunity` fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpportunityBuildError {
    MissingKey,
    MissingDetectedAt,
    MissingLegs,
    MissingPnl,
    NonPositiveStake,
}

impl fmt::Display for OpportunityBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey => write!(f, "group key is required"),
            Self::MissingDetectedAt => write!(f, "detected_at is required"),
            Self::MissingLegs => write!(f, "at least two legs are required"),
            Self::MissingPnl => write!(f, "worst and best case pnl are required"),
            Self::NonPositiveStake => write!(f, "total stake must be positive"),
        }
    }
}

impl std::error::Error for OpportunityBuildError {}

/// A detected opportunity before it is stored.
///
/// Use `NewOpportunity::builder()` to construct instances. The builder
/// derives total stake, ROI, outcome count and fingerprint from the legs.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOpportunity {
    pub key: GroupKey,
    pub detected_at: DateTime<Utc>,
    pub total_stake: Decimal,
    pub worst_case_pnl: Decimal,
    pub best_case_pnl: Decimal,
    pub worst_case_roi: Decimal,
    pub fingerprint: LegFingerprint,
    pub legs: Vec<ArbLeg>,
}

impl NewOpportunity {
    pub fn builder() -> NewOpportunityBuilder {
        NewOpportunityBuilder::default()
    }

    #[must_use]
    pub fn into_opportunity(self, id: OpportunityId) -> Opportunity {
        Opportunity {
            id,
            sports_event_id: self.key.sports_event_id,
            market_type: self.key.market_type,
            proposition: self.key.proposition,
            outcome_group: self.key.outcome_group,
            detected_at: self.detected_at,
            num_outcomes: self.legs.len(),
            total_stake: self.total_stake,
            worst_case_pnl: self.worst_case_pnl,
            best_case_pnl: self.best_case_pnl,
            worst_case_roi: self.worst_case_roi,
            status: OpportunityStatus::Active,
            fingerprint: self.fingerprint,
            legs: self.legs,
        }
    }
}

#[derive(Debug, Default)]
pub struct NewOpportunityBuilder {
    key: Option<GroupKey>,
    detected_at: Option<DateTime<Utc>>,
    legs: Vec<ArbLeg>,
    pnl: Option<(Decimal, Decimal)>,
}

impl NewOpportunityBuilder {
    pub fn key(mut self, key: GroupKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn detected_at(mut self, at: DateTime<Utc>) -> Self {
        self.detected_at = Some(at);
        self
    }

    pub fn leg(mut self, leg: ArbLeg) -> Self {
        self.legs.push(leg);
        self
    }

    pub fn legs(mut self, legs: impl IntoIterator<Item = ArbLeg>) -> Self {
        self.legs.extend(legs);
        self
    }

    /// Set worst- and best-case PnL across outcomes.
    pub fn pnl(mut self, worst: Decimal, best: Decimal) -> Self {
        self.pnl = Some((worst, best));
        self
    }

    /// Build, deriving total stake, ROI and fingerprint.
    ///
    /// # Errors
    ///
    /// Returns `OpportunityBuildError` if a field is missing or the legs
    /// stake nothing.
    pub fn build(self) -> Result<NewOpportunity, OpportunityBuildError> {
        let key = self.key.ok_or(OpportunityBuildError::MissingKey)?;
        let detected_at = self
            .detected_at
            .ok_or(OpportunityBuildError::MissingDetectedAt)?;
        if self.legs.len() < 2 {
            return Err(OpportunityBuildError::MissingLegs);
        }
        let (worst_case_pnl, best_case_pnl) =
            self.pnl.ok_or(OpportunityBuildError::MissingPnl)?;

        let total_stake: Decimal = self.legs.iter().map(|leg| leg.stake).sum();
        if total_stake <= Decimal::ZERO {
            return Err(OpportunityBuildError::NonPositiveStake);
        }
        let worst_case_roi = worst_case_pnl / total_stake;
        let fingerprint = LegFingerprint::from_legs(&self.legs);

        Ok(NewOpportunity {
            key,
            detected_at,
            total_stake,
            worst_case_pnl,
            best_case_pnl,
            worst_case_roi,
            fingerprint,
            legs: self.legs,
        })
    }
}
