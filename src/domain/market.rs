//! Venue markets and canonical outcome labels.
//!
//! A [`Market`] is one venue's listing. Its outcomes are tagged with
//! venue-independent [`OutcomeLabel`]s so that quotes for "the home team wins"
//! from two venues land in the same [`OutcomeGroup`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{MarketId, SportsEventId, VenueId};
use super::similarity::team_similarity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    Moneyline,
    Spread,
    Total,
    Binary,
    Unknown,
}

impl MarketType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Moneyline => "moneyline",
            Self::Spread => "spread",
            Self::Total => "total",
            Self::Binary => "binary",
            Self::Unknown => "unknown",
        }
    }

    /// Guess the market type from its question text.
    #[must_use]
    pub fn infer_from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has_word = |w: &str| {
            lower
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|token| token == w)
        };
        if lower.contains("moneyline") || has_word("ml") || lower.contains(" winner") {
            Self::Moneyline
        } else if lower.contains("over/under") || has_word("total") || has_word("totals") {
            Self::Total
        } else if has_word("spread") || lower.contains("handicap") {
            Self::Spread
        } else {
            Self::Binary
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moneyline" => Ok(Self::Moneyline),
            "spread" => Ok(Self::Spread),
            "total" => Ok(Self::Total),
            "binary" => Ok(Self::Binary),
            "unknown" => Ok(Self::Unknown),
            other => Err(DomainError::InvalidValue {
                field: "market type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    Open,
    Suspended,
    Settled,
}

impl MarketStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Suspended => "suspended",
            Self::Settled => "settled",
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Map a venue's free-form status string.
    #[must_use]
    pub fn from_venue(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "settled" | "finalized" | "resolved" | "determined" => Self::Settled,
            "suspended" | "paused" | "closed" | "halted" => Self::Suspended,
            _ => Self::Open,
        }
    }
}

impl FromStr for MarketStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "suspended" => Ok(Self::Suspended),
            "settled" => Ok(Self::Settled),
            other => Err(DomainError::InvalidValue {
                field: "market status",
                value: other.to_string(),
            }),
        }
    }
}

/// Venue-independent outcome identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeLabel {
    HomeWin,
    AwayWin,
    Draw,
    Over,
    Under,
    Yes,
    No,
}

impl OutcomeLabel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HomeWin => "home_win",
            Self::AwayWin => "away_win",
            Self::Draw => "draw",
            Self::Over => "over",
            Self::Under => "under",
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    /// The same outcome seen from the other side of the fixture.
    #[must_use]
    pub const fn mirrored(self) -> Self {
        match self {
            Self::HomeWin => Self::AwayWin,
            Self::AwayWin => Self::HomeWin,
            other => other,
        }
    }

    /// Label a venue's outcome names.
    ///
    /// Names that spell a label directly (`Yes`, `Over`, `Draw`) win. Other
    /// names on a moneyline are matched to the nearer of the parsed teams.
    /// A team name on any other market type does not mean "that team wins",
    /// so those fall through to the positional defaults.
    #[must_use]
    pub fn resolve(names: &[String], market_type: MarketType, hints: &ParsedHints) -> Vec<Self> {
        let defaults = Self::defaults(market_type, hints, names.len());
        if names.is_empty() {
            return defaults;
        }

        let mut labels = Vec::with_capacity(names.len());
        for name in names {
            let label = match name.trim().to_ascii_lowercase().as_str() {
                "yes" => Some(Self::Yes),
                "no" => Some(Self::No),
                "over" => Some(Self::Over),
                "under" => Some(Self::Under),
                "draw" | "tie" => Some(Self::Draw),
                _ => match (&hints.home_team, &hints.away_team) {
                    (Some(home), Some(away)) if market_type == MarketType::Moneyline => {
                        let to_home = team_similarity(name, home);
                        let to_away = team_similarity(name, away);
                        if to_home > to_away && to_home >= 0.5 {
                            Some(Self::HomeWin)
                        } else if to_away > to_home && to_away >= 0.5 {
                            Some(Self::AwayWin)
                        } else {
                            None
                        }
                    }
                    _ => None,
                },
            };
            match label {
                Some(label) if !labels.contains(&label) => labels.push(label),
                _ => return defaults,
            }
        }
        labels
    }

    fn defaults(market_type: MarketType, hints: &ParsedHints, count: usize) -> Vec<Self> {
        match market_type {
            MarketType::Moneyline if hints.has_teams() && count == 3 => {
                vec![Self::HomeWin, Self::Draw, Self::AwayWin]
            }
            MarketType::Moneyline if hints.has_teams() => vec![Self::HomeWin, Self::AwayWin],
            MarketType::Total => vec![Self::Over, Self::Under],
            _ => vec![Self::Yes, Self::No],
        }
    }
}

impl fmt::Display for OutcomeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeLabel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home_win" => Ok(Self::HomeWin),
            "away_win" => Ok(Self::AwayWin),
            "draw" => Ok(Self::Draw),
            "over" => Ok(Self::Over),
            "under" => Ok(Self::Under),
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            other => Err(DomainError::InvalidValue {
                field: "outcome label",
                value: other.to_string(),
            }),
        }
    }
}

/// A mutually exclusive, collectively exhaustive set of outcome labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeGroup {
    HomeAway,
    HomeDrawAway,
    OverUnder,
    YesNo,
}

impl OutcomeGroup {
    pub const ALL: [Self; 4] = [
        Self::HomeAway,
        Self::HomeDrawAway,
        Self::OverUnder,
        Self::YesNo,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HomeAway => "home_away",
            Self::HomeDrawAway => "home_draw_away",
            Self::OverUnder => "over_under",
            Self::YesNo => "yes_no",
        }
    }

    /// The narrowest group covering every label in `labels`.
    #[must_use]
    pub fn covering(labels: &[OutcomeLabel]) -> Option<Self> {
        if labels.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|group| labels.iter().all(|label| group.labels().contains(label)))
    }

    #[must_use]
    pub const fn labels(&self) -> &'static [OutcomeLabel] {
        match self {
            Self::HomeAway => &[OutcomeLabel::HomeWin, OutcomeLabel::AwayWin],
            Self::HomeDrawAway => &[
                OutcomeLabel::HomeWin,
                OutcomeLabel::Draw,
                OutcomeLabel::AwayWin,
            ],
            Self::OverUnder => &[OutcomeLabel::Over, OutcomeLabel::Under],
            Self::YesNo => &[OutcomeLabel::Yes, OutcomeLabel::No],
        }
    }
}

impl fmt::Display for OutcomeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeGroup {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home_away" => Ok(Self::HomeAway),
            "home_draw_away" => Ok(Self::HomeDrawAway),
            "over_under" => Ok(Self::OverUnder),
            "yes_no" => Ok(Self::YesNo),
            other => Err(DomainError::InvalidValue {
                field: "outcome group",
                value: other.to_string(),
            }),
        }
    }
}

/// Signals parsed from a market's text or ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedHints {
    pub sport: Option<String>,
    pub league: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
}

impl ParsedHints {
    #[must_use]
    pub fn has_teams(&self) -> bool {
        self.home_team.is_some() && self.away_team.is_some()
    }

    /// Fill gaps from `other`; values already present are kept.
    pub fn merge(&mut self, other: ParsedHints) {
        let other_has_teams = other.has_teams();
        self.sport = self.sport.take().or(other.sport);
        self.league = self.league.take().or(other.league);
        if !self.has_teams() && other_has_teams {
            self.home_team = other.home_team;
            self.away_team = other.away_team;
        }
        self.start_time = self.start_time.or(other.start_time);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub venue_id: VenueId,
    pub venue_market_key: String,
    pub market_type: MarketType,
    pub question: String,
    pub sports_event_id: Option<SportsEventId>,
    pub status: MarketStatus,
    pub hints: ParsedHints,
    pub outcomes: Vec<OutcomeLabel>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Venue's own event reference, used to link ingested markets.
    pub event_ref: Option<String>,
    /// The venue names home and away the other way round from the linked
    /// event. Outcomes and quotes stay in venue order; readers translate
    /// through [`Market::event_label`].
    pub sides_swapped: bool,
    pub updated_at: DateTime<Utc>,
}

impl Market {
    /// The label at `index` in the venue's outcome order.
    #[must_use]
    pub fn outcome_at(&self, index: usize) -> Option<OutcomeLabel> {
        self.outcomes.get(index).copied()
    }

    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.sports_event_id.is_some()
    }

    /// A venue-ordered label as seen from the linked event.
    #[must_use]
    pub const fn event_label(&self, label: OutcomeLabel) -> OutcomeLabel {
        if self.sides_swapped {
            label.mirrored()
        } else {
            label
        }
    }

    /// Outcome labels in event orientation.
    #[must_use]
    pub fn event_outcomes(&self) -> Vec<OutcomeLabel> {
        self.outcomes.iter().map(|l| self.event_label(*l)).collect()
    }

    /// Outcome group this market's labels belong to.
    #[must_use]
    pub fn outcome_group(&self) -> Option<OutcomeGroup> {
        OutcomeGroup::covering(&self.outcomes)
    }

    /// Identity of the thing this market prices within its event and type.
    /// See [`proposition_key`].
    #[must_use]
    pub fn proposition(&self) -> String {
        proposition_key(self.market_type, &self.question)
    }
}

/// Normalized proposition for a market of `market_type` asking `question`.
///
/// A moneyline has one proposition per event, so the key is empty. A total
/// is keyed by its line (the last number in the question). Anything else is
/// keyed by its normalized question text, so two spreads only pair when
/// they read the same.
#[must_use]
pub fn proposition_key(market_type: MarketType, question: &str) -> String {
    let normalized = normalize_question(question);
    match market_type {
        MarketType::Moneyline => String::new(),
        MarketType::Total => normalized
            .split(' ')
            .filter_map(|token| {
                let number = token.trim_start_matches(['+', '-']);
                let numeric = number.starts_with(|c: char| c.is_ascii_digit())
                    && number.parse::<f64>().is_ok();
                numeric.then(|| number.to_string())
            })
            .last()
            .unwrap_or(normalized),
        MarketType::Spread | MarketType::Binary | MarketType::Unknown => normalized,
    }
}

fn normalize_question(question: &str) -> String {
    question
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '.' | '+' | '-')))
        .map(|token| token.trim_matches('.'))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Input for inserting or refreshing a market keyed by (venue, venue key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMarket {
    pub venue_id: VenueId,
    pub venue_market_key: String,
    pub market_type: MarketType,
    pub question: String,
    pub status: MarketStatus,
    pub hints: ParsedHints,
    pub outcomes: Vec<OutcomeLabel>,
    pub expires_at: Option<DateTime<Utc>>,
    pub event_ref: Option<String>,
}

impl NewMarket {
    /// Materialize into a stored market, keeping an existing event link.
    #[must_use]
    pub fn into_market(
        self,
        id: MarketId,
        sports_event_id: Option<SportsEventId>,
        now: DateTime<Utc>,
    ) -> Market {
        Market {
            id,
            venue_id: self.venue_id,
            venue_market_key: self.venue_market_key,
            market_type: self.market_type,
            question: self.question,
            sports_event_id,
            status: self.status,
            hints: self.hints,
            outcomes: self.outcomes,
            expires_at: self.expires_at,
            event_ref: self.event_ref,
            sides_swapped: false,
            updated_at: now,
        }
    }
}

/// Encode labels for a single text column.
#[must_use]
pub fn join_labels(labels: &[OutcomeLabel]) -> String {
    labels
        .iter()
        .map(OutcomeLabel::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode labels written by [`join_labels`].
///
/// # Errors
/// Returns `InvalidValue` on an unknown label.
pub fn split_labels(s: &str) -> Result<Vec<OutcomeLabel>, DomainError> {
    s.split(',')
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}
