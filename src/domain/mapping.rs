//! Mapping candidates: a scored proposal that a market belongs to an event.
//!
//! Confidence is derived from an explicit list of [`MatchFeature`]s combined
//! by configured [`ScoringWeights`], so every suggestion can be audited.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{CandidateId, MarketId, SportsEventId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Pending,
    Accepted,
    Rejected,
}

impl CandidateStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::InvalidValue {
                field: "candidate status",
                value: other.to_string(),
            }),
        }
    }
}

/// One named signal behind a candidate's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "feature", rename_all = "snake_case")]
pub enum MatchFeature {
    /// Sports agree. A mismatch never produces a candidate.
    SportMatch,
    /// Team-name similarity, best of both home/away orderings.
    TeamSimilarity { score: f64, swapped: bool },
    /// Teams could not be parsed from the market; confidence is forced to 0.
    TeamsUnavailable,
    /// Start-time proximity within the matching window.
    TimeProximity { score: f64, delta_minutes: i64 },
    /// Start time could not be parsed; a neutral score is used.
    TimeUnavailable { score: f64 },
    /// The event was created from this market's own parse.
    NewEvent { confidence: f64 },
}

/// Weights for combining features. Normalized by their sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_team_weight")]
    pub team: f64,
    #[serde(default = "default_time_weight")]
    pub time: f64,
    #[serde(default = "default_sport_weight")]
    pub sport: f64,
}

fn default_team_weight() -> f64 {
    0.6
}

fn default_time_weight() -> f64 {
    0.3
}

fn default_sport_weight() -> f64 {
    0.1
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            team: default_team_weight(),
            time: default_time_weight(),
            sport: default_sport_weight(),
        }
    }
}

impl ScoringWeights {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.team + self.time + self.sport
    }
}

/// The ordered features recorded for a candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(Vec<MatchFeature>);

impl FeatureSet {
    #[must_use]
    pub fn new(features: Vec<MatchFeature>) -> Self {
        Self(features)
    }

    #[must_use]
    pub fn features(&self) -> &[MatchFeature] {
        &self.0
    }

    /// Weighted confidence in [0, 1].
    #[must_use]
    pub fn confidence(&self, weights: &ScoringWeights) -> f64 {
        let mut sport = 0.0;
        let mut team = 0.0;
        let mut time = 0.0;
        for feature in &self.0 {
            match feature {
                MatchFeature::NewEvent { confidence } => return confidence.clamp(0.0, 1.0),
                MatchFeature::TeamsUnavailable => return 0.0,
                MatchFeature::SportMatch => sport = 1.0,
                MatchFeature::TeamSimilarity { score, .. } => team = *score,
                MatchFeature::TimeProximity { score, .. }
                | MatchFeature::TimeUnavailable { score } => time = *score,
            }
        }
        if sport == 0.0 {
            return 0.0;
        }
        let total = weights.total();
        if total <= 0.0 {
            return 0.0;
        }
        let raw = (weights.sport * sport + weights.team * team + weights.time * time) / total;
        (raw.clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0
    }

    /// Whether the event's home team matched the market's away team.
    #[must_use]
    pub fn teams_swapped(&self) -> bool {
        self.0
            .iter()
            .any(|f| matches!(f, MatchFeature::TeamSimilarity { swapped: true, .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingCandidate {
    pub id: CandidateId,
    pub market_id: MarketId,
    pub sports_event_id: SportsEventId,
    pub confidence: f64,
    pub features: FeatureSet,
    pub status: CandidateStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl MappingCandidate {
    /// Move a pending candidate to `next`.
    ///
    /// # Errors
    /// `InvalidState` if the candidate is no longer pending.
    pub fn review(&mut self, next: CandidateStatus, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != CandidateStatus::Pending {
            return Err(DomainError::InvalidState {
                entity: "mapping candidate",
                id: self.id.to_string(),
                actual: self.status.as_str(),
                expected: CandidateStatus::Pending.as_str(),
            });
        }
        self.status = next;
        self.reviewed_at = Some(now);
        Ok(())
    }

    /// Check that accepting this candidate is consistent with the market's
    /// current event link.
    ///
    /// # Errors
    /// `AlreadyResolved` when the market points at a different event.
    pub fn check_market_link(&self, current: Option<SportsEventId>) -> Result<(), DomainError> {
        match current {
            Some(existing) if existing != self.sports_event_id => {
                Err(DomainError::AlreadyResolved {
                    market_id: self.market_id.value(),
                    sports_event_id: existing.value(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Input for recording a new candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMappingCandidate {
    pub market_id: MarketId,
    pub sports_event_id: SportsEventId,
    pub confidence: f64,
    pub features: FeatureSet,
}

impl NewMappingCandidate {
    #[must_use]
    pub fn into_candidate(self, id: CandidateId, now: DateTime<Utc>) -> MappingCandidate {
        MappingCandidate {
            id,
            market_id: self.market_id,
            sports_event_id: self.sports_event_id,
            confidence: self.confidence,
            features: self.features,
            status: CandidateStatus::Pending,
            created_at: now,
            reviewed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> MappingCandidate {
        NewMappingCandidate {
            market_id: MarketId::new(3),
            sports_event_id: SportsEventId::new(9),
            confidence: 0.9,
            features: FeatureSet::default(),
        }
        .into_candidate(CandidateId::new(1), Utc::now())
    }

    #[test]
    fn weighted_confidence() {
        let features = FeatureSet::new(vec![
            MatchFeature::SportMatch,
            MatchFeature::TeamSimilarity {
                score: 1.0,
                swapped: false,
            },
            MatchFeature::TimeProximity {
                score: 0.5,
                delta_minutes: 720,
            },
        ]);
        let c = features.confidence(&ScoringWeights::default());
        assert!((c - 0.85).abs() < 1e-9);
    }

    #[test]
    fn unavailable_teams_force_zero() {
        let features = FeatureSet::new(vec![
            MatchFeature::SportMatch,
            MatchFeature::TeamsUnavailable,
            MatchFeature::TimeUnavailable { score: 0.5 },
        ]);
        assert_eq!(features.confidence(&ScoringWeights::default()), 0.0);
    }

    #[test]
    fn new_event_uses_fixed_confidence() {
        let features = FeatureSet::new(vec![MatchFeature::NewEvent { confidence: 0.7 }]);
        assert_eq!(features.confidence(&ScoringWeights::default()), 0.7);
    }

    #[test]
    fn features_serialize_as_tagged_variants() {
        let json = serde_json::to_value(FeatureSet::new(vec![MatchFeature::TeamSimilarity {
            score: 0.9,
            swapped: true,
        }]))
        .unwrap();
        assert_eq!(json[0]["feature"], "team_similarity");
        assert_eq!(json[0]["swapped"], true);
    }

    #[test]
    fn review_only_from_pending() {
        let mut c = candidate();
        c.review(CandidateStatus::Accepted, Utc::now()).unwrap();
        assert!(c.reviewed_at.is_some());
        let err = c.review(CandidateStatus::Rejected, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[test]
    fn market_link_guard() {
        let c = candidate();
        assert!(c.check_market_link(None).is_ok());
        assert!(c.check_market_link(Some(SportsEventId::new(9))).is_ok());
        assert!(matches!(
            c.check_market_link(Some(SportsEventId::new(4))),
            Err(DomainError::AlreadyResolved { .. })
        ));
    }
}
