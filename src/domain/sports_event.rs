//! Canonical sports events.
//!
//! A [`SportsEvent`] is the real-world contest that venue markets resolve
//! against. Its status only ever moves forward:
//! `scheduled -> live -> final`, and `scheduled | live -> cancelled`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::SportsEventId;

/// Lifecycle of a sports event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    Live,
    Final,
    Cancelled,
}

impl EventStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Final => "final",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the event still accepts new markets and opportunities.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Live)
    }

    /// Whether `self -> next` is a forward transition. Re-asserting the
    /// current status is allowed.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::Scheduled)
                | (Self::Live, Self::Live)
                | (Self::Final, Self::Final)
                | (Self::Cancelled, Self::Cancelled)
                | (Self::Scheduled, Self::Live)
                | (Self::Scheduled, Self::Final)
                | (Self::Live, Self::Final)
                | (Self::Scheduled, Self::Cancelled)
                | (Self::Live, Self::Cancelled)
        )
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "live" => Ok(Self::Live),
            "final" => Ok(Self::Final),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::InvalidValue {
                field: "event status",
                value: other.to_string(),
            }),
        }
    }
}

/// Where an event record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Pulled from a venue's event listing.
    Ingested,
    /// Created by the matcher from a fully parsed market.
    Auto,
    /// Entered by an operator.
    Manual,
}

impl EventSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ingested => "ingested",
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl FromStr for EventSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingested" => Ok(Self::Ingested),
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            other => Err(DomainError::InvalidValue {
                field: "event source",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportsEvent {
    pub id: SportsEventId,
    pub sport: String,
    pub league: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
    pub status: EventStatus,
    pub canonical_name: String,
    pub source: EventSource,
    pub external_ref: Option<String>,
}

impl SportsEvent {
    /// Apply a status change, enforcing monotonic transitions.
    ///
    /// # Errors
    /// `InvalidStatusTransition` when `next` would move backward.
    pub fn transition(&mut self, next: EventStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                id: self.id.value(),
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// True when `other` describes the same contest within `tolerance`.
    ///
    /// Only active events take part in the uniqueness rule.
    #[must_use]
    pub fn is_duplicate_of(&self, other: &NewSportsEvent, tolerance: Duration) -> bool {
        self.status.is_active()
            && self.sport.eq_ignore_ascii_case(&other.sport)
            && self.home_team.eq_ignore_ascii_case(&other.home_team)
            && self.away_team.eq_ignore_ascii_case(&other.away_team)
            && (self.start_time - other.start_time).abs() <= tolerance
    }
}

/// Input for creating a sports event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSportsEvent {
    pub sport: String,
    pub league: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
    pub source: EventSource,
    pub external_ref: Option<String>,
    /// Display name; derived as `Away @ Home` when absent.
    pub canonical_name: Option<String>,
}

impl NewSportsEvent {
    pub fn new(
        sport: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        start_time: DateTime<Utc>,
        source: EventSource,
    ) -> Self {
        Self {
            sport: sport.into().to_ascii_uppercase(),
            league: None,
            home_team: home_team.into(),
            away_team: away_team.into(),
            start_time,
            source,
            external_ref: None,
            canonical_name: None,
        }
    }

    #[must_use]
    pub fn with_league(mut self, league: impl Into<String>) -> Self {
        self.league = Some(league.into());
        self
    }

    #[must_use]
    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }

    #[must_use]
    pub fn with_canonical_name(mut self, name: impl Into<String>) -> Self {
        self.canonical_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        self.canonical_name
            .clone()
            .unwrap_or_else(|| format!("{} @ {}", self.away_team, self.home_team))
    }

    /// Materialize into a stored event with the given id.
    #[must_use]
    pub fn into_event(self, id: SportsEventId) -> SportsEvent {
        let canonical_name = self.display_name();
        SportsEvent {
            id,
            sport: self.sport,
            league: self.league,
            home_team: self.home_team,
            away_team: self.away_team,
            start_time: self.start_time,
            status: EventStatus::Scheduled,
            canonical_name,
            source: self.source,
            external_ref: self.external_ref,
        }
    }
}
