//! Event matcher configuration.

use chrono::Duration;
use serde::Deserialize;

use crate::domain::ScoringWeights;
use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct MatcherConfig {
    /// Candidate events must start within this many hours of the parsed time.
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,

    /// Candidates scoring below this are discarded.
    #[serde(default)]
    pub min_confidence: f64,

    /// Time score used when a market's start time cannot be parsed.
    #[serde(default = "default_neutral_time_score")]
    pub neutral_time_score: f64,

    #[serde(default)]
    pub weights: ScoringWeights,

    /// Create a scheduled event from a fully parsed market that matched none.
    #[serde(default)]
    pub auto_create_events: bool,

    /// Confidence recorded for candidates pointing at auto-created events.
    #[serde(default = "default_new_event_confidence")]
    pub new_event_confidence: f64,

    /// Events within this many minutes with the same sport and teams are
    /// the same event.
    #[serde(default = "default_duplicate_tolerance_minutes")]
    pub duplicate_tolerance_minutes: u32,

    /// Markets examined per suggestion batch when the caller sets no limit.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

fn default_window_hours() -> u32 {
    24
}

fn default_neutral_time_score() -> f64 {
    0.5
}

fn default_new_event_confidence() -> f64 {
    0.7
}

fn default_duplicate_tolerance_minutes() -> u32 {
    90
}

fn default_batch_limit() -> usize {
    100
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            min_confidence: 0.0,
            neutral_time_score: default_neutral_time_score(),
            weights: ScoringWeights::default(),
            auto_create_events: false,
            new_event_confidence: default_new_event_confidence(),
            duplicate_tolerance_minutes: default_duplicate_tolerance_minutes(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl MatcherConfig {
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::hours(i64::from(self.window_hours))
    }

    #[must_use]
    pub fn duplicate_tolerance(&self) -> Duration {
        Duration::minutes(i64::from(self.duplicate_tolerance_minutes))
    }

    /// Validate ranges.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        if self.window_hours == 0 {
            return Err(ConfigError::InvalidValue {
                field: "matcher.window_hours",
                reason: "must be greater than 0".into(),
            });
        }
        if !unit(self.min_confidence) {
            return Err(ConfigError::InvalidValue {
                field: "matcher.min_confidence",
                reason: "must be between 0 and 1".into(),
            });
        }
        if !unit(self.neutral_time_score) {
            return Err(ConfigError::InvalidValue {
                field: "matcher.neutral_time_score",
                reason: "must be between 0 and 1".into(),
            });
        }
        if !unit(self.new_event_confidence) {
            return Err(ConfigError::InvalidValue {
                field: "matcher.new_event_confidence",
                reason: "must be between 0 and 1".into(),
            });
        }
        let w = &self.weights;
        if w.team < 0.0 || w.time < 0.0 || w.sport < 0.0 || w.total() <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "matcher.weights",
                reason: "weights must be non-negative with a positive sum".into(),
            });
        }
        if self.batch_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "matcher.batch_limit",
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }
}
