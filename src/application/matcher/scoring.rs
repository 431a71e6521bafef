//! Candidate scoring.
//!
//! Turns a market's parsed hints and one candidate event into an ordered
//! [`FeatureSet`]. Combining features into a confidence is the feature set's
//! job; this module only decides which features apply.

use chrono::{DateTime, Utc};

use super::MatcherConfig;
use crate::domain::similarity::{team_pair_similarity, time_proximity};
use crate::domain::{FeatureSet, MatchFeature, ParsedHints, SportsEvent};

/// Score `hints` against `event`.
///
/// Returns `None` when the sports differ; sport is a hard gate.
#[must_use]
pub fn score_event(
    hints: &ParsedHints,
    event: &SportsEvent,
    config: &MatcherConfig,
) -> Option<FeatureSet> {
    let sport = hints.sport.as_deref()?;
    if !sport.eq_ignore_ascii_case(&event.sport) {
        return None;
    }

    let mut features = vec![MatchFeature::SportMatch];

    match (&hints.home_team, &hints.away_team) {
        (Some(home), Some(away)) => {
            let (score, swapped) =
                team_pair_similarity(&event.home_team, &event.away_team, home, away);
            features.push(MatchFeature::TeamSimilarity {
                score: round4(score),
                swapped,
            });
        }
        _ => features.push(MatchFeature::TeamsUnavailable),
    }

    features.push(time_feature(hints.start_time, event.start_time, config));

    Some(FeatureSet::new(features))
}

fn time_feature(
    parsed: Option<DateTime<Utc>>,
    scheduled: DateTime<Utc>,
    config: &MatcherConfig,
) -> MatchFeature {
    match parsed {
        Some(at) => MatchFeature::TimeProximity {
            score: round4(time_proximity(at, scheduled, config.window())),
            delta_minutes: (at - scheduled).num_minutes().abs(),
        },
        None => MatchFeature::TimeUnavailable {
            score: config.neutral_time_score,
        },
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventSource, EventStatus, SportsEventId};
    use chrono::{Duration, TimeZone};

    fn event() -> SportsEvent {
        SportsEvent {
            id: SportsEventId::new(1),
            sport: "NBA".into(),
            league: None,
            home_team: "Oklahoma City Thunder".into(),
            away_team: "Phoenix Suns".into(),
            start_time: Utc.with_ymd_and_hms(2025, 12, 10, 23, 0, 0).unwrap(),
            status: EventStatus::Scheduled,
            canonical_name: "Phoenix Suns @ Oklahoma City Thunder".into(),
            source: EventSource::Manual,
            external_ref: None,
        }
    }

    fn hints(home: Option<&str>, away: Option<&str>) -> ParsedHints {
        ParsedHints {
            sport: Some("NBA".into()),
            league: None,
            home_team: home.map(Into::into),
            away_team: away.map(Into::into),
            start_time: Some(Utc.with_ymd_and_hms(2025, 12, 10, 23, 0, 0).unwrap()),
        }
    }

    #[test]
    fn exact_match_scores_one() {
        let config = MatcherConfig::default();
        let features = score_event(
            &hints(Some("Oklahoma City Thunder"), Some("Phoenix Suns")),
            &event(),
            &config,
        )
        .unwrap();
        assert_eq!(features.confidence(&config.weights), 1.0);
        assert!(!features.teams_swapped());
    }

    #[test]
    fn swapped_teams_still_match() {
        let config = MatcherConfig::default();
        let features = score_event(
            &hints(Some("Suns"), Some("Thunder")),
            &event(),
            &config,
        )
        .unwrap();
        assert!(features.teams_swapped());
        assert!(features.confidence(&config.weights) > 0.9);
    }

    #[test]
    fn sport_mismatch_yields_nothing() {
        let mut h = hints(Some("Thunder"), Some("Suns"));
        h.sport = Some("NFL".into());
        assert!(score_event(&h, &event(), &MatcherConfig::default()).is_none());
    }

    #[test]
    fn missing_sport_yields_nothing() {
        let mut h = hints(Some("Thunder"), Some("Suns"));
        h.sport = None;
        assert!(score_event(&h, &event(), &MatcherConfig::default()).is_none());
    }

    #[test]
    fn unparseable_teams_give_zero_confidence() {
        let config = MatcherConfig::default();
        let features = score_event(&hints(None, None), &event(), &config).unwrap();
        assert!(features
            .features()
            .contains(&MatchFeature::TeamsUnavailable));
        assert_eq!(features.confidence(&config.weights), 0.0);
    }

    #[test]
    fn unknown_time_uses_neutral_score() {
        let config = MatcherConfig {
            neutral_time_score: 0.5,
            ..MatcherConfig::default()
        };
        let mut h = hints(Some("Oklahoma City Thunder"), Some("Phoenix Suns"));
        h.start_time = None;
        let features = score_event(&h, &event(), &config).unwrap();
        // 0.6 * 1.0 + 0.3 * 0.5 + 0.1 * 1.0
        assert_eq!(features.confidence(&config.weights), 0.85);
    }

    #[test]
    fn time_decays_across_window() {
        let config = MatcherConfig::default();
        let mut h = hints(Some("Oklahoma City Thunder"), Some("Phoenix Suns"));
        h.start_time = Some(event().start_time + Duration::hours(12));
        let features = score_event(&h, &event(), &config).unwrap();
        let time = features
            .features()
            .iter()
            .find_map(|f| match f {
                MatchFeature::TimeProximity {
                    score,
                    delta_minutes,
                } => Some((*score, *delta_minutes)),
                _ => None,
            })
            .unwrap();
        assert_eq!(time, (0.5, 720));
    }
}
