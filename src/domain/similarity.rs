//! Team-name and start-time similarity scores in [0, 1].

use chrono::{DateTime, Duration, Utc};

/// Lowercase, strip punctuation, collapse whitespace.
fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole-word containment: `phrase` appears as contiguous tokens of `text`.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    let text_words: Vec<&str> = text.split_whitespace().collect();
    let phrase_words: Vec<&str> = phrase.split_whitespace().collect();
    if phrase_words.is_empty() || phrase_words.len() > text_words.len() {
        return false;
    }
    text_words
        .windows(phrase_words.len())
        .any(|window| window == phrase_words.as_slice())
}

/// Ticker-style code (`PHX`, `OKC`) whose letters appear in order in `name`,
/// starting with its first letter.
fn is_abbreviation_of(code: &str, name: &str) -> bool {
    if code.len() < 2 || code.len() > 4 || code.contains(' ') {
        return false;
    }
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    if !compact.starts_with(&code[..1]) {
        return false;
    }
    let mut rest = compact.chars();
    code.chars().all(|c| rest.any(|n| n == c))
}

/// Similarity of two team names.
///
/// Exact match scores 1.0, whole-word containment ("Suns" in "Phoenix
/// Suns") 0.9, a ticker abbreviation 0.75; otherwise normalized Levenshtein.
#[must_use]
pub fn team_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize(a), normalize(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if contains_phrase(&a, &b) || contains_phrase(&b, &a) {
        return 0.9;
    }
    if is_abbreviation_of(&a, &b) || is_abbreviation_of(&b, &a) {
        return 0.75;
    }
    strsim::normalized_levenshtein(&a, &b)
}

/// Score a parsed team pair against an event's teams in either order.
///
/// Returns the score and whether the better alignment had home and away
/// swapped relative to the event.
#[must_use]
pub fn team_pair_similarity(
    event_home: &str,
    event_away: &str,
    parsed_home: &str,
    parsed_away: &str,
) -> (f64, bool) {
    let straight =
        (team_similarity(event_home, parsed_home) + team_similarity(event_away, parsed_away)) / 2.0;
    let swapped =
        (team_similarity(event_home, parsed_away) + team_similarity(event_away, parsed_home)) / 2.0;
    if swapped > straight {
        (swapped, true)
    } else {
        (straight, false)
    }
}

/// Linear decay from 1 at zero distance to 0 at the window edge.
#[must_use]
pub fn time_proximity(a: DateTime<Utc>, b: DateTime<Utc>, window: Duration) -> f64 {
    let window_secs = window.num_seconds();
    if window_secs <= 0 {
        return if a == b { 1.0 } else { 0.0 };
    }
    let delta = (a - b).num_seconds().abs();
    (1.0 - delta as f64 / window_secs as f64).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn exact_and_contained_names() {
        assert_eq!(team_similarity("Phoenix Suns", "phoenix  suns!"), 1.0);
        assert_eq!(team_similarity("Suns", "Phoenix Suns"), 0.9);
        assert_eq!(team_similarity("PHX", "Phoenix Suns"), 0.75);
        assert_eq!(team_similarity("OKC", "Oklahoma City Thunder"), 0.75);
        assert!(team_similarity("Lakers", "Celtics") < 0.5);
        assert_eq!(team_similarity("", "Celtics"), 0.0);
    }

    #[test]
    fn pair_similarity_is_symmetric_in_order() {
        let (straight, swapped_flag) =
            team_pair_similarity("Thunder", "Suns", "Thunder", "Suns");
        let (swapped, flag) = team_pair_similarity("Thunder", "Suns", "Suns", "Thunder");
        assert_eq!(straight, 1.0);
        assert!(!swapped_flag);
        assert_eq!(swapped, straight);
        assert!(flag);
    }

    #[test]
    fn time_proximity_decays_linearly() {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let window = Duration::hours(24);
        assert_eq!(time_proximity(t, t, window), 1.0);
        assert!((time_proximity(t, t + Duration::hours(12), window) - 0.5).abs() < 1e-9);
        assert_eq!(time_proximity(t, t - Duration::hours(30), window), 0.0);
    }
}
