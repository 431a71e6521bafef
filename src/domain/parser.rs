//! Extract sport, teams and start-time hints from market text and tickers.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use super::market::ParsedHints;

/// League keywords recognised in market text.
pub const KNOWN_SPORTS: [&str; 4] = ["NBA", "NFL", "MLB", "NHL"];

/// Hour (UTC) assumed for a date-only start hint. North American evening
/// games start around 23:00-03:00 UTC.
const DATE_ONLY_HOUR_UTC: u32 = 23;

/// Parse a market question such as `"NBA: Phoenix Suns @ Oklahoma City
/// Thunder - Moneyline"`.
///
/// `sport_hint` overrides keyword detection when the venue categorises its
/// markets.
#[must_use]
pub fn parse_question(text: &str, sport_hint: Option<&str>) -> ParsedHints {
    let sport = sport_hint
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .or_else(|| detect_sport(text));

    let mut main = text;
    if let Some((head, _)) = main.split_once(" - ") {
        main = head;
    }
    if let Some((_, tail)) = main.split_once(':') {
        main = tail;
    }
    let main = main.trim().trim_end_matches('?');

    let teams = split_teams(main, " @ ", false)
        .or_else(|| split_teams(main, " at ", false))
        .or_else(|| split_teams(main, " vs. ", true))
        .or_else(|| split_teams(main, " vs ", true))
        .or_else(|| split_teams(main, " v ", true));

    let (home_team, away_team) = match teams {
        Some((home, away)) => (Some(home), Some(away)),
        None => (None, None),
    };

    ParsedHints {
        league: sport.clone(),
        sport,
        home_team,
        away_team,
        start_time: None,
    }
}

/// A parsed Kalshi-style ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTicker {
    pub hints: ParsedHints,
    /// Team code a per-team market resolves on (`...-OKC`).
    pub subject: Option<String>,
}

/// Parse a ticker such as `KXNBAGAME-25DEC10PHXOKC` or its per-team market
/// `KXNBAGAME-25DEC10PHXOKC-OKC`.
#[must_use]
pub fn parse_ticker(ticker: &str) -> ParsedTicker {
    let upper = ticker.trim().to_ascii_uppercase();
    let sport = KNOWN_SPORTS
        .iter()
        .find(|s| upper.contains(*s))
        .map(|s| (*s).to_string());

    let segments: Vec<&str> = upper.split('-').collect();
    let mut parsed = ParsedTicker {
        hints: ParsedHints {
            league: sport.clone(),
            sport,
            ..ParsedHints::default()
        },
        subject: None,
    };

    let Some(pos) = segments.iter().position(|seg| game_segment(seg).is_some()) else {
        return parsed;
    };
    if let Some((date, away, home)) = game_segment(segments[pos]) {
        parsed.hints.start_time = date
            .and_hms_opt(DATE_ONLY_HOUR_UTC, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
        parsed.hints.away_team = Some(away.to_string());
        parsed.hints.home_team = Some(home.to_string());
    }
    parsed.subject = segments
        .get(pos + 1)
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()))
        .map(|s| (*s).to_string());
    parsed
}

/// Start time hint from an ISO-8601 timestamp, tolerating a trailing `Z`.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(DATE_ONLY_HOUR_UTC, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

fn detect_sport(text: &str) -> Option<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .map(str::to_ascii_uppercase)
        .find(|word| KNOWN_SPORTS.contains(&word.as_str()))
}

/// Split on a separator, case-insensitively. With `home_first` the left side
/// is the home team (`Home vs Away`), otherwise the away team (`Away @ Home`).
fn split_teams(text: &str, separator: &str, home_first: bool) -> Option<(String, String)> {
    let lower = text.to_ascii_lowercase();
    let idx = lower.find(separator)?;
    let left = clean_team(&text[..idx]);
    let right = clean_team(&text[idx + separator.len()..]);
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some(if home_first {
        (left, right)
    } else {
        (right, left)
    })
}

fn clean_team(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '.' || c == ',' || c == '?')
        .to_string()
}

/// `25DEC10PHXOKC` -> (2025-12-10, "PHX", "OKC").
fn game_segment(seg: &str) -> Option<(NaiveDate, &str, &str)> {
    if seg.len() != 13 || !seg.is_ascii() {
        return None;
    }
    let (yy, rest) = seg.split_at(2);
    let (mon, rest) = rest.split_at(3);
    let (dd, teams) = rest.split_at(2);
    if !teams.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let year = 2000 + yy.parse::<i32>().ok()?;
    let month = match mon {
        "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DEC" => 12,
        _ => return None,
    };
    let day = dd.parse::<u32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let (away, home) = teams.split_at(3);
    Some((date, away, home))
}
