use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::fixtures::{Fixture, FixtureStatus};
use crate::ratings::{ClubRating, RatingTable, TiltTable};

#[derive(Debug, Clone)]
pub struct SeasonInput {
    pub ratings: RatingTable,
    pub fixtures: Vec<Fixture>,
    pub tilts: TiltTable,
}

#[derive(Debug, Deserialize)]
struct RawSeason {
    #[serde(default)]
    ratings: Vec<RawRating>,
    #[serde(default)]
    fixtures: Vec<RawFixture>,
    #[serde(default)]
    tilts: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct RawRating {
    #[serde(alias = "name")]
    club: String,
    #[serde(alias = "elo")]
    rating: f64,
    #[serde(alias = "as_of")]
    date: String,
    #[serde(default)]
    tilt: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawFixture {
    id: u64,
    season: i32,
    #[serde(default, alias = "date")]
    kickoff: Option<String>,
    home: String,
    away: String,
    #[serde(default)]
    home_goals: Option<u8>,
    #[serde(default)]
    away_goals: Option<u8>,
    #[serde(default)]
    status: Option<String>,
}

/// Decodes a season bundle: rating entries, fixtures and per-club tilts.
///
/// A tilt listed under `tilts` wins over one given on the rating entry.
pub fn parse_season_json(raw: &str) -> Result<SeasonInput> {
    let trimmed = raw.trim();
    let parsed: RawSeason = serde_json::from_str(trimmed).context("invalid season json")?;

    let mut entries = Vec::with_capacity(parsed.ratings.len());
    for r in parsed.ratings {
        let as_of = parse_timestamp(&r.date)
            .with_context(|| format!("bad rating date `{}` for {}", r.date, r.club))?;
        let mut entry = ClubRating::new(r.club, r.rating, as_of);
        if let Some(tilt) = r.tilt {
            entry.tilt = tilt;
        }
        entries.push(entry);
    }
    let ratings = RatingTable::from_entries(entries)?;

    let fixtures = parsed
        .fixtures
        .into_iter()
        .map(|f| -> Result<Fixture> {
            let kickoff = match f.kickoff.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(text) => Some(
                    parse_timestamp(text)
                        .with_context(|| format!("bad kickoff `{text}` for fixture {}", f.id))?,
                ),
            };
            let status = match f.status.as_deref() {
                Some(code) => FixtureStatus::from_code(code),
                None if f.home_goals.is_some() && f.away_goals.is_some() => {
                    FixtureStatus::Finished
                }
                None => FixtureStatus::NotStarted,
            };
            Ok(Fixture {
                id: f.id,
                season: f.season,
                kickoff,
                home: f.home,
                away: f.away,
                home_goals: f.home_goals,
                away_goals: f.away_goals,
                status,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut tilts = TiltTable::from_ratings(&ratings);
    for (club, tilt) in parsed.tilts {
        tilts.set(club, tilt);
    }

    Ok(SeasonInput {
        ratings,
        fixtures,
        tilts,
    })
}

/// Accepts plain dates (midnight), naive date-times with `T` or a space, and
/// RFC 3339 stamps, which are converted to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];

    let cleaned = raw.trim();
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(cleaned, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_formats() {
        let noon = NaiveDate::from_ymd_opt(2025, 4, 6)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        assert_eq!(parse_timestamp("2025-04-06T12:00"), Some(noon));
        assert_eq!(parse_timestamp("2025-04-06 12:00:00"), Some(noon));
        assert_eq!(parse_timestamp("2025-04-06T14:00:00+02:00"), Some(noon));
        assert_eq!(parse_timestamp("2025-04-06T12:00:00Z"), Some(noon));
        assert_eq!(
            parse_timestamp(" 2025-04-06 "),
            NaiveDate::from_ymd_opt(2025, 4, 6).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
        assert_eq!(parse_timestamp("06.04.2025"), None);
    }

    #[test]
    fn decodes_minimal_bundle() {
        let raw = r#"{
            "ratings": [
                {"club": "Rosenborg", "rating": 1600.5, "date": "2025-03-01"},
                {"club": "Tromsø", "rating": 1550.0, "date": "2025-03-01", "tilt": 1.1}
            ],
            "fixtures": [
                {"id": 1, "season": 2025, "kickoff": "2025-03-30 16:00",
                 "home": "Rosenborg", "away": "Tromsø",
                 "home_goals": 2, "away_goals": 2, "status": "ft"},
                {"id": 2, "season": 2025, "date": "2025-08-10T18:00:00Z",
                 "home": "Tromsø", "away": "Rosenborg"}
            ],
            "tilts": {"Rosenborg": 0.95}
        }"#;
        let input = parse_season_json(raw).unwrap();
        assert_eq!(input.ratings.len(), 2);
        assert_eq!(input.fixtures.len(), 2);
        assert_eq!(input.fixtures[0].status, FixtureStatus::Finished);
        assert!(input.fixtures[0].is_played());
        assert_eq!(input.fixtures[1].status, FixtureStatus::NotStarted);
        assert!(input.fixtures[1].kickoff.is_some());
        assert_eq!(input.tilts.get("Rosenborg"), 0.95);
        assert_eq!(input.tilts.get("Tromsø"), 1.1);
    }

    #[test]
    fn duplicate_clubs_rejected() {
        let raw = r#"{"ratings": [
            {"club": "Lyn", "rating": 1400, "date": "2025-01-01"},
            {"club": "Lyn", "rating": 1410, "date": "2025-02-01"}
        ]}"#;
        assert!(parse_season_json(raw).is_err());
    }

    #[test]
    fn bad_kickoff_is_an_error() {
        let raw = r#"{"fixtures": [
            {"id": 7, "season": 2025, "kickoff": "soon", "home": "A", "away": "B"}
        ]}"#;
        let err = parse_season_json(raw).unwrap_err();
        assert!(err.to_string().contains("fixture 7"));
    }
}
