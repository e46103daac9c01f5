use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::elo::{Outcome, classify_outcome};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixtureStatus {
    NotStarted,
    Live,
    Finished,
    FinishedAfterExtraTime,
    FinishedAfterPenalties,
    Postponed,
    Cancelled,
    Abandoned,
    Awarded,
    Other(String),
}

impl FixtureStatus {
    /// Maps the short status codes used by fixture feeds.
    pub fn from_code(raw: &str) -> Self {
        let code = raw.trim().to_ascii_uppercase();
        match code.as_str() {
            "" | "NS" | "TBD" => FixtureStatus::NotStarted,
            "1H" | "HT" | "2H" | "ET" | "BT" | "P" | "LIVE" | "INT" | "SUSP" => FixtureStatus::Live,
            "FT" => FixtureStatus::Finished,
            "AET" => FixtureStatus::FinishedAfterExtraTime,
            "PEN" => FixtureStatus::FinishedAfterPenalties,
            "PST" => FixtureStatus::Postponed,
            "CANC" => FixtureStatus::Cancelled,
            "ABD" => FixtureStatus::Abandoned,
            "AWD" | "WO" => FixtureStatus::Awarded,
            _ => FixtureStatus::Other(raw.trim().to_string()),
        }
    }

    /// Statuses the rating replay treats as a completed result.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            FixtureStatus::Finished
                | FixtureStatus::FinishedAfterExtraTime
                | FixtureStatus::FinishedAfterPenalties
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u64,
    pub season: i32,
    pub kickoff: Option<NaiveDateTime>,
    pub home: String,
    pub away: String,
    pub home_goals: Option<u8>,
    pub away_goals: Option<u8>,
    pub status: FixtureStatus,
}

/// A completed scoreline borrowed from a fixture or produced by a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult<'a> {
    pub home: &'a str,
    pub away: &'a str,
    pub home_goals: u8,
    pub away_goals: u8,
}

impl MatchResult<'_> {
    pub fn outcome(&self) -> Outcome {
        classify_outcome(self.home_goals, self.away_goals)
    }
}

impl Fixture {
    pub fn is_played(&self) -> bool {
        self.home_goals.is_some() && self.away_goals.is_some()
    }

    pub fn result(&self) -> Option<MatchResult<'_>> {
        let (Some(home_goals), Some(away_goals)) = (self.home_goals, self.away_goals) else {
            return None;
        };
        Some(MatchResult {
            home: &self.home,
            away: &self.away,
            home_goals,
            away_goals,
        })
    }

    /// No score on either side, scheduled, and on or before `cutoff` when one
    /// is given. A half-recorded score is neither played nor projectable.
    pub fn is_projectable(&self, cutoff: Option<NaiveDateTime>) -> bool {
        if self.home_goals.is_some() || self.away_goals.is_some() {
            return false;
        }
        let Some(kickoff) = self.kickoff else {
            return false;
        };
        cutoff.is_none_or(|c| kickoff <= c)
    }

    pub fn involves(&self, club: &str) -> bool {
        self.home == club || self.away == club
    }
}

/// Orders fixtures by kickoff, then id. Unscheduled fixtures go last.
pub fn sort_by_schedule<T: std::borrow::Borrow<Fixture>>(fixtures: &mut [T]) {
    fixtures.sort_by(|a, b| {
        let (a, b) = (a.borrow(), b.borrow());
        match (a.kickoff, b.kickoff) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then(a.id.cmp(&b.id))
    });
}
