use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::elo::MatchContext;
use crate::fixtures::{Fixture, sort_by_schedule};
use crate::ratings::{RatingTable, TiltTable};

#[derive(Debug, Clone, Copy)]
pub struct EloConfig {
    pub k: f64,
    pub home_adv_pts: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k: crate::elo::DEFAULT_K,
            home_adv_pts: crate::league_params::DEFAULT_HOME_ADVANTAGE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub applied: usize,
    pub skipped_unknown_club: usize,
    pub skipped_stale: usize,
    /// Finished fixtures without a kickoff or without both scores.
    pub skipped_incomplete: usize,
    pub clubs_updated: BTreeSet<String>,
}

/// Replays finished fixtures on top of `ratings` in kickoff order and returns
/// the advanced table. The input table is left untouched.
///
/// A fixture is folded in only when its kickoff is strictly after the `as_of`
/// of at least one side; both sides then move together and both timestamps
/// advance to the kickoff. Each step reads ratings already moved by earlier
/// steps, so the replay is strictly sequential.
pub fn update_ratings_with_fixtures(
    ratings: &RatingTable,
    fixtures: &[Fixture],
    tilts: Option<&TiltTable>,
    cfg: EloConfig,
) -> (RatingTable, UpdateReport) {
    let mut table = ratings.clone();
    if let Some(tilts) = tilts {
        for (club, tilt) in tilts.iter() {
            if let Some(entry) = table.get_mut(club) {
                entry.tilt = tilt;
            }
        }
    }

    let mut report = UpdateReport::default();
    let mut finished = fixtures
        .iter()
        .filter(|f| f.status.is_finished())
        .collect::<Vec<_>>();
    sort_by_schedule(&mut finished);

    for fixture in finished {
        let (Some(kickoff), Some(result)) = (fixture.kickoff, fixture.result()) else {
            report.skipped_incomplete += 1;
            continue;
        };
        let (Some(home), Some(away)) = (table.get(&fixture.home), table.get(&fixture.away)) else {
            report.skipped_unknown_club += 1;
            continue;
        };
        if kickoff <= home.as_of && kickoff <= away.as_of {
            report.skipped_stale += 1;
            continue;
        }

        let ctx = MatchContext::new(home.rating, away.rating, cfg.home_adv_pts);
        let delta = ctx.exchange(result.outcome(), cfg.k);

        if let Some(home) = table.get_mut(&fixture.home) {
            home.rating += delta;
            home.as_of = kickoff;
        }
        if let Some(away) = table.get_mut(&fixture.away) {
            away.rating -= delta;
            away.as_of = kickoff;
        }
        report.applied += 1;
        report.clubs_updated.insert(fixture.home.clone());
        report.clubs_updated.insert(fixture.away.clone());
    }

    if report.skipped_unknown_club > 0 {
        debug!(
            skipped = report.skipped_unknown_club,
            "fixtures referenced clubs without a rating"
        );
    }
    info!(
        applied = report.applied,
        stale = report.skipped_stale,
        "{} clubs had their rating updated",
        report.clubs_updated.len()
    );

    (table, report)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::fixtures::FixtureStatus;
    use crate::ratings::ClubRating;

    fn at(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, d)
            .and_then(|d| d.and_hms_opt(18, 0, 0))
            .unwrap()
    }

    fn played(id: u64, d: u32, home: &str, away: &str, hg: u8, ag: u8) -> Fixture {
        Fixture {
            id,
            season: 2025,
            kickoff: Some(at(d)),
            home: home.to_string(),
            away: away.to_string(),
            home_goals: Some(hg),
            away_goals: Some(ag),
            status: FixtureStatus::Finished,
        }
    }

    fn base_table() -> RatingTable {
        RatingTable::from_entries([
            ClubRating::new("Brann", 1600.0, at(1)),
            ClubRating::new("Viking", 1600.0, at(1)),
            ClubRating::new("Molde", 1650.0, at(1)),
        ])
        .unwrap()
    }

    #[test]
    fn win_moves_points_between_clubs() {
        let cfg = EloConfig {
            k: 20.0,
            home_adv_pts: 0.0,
        };
        let fixtures = vec![played(1, 5, "Brann", "Viking", 2, 0)];
        let (out, report) = update_ratings_with_fixtures(&base_table(), &fixtures, None, cfg);
        assert_eq!(report.applied, 1);
        assert!((out.rating("Brann").unwrap() - 1610.0).abs() < 1e-9);
        assert!((out.rating("Viking").unwrap() - 1590.0).abs() < 1e-9);
        assert_eq!(out.get("Brann").unwrap().as_of, at(5));
        // Input untouched.
        assert_eq!(base_table().rating("Brann"), Some(1600.0));
    }

    #[test]
    fn replay_runs_in_kickoff_order() {
        let cfg = EloConfig::default();
        let fixtures = vec![
            played(2, 9, "Viking", "Molde", 1, 1),
            played(1, 5, "Brann", "Viking", 0, 3),
        ];
        let (ordered, _) = update_ratings_with_fixtures(&base_table(), &fixtures, None, cfg);
        let mut reversed = fixtures.clone();
        reversed.reverse();
        let (again, _) = update_ratings_with_fixtures(&base_table(), &reversed, None, cfg);
        assert_eq!(ordered, again);
    }

    #[test]
    fn unknown_clubs_are_counted_not_fatal() {
        let fixtures = vec![played(1, 5, "Brann", "Lyn", 1, 0)];
        let (out, report) =
            update_ratings_with_fixtures(&base_table(), &fixtures, None, EloConfig::default());
        assert_eq!(report.skipped_unknown_club, 1);
        assert_eq!(report.applied, 0);
        assert_eq!(out, base_table());
    }

    #[test]
    fn second_replay_changes_nothing() {
        let fixtures = vec![
            played(1, 5, "Brann", "Viking", 2, 1),
            played(2, 8, "Molde", "Brann", 0, 0),
            played(3, 12, "Viking", "Molde", 3, 2),
        ];
        let (first, report) =
            update_ratings_with_fixtures(&base_table(), &fixtures, None, EloConfig::default());
        assert_eq!(report.applied, 3);
        let (second, report) =
            update_ratings_with_fixtures(&first, &fixtures, None, EloConfig::default());
        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped_stale, 3);
        assert_eq!(first, second);
    }

    #[test]
    fn one_stale_side_still_updates_both() {
        let mut table = base_table();
        table.get_mut("Brann").unwrap().as_of = at(10);
        let (out, report) = update_ratings_with_fixtures(
            &table,
            &[played(1, 5, "Brann", "Viking", 1, 0)],
            None,
            EloConfig::default(),
        );
        assert_eq!(report.applied, 1);
        assert!(out.rating("Brann").unwrap() > 1600.0);
        assert_eq!(out.get("Brann").unwrap().as_of, at(5));
        assert_eq!(out.get("Viking").unwrap().as_of, at(5));
    }

    #[test]
    fn unfinished_and_incomplete_fixtures_are_ignored() {
        let mut pending = played(1, 5, "Brann", "Viking", 1, 0);
        pending.status = FixtureStatus::NotStarted;
        let mut missing_score = played(2, 6, "Brann", "Viking", 1, 0);
        missing_score.away_goals = None;
        let (out, report) = update_ratings_with_fixtures(
            &base_table(),
            &[pending, missing_score],
            None,
            EloConfig::default(),
        );
        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped_incomplete, 1);
        assert_eq!(out, base_table());
    }

    #[test]
    fn tilt_overrides_land_on_entries() {
        let mut tilts = TiltTable::new();
        tilts.set("Molde", 1.15);
        let (out, _) =
            update_ratings_with_fixtures(&base_table(), &[], Some(&tilts), EloConfig::default());
        assert_eq!(out.get("Molde").unwrap().tilt, 1.15);
        assert_eq!(out.get("Brann").unwrap().tilt, 1.0);
    }
}
