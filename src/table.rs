use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::elo::Outcome;
use crate::fixtures::{Fixture, MatchResult};

pub const POINTS_WIN: u32 = 3;
pub const POINTS_DRAW: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub position: usize,
    pub club: String,
    pub games: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i32,
    pub points: u32,
}

impl TableRow {
    fn record(&mut self, scored: u8, conceded: u8) {
        self.games += 1;
        self.goals_for += u32::from(scored);
        self.goals_against += u32::from(conceded);
        self.goal_difference += i32::from(scored) - i32::from(conceded);
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => {
                self.wins += 1;
                self.points += POINTS_WIN;
            }
            std::cmp::Ordering::Equal => {
                self.draws += 1;
                self.points += POINTS_DRAW;
            }
            std::cmp::Ordering::Less => self.losses += 1,
        }
    }

    /// "GF-GA", e.g. "34-21".
    pub fn goals_label(&self) -> String {
        format!("{}-{}", self.goals_for, self.goals_against)
    }

    /// Goal difference with an explicit sign for positive values.
    pub fn goal_difference_label(&self) -> String {
        if self.goal_difference > 0 {
            format!("+{}", self.goal_difference)
        } else {
            self.goal_difference.to_string()
        }
    }
}

/// Standings for every fixture with both scores present.
pub fn build_league_table(fixtures: &[Fixture]) -> Vec<TableRow> {
    build_table_from_results(fixtures.iter().filter_map(Fixture::result))
}

/// Aggregates completed results into ranked rows.
///
/// Only clubs with at least one result get a row. Rows are ordered by
/// points, then goal difference, then goals scored (all descending); clubs
/// still level keep club-name order so the output depends on the input set
/// alone.
pub fn build_table_from_results<'a>(
    results: impl IntoIterator<Item = MatchResult<'a>>,
) -> Vec<TableRow> {
    let mut rows: BTreeMap<&'a str, TableRow> = BTreeMap::new();
    for r in results {
        rows.entry(r.home)
            .or_default()
            .record(r.home_goals, r.away_goals);
        rows.entry(r.away)
            .or_default()
            .record(r.away_goals, r.home_goals);
    }

    let mut table = rows
        .into_iter()
        .map(|(club, row)| TableRow {
            club: club.to_string(),
            ..row
        })
        .collect::<Vec<_>>();
    table.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.goal_difference.cmp(&a.goal_difference))
            .then(b.goals_for.cmp(&a.goals_for))
    });
    for (idx, row) in table.iter_mut().enumerate() {
        row.position = idx + 1;
    }
    table
}

/// Total points handed out by a result: 3 when decisive, 2 when drawn.
pub fn points_awarded(outcome: Outcome) -> u32 {
    match outcome {
        Outcome::Draw => 2 * POINTS_DRAW,
        Outcome::Home | Outcome::Away => POINTS_WIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res<'a>(home: &'a str, away: &'a str, hg: u8, ag: u8) -> MatchResult<'a> {
        MatchResult {
            home,
            away,
            home_goals: hg,
            away_goals: ag,
        }
    }

    #[test]
    fn single_decisive_result() {
        let table = build_table_from_results([res("A", "B", 2, 0)]);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].club, "A");
        assert_eq!(table[0].points, 3);
        assert_eq!(table[0].goal_difference, 2);
        assert_eq!(table[1].points, 0);
        assert_eq!(table[1].losses, 1);
        assert_eq!(table[1].goal_difference, -2);
    }

    #[test]
    fn single_draw_gives_one_point_each() {
        let table = build_table_from_results([res("A", "B", 1, 1)]);
        assert!(table.iter().all(|r| r.points == 1 && r.draws == 1));
    }

    #[test]
    fn tie_break_order() {
        // A and C on 3 points, A ahead on goal difference. E and F are level
        // on everything, so name order decides.
        let table = build_table_from_results([
            res("A", "B", 3, 0),
            res("C", "D", 1, 0),
            res("B", "D", 2, 2),
            res("E", "F", 0, 0),
        ]);
        let order = table.iter().map(|r| r.club.as_str()).collect::<Vec<_>>();
        assert_eq!(order[0], "A");
        assert_eq!(order[1], "C");
        assert_eq!(&order[2..], &["E", "F", "D", "B"]);
        let pos = table.iter().map(|r| r.position).collect::<Vec<_>>();
        assert_eq!(pos, (1..=table.len()).collect::<Vec<_>>());
    }

    #[test]
    fn aggregate_invariants_hold() {
        let results = [
            res("A", "B", 2, 1),
            res("B", "C", 0, 0),
            res("C", "A", 4, 2),
            res("A", "C", 1, 1),
            res("B", "A", 3, 0),
        ];
        let table = build_table_from_results(results);
        let wins: u32 = table.iter().map(|r| r.wins).sum();
        let losses: u32 = table.iter().map(|r| r.losses).sum();
        assert_eq!(wins, losses);
        let expected_points: u32 = results.iter().map(|r| points_awarded(r.outcome())).sum();
        assert_eq!(table.iter().map(|r| r.points).sum::<u32>(), expected_points);
        for row in &table {
            assert_eq!(row.games, row.wins + row.draws + row.losses);
            assert_eq!(row.points, 3 * row.wins + row.draws);
            assert_eq!(
                row.goal_difference,
                row.goals_for as i32 - row.goals_against as i32
            );
        }
    }

    #[test]
    fn labels() {
        let table = build_table_from_results([res("A", "B", 3, 1)]);
        assert_eq!(table[0].goals_label(), "3-1");
        assert_eq!(table[0].goal_difference_label(), "+2");
        assert_eq!(table[1].goal_difference_label(), "-2");
    }

    #[test]
    fn identical_input_identical_output() {
        let results = vec![res("X", "Y", 1, 0), res("Y", "Z", 1, 0), res("Z", "X", 1, 0)];
        assert_eq!(
            build_table_from_results(results.clone()),
            build_table_from_results(results)
        );
    }
}
