use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::ratings::RatingTable;
use crate::season::{ClubAccumulator, SeasonLine, SimulationAccumulator};
use crate::table::TableRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Statistic {
    #[default]
    Mean,
    Median,
}

impl Statistic {
    pub fn apply(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            Statistic::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Statistic::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedRow {
    pub position: usize,
    pub club: String,
    pub games: f64,
    pub wins: f64,
    pub draws: f64,
    pub losses: f64,
    pub goals_for: f64,
    pub goals_against: f64,
    pub points: f64,
}

impl ExpectedRow {
    pub fn goals_label(&self) -> String {
        format!("{:.2}-{:.2}", self.goals_for, self.goals_against)
    }
}

/// Share of iterations (in percent) a club finished at each position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRow {
    pub club: String,
    pub by_position: BTreeMap<usize, f64>,
}

impl PositionRow {
    pub fn total(&self) -> f64 {
        self.by_position.values().sum()
    }

    /// Cumulative percentage over positions `first..=last`.
    pub fn window(&self, first: usize, last: usize) -> f64 {
        self.by_position.range(first..=last).map(|(_, pct)| pct).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub statistic: Statistic,
    pub iterations: usize,
    pub table: Vec<ExpectedRow>,
    /// Same club order as `table`.
    pub positions: Vec<PositionRow>,
}

impl SeasonSummary {
    pub fn row(&self, club: &str) -> Option<&ExpectedRow> {
        self.table.iter().find(|r| r.club == club)
    }

    pub fn position_row(&self, club: &str) -> Option<&PositionRow> {
        self.positions.iter().find(|r| r.club == club)
    }

    pub fn zone_probability(&self, club: &str, first: usize, last: usize) -> f64 {
        self.position_row(club)
            .map(|r| r.window(first, last))
            .unwrap_or(0.0)
    }
}

/// Reduces a finished (or stopped) run into an expected table and a
/// position-probability matrix.
pub fn summarize(
    acc: &SimulationAccumulator,
    statistic: Statistic,
) -> Result<SeasonSummary, SimError> {
    let n = acc.iterations();
    if n == 0 {
        return Err(SimError::invalid("no completed iterations to summarize"));
    }

    let mut table = acc
        .clubs()
        .map(|(club, stats)| expected_row(club, stats, statistic))
        .collect::<Vec<_>>();
    table.sort_by(|a, b| {
        b.points
            .total_cmp(&a.points)
            .then(b.goals_for.total_cmp(&a.goals_for))
            .then(a.goals_against.total_cmp(&b.goals_against))
    });
    for (idx, row) in table.iter_mut().enumerate() {
        row.position = idx + 1;
    }

    let max_position = acc
        .clubs()
        .filter_map(|(_, stats)| stats.positions.keys().next_back().copied())
        .max()
        .unwrap_or(0);
    let positions = table
        .iter()
        .map(|row| {
            let counts = acc.club(&row.club).map(|s| &s.positions);
            let by_position = (1..=max_position)
                .map(|pos| {
                    let count = counts.and_then(|c| c.get(&pos)).copied().unwrap_or(0);
                    (pos, 100.0 * count as f64 / n as f64)
                })
                .collect();
            PositionRow {
                club: row.club.clone(),
                by_position,
            }
        })
        .collect();

    Ok(SeasonSummary {
        statistic,
        iterations: n,
        table,
        positions,
    })
}

fn expected_row(club: &str, stats: &ClubAccumulator, statistic: Statistic) -> ExpectedRow {
    let metric = |f: fn(&SeasonLine) -> u32| {
        let values = stats.seasons.iter().map(|s| f(s) as f64).collect::<Vec<_>>();
        statistic.apply(&values)
    };
    ExpectedRow {
        position: 0,
        club: club.to_string(),
        games: metric(SeasonLine::games),
        wins: metric(|s| s.wins),
        draws: metric(|s| s.draws),
        losses: metric(|s| s.losses),
        goals_for: metric(|s| s.goals_for),
        goals_against: metric(|s| s.goals_against),
        points: metric(|s| s.points),
    }
}

/// Population standard deviation of a club's simulated points.
pub fn points_std_dev(stats: &ClubAccumulator) -> f64 {
    let n = stats.seasons.len();
    if n == 0 {
        return 0.0;
    }
    let mean = stats.seasons.iter().map(|s| s.points as f64).sum::<f64>() / n as f64;
    let var = stats
        .seasons
        .iter()
        .map(|s| (s.points as f64 - mean).powi(2))
        .sum::<f64>()
        / n as f64;
    var.sqrt()
}

/// A labelled contiguous window of finishing positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub label: String,
    pub first: usize,
    pub last: usize,
}

impl Zone {
    pub fn new(label: impl Into<String>, first: usize, last: usize) -> Result<Self, SimError> {
        if first == 0 || last < first {
            return Err(SimError::invalid(format!(
                "zone window {first}..={last} is not a valid position range"
            )));
        }
        Ok(Self {
            label: label.into(),
            first,
            last,
        })
    }

    /// The bottom `count` places of a league with `clubs` clubs.
    pub fn bottom(label: impl Into<String>, count: usize, clubs: usize) -> Result<Self, SimError> {
        let first = clubs.saturating_sub(count).saturating_add(1);
        Self::new(label, first, clubs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub rank: usize,
    pub club: String,
    pub rating: f64,
    pub expected_points: f64,
    pub zones: Vec<(String, f64)>,
    /// Rating rank minus expected position; positive means the club is
    /// expected to finish above where its rating puts it.
    pub position_diff: i64,
    pub uncertainty: f64,
}

pub fn season_report(
    summary: &SeasonSummary,
    acc: &SimulationAccumulator,
    ratings: &RatingTable,
    zones: &[Zone],
) -> Vec<ReportRow> {
    let club_count = summary.table.len();
    let rating_ranks = ratings.rating_ranks(summary.table.iter().map(|r| r.club.as_str()));

    let mut rows = summary
        .table
        .iter()
        .map(|row| {
            let rating_rank = rating_ranks.get(&row.club).copied().unwrap_or(club_count);
            ReportRow {
                rank: 0,
                club: row.club.clone(),
                rating: ratings.rating(&row.club).unwrap_or(0.0),
                expected_points: row.points,
                zones: zones
                    .iter()
                    .map(|z| {
                        let pct = summary.zone_probability(&row.club, z.first, z.last);
                        (z.label.clone(), pct)
                    })
                    .collect(),
                position_diff: rating_rank as i64 - row.position as i64,
                uncertainty: acc.club(&row.club).map(points_std_dev).unwrap_or(0.0),
            }
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| b.expected_points.total_cmp(&a.expected_points));
    for (idx, row) in rows.iter_mut().enumerate() {
        row.rank = idx + 1;
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableComparison {
    pub club: String,
    pub current_position: usize,
    pub expected_position: usize,
    /// Current minus expected position.
    pub position_change: i64,
    pub current_points: u32,
    pub expected_points: f64,
    pub points_above_expected: f64,
}

/// Lines up today's standings with the projected table, in expected order.
pub fn compare_with_current(current: &[TableRow], summary: &SeasonSummary) -> Vec<TableComparison> {
    let mut rows = current
        .iter()
        .filter_map(|now| {
            let exp = summary.row(&now.club)?;
            Some(TableComparison {
                club: now.club.clone(),
                current_position: now.position,
                expected_position: exp.position,
                position_change: now.position as i64 - exp.position as i64,
                current_points: now.points,
                expected_points: exp.points,
                points_above_expected: now.points as f64 - exp.points,
            })
        })
        .collect::<Vec<_>>();
    rows.sort_by_key(|r| r.expected_position);
    rows
}
