use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::elo::MatchContext;
use crate::error::SimError;
use crate::fixtures::{Fixture, MatchResult, sort_by_schedule};
use crate::league_params::{LeagueParams, env_parse};
use crate::match_sim::{SimMode, simulate_match};
use crate::ratings::{RatingTable, TiltTable};
use crate::table::{TableRow, build_table_from_results};

pub const DEFAULT_ITERATIONS: usize = 1000;
pub const DEFAULT_SEED: u64 = 42;

/// Whether simulated results move ratings for later matches of the same
/// iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RatingPolicy {
    /// Every match reads the starting table.
    Fixed,
    /// Each iteration carries its own copy and applies the exchange after
    /// every simulated match.
    #[default]
    Evolving,
}

#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    pub iterations: usize,
    pub cutoff: Option<NaiveDateTime>,
    pub season: Option<i32>,
    pub mode: SimMode,
    pub rating_policy: RatingPolicy,
    pub params: LeagueParams,
    pub seed: u64,
    /// 0 or 1 runs on the calling thread.
    pub parallelism: usize,
    pub time_budget: Option<Duration>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            cutoff: None,
            season: None,
            mode: SimMode::default(),
            rating_policy: RatingPolicy::default(),
            params: LeagueParams::default(),
            seed: DEFAULT_SEED,
            parallelism: 1,
            time_budget: None,
        }
    }
}

impl ProjectionConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let mode_raw = std::env::var("SIM_MODE").ok();
        let mode = match mode_raw.as_deref().map(str::trim) {
            Some("discrete") | Some("result") => SimMode::Discrete,
            Some("goals") | Some("scoreline") => SimMode::Scoreline,
            _ => d.mode,
        };
        let policy = std::env::var("SIM_RATING_POLICY").ok();
        let rating_policy = match policy.as_deref().map(str::trim) {
            Some("fixed") => RatingPolicy::Fixed,
            Some("evolving") => RatingPolicy::Evolving,
            _ => d.rating_policy,
        };
        Self {
            iterations: env_parse("SIM_ITERATIONS").unwrap_or(d.iterations).max(1),
            season: env_parse("SIM_SEASON"),
            mode,
            rating_policy,
            params: LeagueParams::from_env(),
            seed: env_parse("SIM_SEED").unwrap_or(d.seed),
            parallelism: env_parse("SIM_PARALLELISM").unwrap_or(d.parallelism).clamp(1, 64),
            time_budget: env_parse::<u64>("SIM_TIME_BUDGET_SECS").map(Duration::from_secs),
            ..d
        }
    }
}

/// Shared abort switch; flipping it stops the run after the iterations
/// already in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One club's line from one simulated final table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonLine {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
}

impl SeasonLine {
    pub fn games(&self) -> u32 {
        self.wins + self.draws + self.losses
    }
}

impl From<&TableRow> for SeasonLine {
    fn from(row: &TableRow) -> Self {
        Self {
            wins: row.wins,
            draws: row.draws,
            losses: row.losses,
            goals_for: row.goals_for,
            goals_against: row.goals_against,
            points: row.points,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClubAccumulator {
    /// One entry per iteration, in iteration order.
    pub seasons: Vec<SeasonLine>,
    /// Finishing position -> iteration count.
    pub positions: BTreeMap<usize, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationAccumulator {
    iterations: usize,
    clubs: BTreeMap<String, ClubAccumulator>,
}

impl SimulationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one iteration's final table in.
    pub fn record(&mut self, table: &[TableRow]) {
        self.iterations += 1;
        for row in table {
            let club = self.clubs.entry(row.club.clone()).or_default();
            club.seasons.push(SeasonLine::from(row));
            *club.positions.entry(row.position).or_insert(0) += 1;
        }
    }

    /// Appends `other`, which must cover later iterations than `self`.
    pub fn merge(&mut self, other: SimulationAccumulator) {
        self.iterations += other.iterations;
        for (name, theirs) in other.clubs {
            let ours = self.clubs.entry(name).or_default();
            ours.seasons.extend(theirs.seasons);
            for (pos, count) in theirs.positions {
                *ours.positions.entry(pos).or_insert(0) += count;
            }
        }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn club(&self, name: &str) -> Option<&ClubAccumulator> {
        self.clubs.get(name)
    }

    pub fn clubs(&self) -> impl Iterator<Item = (&str, &ClubAccumulator)> {
        self.clubs.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    pub accumulator: SimulationAccumulator,
    pub requested: usize,
    pub aborted: bool,
    pub played: usize,
    pub projected: usize,
}

impl Projection {
    pub fn completed(&self) -> usize {
        self.accumulator.iterations()
    }
}

#[derive(Debug, Clone, Copy)]
struct ScheduledMatch<'a> {
    home: &'a str,
    away: &'a str,
    home_idx: usize,
    away_idx: usize,
    home_tilt: f64,
    away_tilt: f64,
}

/// A season prepared for repeated completion: the played results, the
/// projectable fixtures in schedule order, and the starting ratings.
#[derive(Debug, Clone)]
pub struct SeasonProjector<'a> {
    config: ProjectionConfig,
    played: Vec<MatchResult<'a>>,
    schedule: Vec<ScheduledMatch<'a>>,
    start_ratings: Vec<f64>,
}

impl<'a> SeasonProjector<'a> {
    pub fn new(
        fixtures: &'a [Fixture],
        ratings: &RatingTable,
        tilts: &TiltTable,
        config: ProjectionConfig,
    ) -> Result<Self, SimError> {
        if config.iterations < 1 {
            return Err(SimError::invalid(format!(
                "iterations must be at least 1, got {}",
                config.iterations
            )));
        }
        config.params.validate()?;
        tilts.validate()?;

        let in_season = fixtures
            .iter()
            .filter(|f| config.season.is_none_or(|s| f.season == s))
            .collect::<Vec<_>>();
        let played = in_season
            .iter()
            .copied()
            .filter_map(Fixture::result)
            .collect::<Vec<_>>();
        let mut projectable = in_season
            .into_iter()
            .filter(|f| f.is_projectable(config.cutoff))
            .collect::<Vec<_>>();
        sort_by_schedule(&mut projectable);

        let mut index: HashMap<&'a str, usize> = HashMap::new();
        let mut start_ratings = Vec::new();
        let mut schedule = Vec::with_capacity(projectable.len());
        for fixture in projectable {
            let mut slot = |club: &'a str| -> Result<usize, SimError> {
                if let Some(idx) = index.get(club) {
                    return Ok(*idx);
                }
                let rating = ratings
                    .rating(club)
                    .ok_or_else(|| SimError::missing_rating(club))?;
                start_ratings.push(rating);
                index.insert(club, start_ratings.len() - 1);
                Ok(start_ratings.len() - 1)
            };
            let home_idx = slot(fixture.home.as_str())?;
            let away_idx = slot(fixture.away.as_str())?;
            schedule.push(ScheduledMatch {
                home: &fixture.home,
                away: &fixture.away,
                home_idx,
                away_idx,
                home_tilt: tilts.get(&fixture.home),
                away_tilt: tilts.get(&fixture.away),
            });
        }

        debug!(
            played = played.len(),
            projectable = schedule.len(),
            iterations = config.iterations,
            mode = ?config.mode,
            policy = ?config.rating_policy,
            "season projection prepared"
        );

        Ok(Self {
            config,
            played,
            schedule,
            start_ratings,
        })
    }

    pub fn played_count(&self) -> usize {
        self.played.len()
    }

    pub fn projected_count(&self) -> usize {
        self.schedule.len()
    }

    /// Completes the season once and returns its final table. The random
    /// stream depends only on the seed and `index`.
    pub fn run_iteration(&self, index: u64) -> Vec<TableRow> {
        let (results, _) = self.complete_season(index);
        build_table_from_results(results)
    }

    /// Played results plus one simulated result per scheduled match, and the
    /// iteration-local ratings after the last match (indexed like
    /// `start_ratings`).
    fn complete_season(&self, index: u64) -> (Vec<MatchResult<'a>>, Vec<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        rng.set_stream(index);

        let params = &self.config.params;
        let evolving = self.config.rating_policy == RatingPolicy::Evolving;
        let mut local = self.start_ratings.clone();

        let mut results = Vec::with_capacity(self.played.len() + self.schedule.len());
        results.extend_from_slice(&self.played);
        for m in &self.schedule {
            let (home_rating, away_rating) = (local[m.home_idx], local[m.away_idx]);
            let ctx = MatchContext::with_noise(
                home_rating,
                away_rating,
                params.home_advantage,
                params.noise_std_dev,
                &mut rng,
            );
            let sim = simulate_match(
                &ctx,
                m.home_tilt,
                m.away_tilt,
                params.mean_goals,
                self.config.mode,
                &mut rng,
            );
            results.push(MatchResult {
                home: m.home,
                away: m.away,
                home_goals: sim.home_goals,
                away_goals: sim.away_goals,
            });
            if evolving {
                // Exchange uses the noise-free expectation.
                let delta = MatchContext::new(home_rating, away_rating, params.home_advantage)
                    .exchange(sim.outcome, params.k);
                local[m.home_idx] += delta;
                local[m.away_idx] -= delta;
            }
        }

        (results, local)
    }

    /// Runs the configured number of iterations, stopping early on cancel or
    /// when the time budget runs out. The first iteration always completes.
    pub fn run(&self, cancel: Option<&CancelFlag>) -> Projection {
        let started = Instant::now();
        let deadline = self.config.time_budget.map(|b| started + b);
        let should_stop = |index: usize| {
            index > 0
                && (cancel.is_some_and(CancelFlag::is_cancelled)
                    || deadline.is_some_and(|d| Instant::now() >= d))
        };

        let requested = self.config.iterations;
        let accumulator = if self.config.parallelism > 1 {
            self.with_pool(|| {
                (0..requested)
                    .into_par_iter()
                    .fold(SimulationAccumulator::new, |mut acc, index| {
                        if !should_stop(index) {
                            acc.record(&self.run_iteration(index as u64));
                        }
                        acc
                    })
                    .reduce(SimulationAccumulator::new, |mut a, b| {
                        a.merge(b);
                        a
                    })
            })
        } else {
            let mut acc = SimulationAccumulator::new();
            for index in 0..requested {
                if should_stop(index) {
                    break;
                }
                acc.record(&self.run_iteration(index as u64));
            }
            acc
        };

        let aborted = accumulator.iterations() < requested;
        if aborted {
            warn!(
                completed = accumulator.iterations(),
                requested, "projection stopped early"
            );
        }
        info!(
            iterations = accumulator.iterations(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "season projection finished"
        );

        Projection {
            accumulator,
            requested,
            aborted,
            played: self.played.len(),
            projected: self.schedule.len(),
        }
    }

    fn with_pool<T: Send>(&self, action: impl FnOnce() -> T + Send) -> T {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.parallelism)
            .build()
        {
            Ok(pool) => pool.install(action),
            Err(_) => action(),
        }
    }
}

/// Prepares and runs a projection in one call.
pub fn project_season(
    fixtures: &[Fixture],
    ratings: &RatingTable,
    tilts: &TiltTable,
    config: ProjectionConfig,
    cancel: Option<&CancelFlag>,
) -> Result<Projection, SimError> {
    Ok(SeasonProjector::new(fixtures, ratings, tilts, config)?.run(cancel))
}
