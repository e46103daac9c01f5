use rand::Rng;
use rand_distr::StandardNormal;

pub const DEFAULT_K: f64 = 20.0;

const DRAW_BASE: f64 = 0.29;
const DRAW_SLOPE: f64 = 0.0006;
const DRAW_MIN: f64 = 0.12;
const DRAW_MAX: f64 = 0.35;
// Floor applied when splitting the 1X2 triple.
const DRAW_FLOOR: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    /// Actual score from the home side's perspective.
    pub fn home_score(self) -> f64 {
        match self {
            Outcome::Home => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Away => 0.0,
        }
    }
}

pub fn classify_outcome(home_goals: u8, away_goals: u8) -> Outcome {
    if home_goals > away_goals {
        Outcome::Home
    } else if home_goals < away_goals {
        Outcome::Away
    } else {
        Outcome::Draw
    }
}

/// Home/draw/away probabilities.
///
/// Built by [`split_result_probabilities`], which clamps each side
/// independently, so `mass()` is not always exactly 1. It stays within
/// `[1.0, 1.0 + draw / 2]`; in practice the excess only appears once the
/// expected score passes `1 - draw / 2` and never reaches 0.06.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn mass(&self) -> f64 {
        self.home + self.draw + self.away
    }
}

/// Ratings of both sides at kick-off plus the derived expectation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchContext {
    pub home_rating: f64,
    pub away_rating: f64,
    pub home_advantage: f64,
    pub dr: f64,
    pub expected_home: f64,
}

impl MatchContext {
    pub fn new(home_rating: f64, away_rating: f64, home_advantage: f64) -> Self {
        let (expected_home, dr) = expected_score(home_rating, away_rating, home_advantage);
        Self {
            home_rating,
            away_rating,
            home_advantage,
            dr,
            expected_home,
        }
    }

    /// Pre-match context with zero-mean Gaussian noise on the rating difference.
    /// Never use this for replaying real results.
    pub fn with_noise<R: Rng + ?Sized>(
        home_rating: f64,
        away_rating: f64,
        home_advantage: f64,
        noise_std_dev: f64,
        rng: &mut R,
    ) -> Self {
        let (expected_home, dr) =
            expected_score_noisy(home_rating, away_rating, home_advantage, noise_std_dev, rng);
        Self {
            home_rating,
            away_rating,
            home_advantage,
            dr,
            expected_home,
        }
    }

    pub fn result_probabilities(&self) -> Prob3 {
        split_result_probabilities(self.expected_home, self.dr)
    }

    pub fn exchange(&self, outcome: Outcome, k: f64) -> f64 {
        rating_exchange(self.expected_home, outcome, k)
    }
}

/// Returns `(e, dr)`: the home side's expected score and the rating difference
/// including home advantage.
pub fn expected_score(rating_home: f64, rating_away: f64, home_advantage: f64) -> (f64, f64) {
    let dr = rating_home + home_advantage - rating_away;
    (logistic(dr), dr)
}

pub fn expected_score_noisy<R: Rng + ?Sized>(
    rating_home: f64,
    rating_away: f64,
    home_advantage: f64,
    noise_std_dev: f64,
    rng: &mut R,
) -> (f64, f64) {
    let mut dr = rating_home + home_advantage - rating_away;
    if noise_std_dev > 0.0 && noise_std_dev.is_finite() {
        let z: f64 = rng.sample(StandardNormal);
        dr += z * noise_std_dev;
    }
    (logistic(dr), dr)
}

/// Points moved to the home side (and taken from the away side).
pub fn rating_exchange(expected_home: f64, outcome: Outcome, k: f64) -> f64 {
    (outcome.home_score() - expected_home) * k
}

pub fn draw_probability(dr: f64) -> f64 {
    (DRAW_BASE - DRAW_SLOPE * dr.abs()).clamp(DRAW_MIN, DRAW_MAX)
}

pub fn split_result_probabilities(expected_home: f64, dr: f64) -> Prob3 {
    let draw = draw_probability(dr).max(DRAW_FLOOR);
    let home = (expected_home - draw / 2.0).clamp(0.0, 1.0);
    let away = (1.0 - home - draw).clamp(0.0, 1.0);
    Prob3 { home, draw, away }
}

/// Splits the tilted goal total between the sides by expected score.
pub fn expected_goals(
    total_expected_goals: f64,
    home_tilt: f64,
    away_tilt: f64,
    expected_home: f64,
) -> (f64, f64) {
    let total = home_tilt * away_tilt * total_expected_goals;
    (total * expected_home, total * (1.0 - expected_home))
}

fn logistic(dr: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf(-dr / 400.0))
}
