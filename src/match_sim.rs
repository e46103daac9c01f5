use std::collections::HashMap;

use rand::Rng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};

use crate::elo::{MatchContext, Outcome, Prob3, classify_outcome, expected_goals};
use crate::error::SimError;
use crate::league_params::LeagueParams;

/// How a single unplayed match is realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimMode {
    /// Draw home/draw/away from the 1X2 split; scorelines are nominal.
    Discrete,
    /// Draw each side's goals from a Poisson around its expected goals.
    #[default]
    Scoreline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedMatch {
    pub home_goals: u8,
    pub away_goals: u8,
    pub outcome: Outcome,
}

impl SimulatedMatch {
    /// Nominal scoreline recorded for a discrete draw: 2-1, 1-1 or 1-2.
    pub fn nominal(outcome: Outcome) -> Self {
        let (home_goals, away_goals) = match outcome {
            Outcome::Home => (2, 1),
            Outcome::Draw => (1, 1),
            Outcome::Away => (1, 2),
        };
        Self {
            home_goals,
            away_goals,
            outcome,
        }
    }
}

/// Maps a uniform roll in [0, 1) onto the triple. Whatever mass is left past
/// `home + draw` goes to the away side.
pub fn pick_outcome(probs: Prob3, roll: f64) -> Outcome {
    if roll < probs.home {
        Outcome::Home
    } else if roll < probs.home + probs.draw {
        Outcome::Draw
    } else {
        Outcome::Away
    }
}

pub fn draw_outcome<R: Rng + ?Sized>(probs: Prob3, rng: &mut R) -> Outcome {
    pick_outcome(probs, rng.gen_range(0.0..1.0))
}

pub fn poisson_goals<R: Rng + ?Sized>(lambda: f64, rng: &mut R) -> u8 {
    if !(lambda > 0.0 && lambda.is_finite()) {
        return 0;
    }
    match Poisson::new(lambda) {
        // Saturating cast; a three-digit score is not a football result anyway.
        Ok(dist) => {
            let goals: f64 = dist.sample(rng);
            goals as u8
        }
        Err(_) => 0,
    }
}

pub fn draw_scoreline<R: Rng + ?Sized>(
    exp_home: f64,
    exp_away: f64,
    rng: &mut R,
) -> SimulatedMatch {
    let home_goals = poisson_goals(exp_home, rng);
    let away_goals = poisson_goals(exp_away, rng);
    SimulatedMatch {
        home_goals,
        away_goals,
        outcome: classify_outcome(home_goals, away_goals),
    }
}

/// Realizes one match from its context. Consumes randomness only.
pub fn simulate_match<R: Rng + ?Sized>(
    ctx: &MatchContext,
    home_tilt: f64,
    away_tilt: f64,
    mean_goals: f64,
    mode: SimMode,
    rng: &mut R,
) -> SimulatedMatch {
    match mode {
        SimMode::Discrete => {
            SimulatedMatch::nominal(draw_outcome(ctx.result_probabilities(), rng))
        }
        SimMode::Scoreline => {
            let (exp_home, exp_away) =
                expected_goals(mean_goals, home_tilt, away_tilt, ctx.expected_home);
            draw_scoreline(exp_home, exp_away, rng)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeadToHead {
    pub trials: usize,
    pub home: usize,
    pub draw: usize,
    pub away: usize,
    pub scorelines: HashMap<(u8, u8), usize>,
}

impl HeadToHead {
    /// Percentage of trials ending in `outcome`.
    pub fn share(&self, outcome: Outcome) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        let count = match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        };
        100.0 * count as f64 / self.trials as f64
    }

    /// Most frequent scorelines with their percentage, ties by fewer goals.
    pub fn top_scorelines(&self, n: usize) -> Vec<((u8, u8), f64)> {
        let mut rows = self.scorelines.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        rows.into_iter()
            .take(n)
            .map(|(score, count)| (score, 100.0 * count as f64 / self.trials.max(1) as f64))
            .collect()
    }
}

/// Plays one pairing `trials` times, re-drawing the rating noise each time.
pub fn simulate_head_to_head<R: Rng + ?Sized>(
    home_rating: f64,
    away_rating: f64,
    tilts: (f64, f64),
    params: &LeagueParams,
    mode: SimMode,
    trials: usize,
    rng: &mut R,
) -> Result<HeadToHead, SimError> {
    if trials == 0 {
        return Err(SimError::invalid("trials must be at least 1"));
    }
    params.validate()?;

    let mut out = HeadToHead {
        trials,
        ..HeadToHead::default()
    };
    for _ in 0..trials {
        let ctx = MatchContext::with_noise(
            home_rating,
            away_rating,
            params.home_advantage,
            params.noise_std_dev,
            rng,
        );
        let m = simulate_match(&ctx, tilts.0, tilts.1, params.mean_goals, mode, rng);
        match m.outcome {
            Outcome::Home => out.home += 1,
            Outcome::Draw => out.draw += 1,
            Outcome::Away => out.away += 1,
        }
        if mode == SimMode::Scoreline {
            *out.scorelines.entry((m.home_goals, m.away_goals)).or_insert(0) += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    const EVEN: Prob3 = Prob3 {
        home: 0.355,
        draw: 0.29,
        away: 0.355,
    };

    #[test]
    fn roll_thresholds() {
        assert_eq!(pick_outcome(EVEN, 0.0), Outcome::Home);
        assert_eq!(pick_outcome(EVEN, 0.354), Outcome::Home);
        assert_eq!(pick_outcome(EVEN, 0.355), Outcome::Draw);
        assert_eq!(pick_outcome(EVEN, 0.644), Outcome::Draw);
        assert_eq!(pick_outcome(EVEN, 0.645), Outcome::Away);
        assert_eq!(pick_outcome(EVEN, 0.999), Outcome::Away);
    }

    #[test]
    fn seeded_draws_repeat() {
        let ctx = MatchContext::new(1600.0, 1550.0, 61.2);
        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..50)
                .map(|_| simulate_match(&ctx, 1.0, 1.0, 3.07, SimMode::Scoreline, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn discrete_mode_uses_nominal_scores() {
        let ctx = MatchContext::new(1500.0, 1500.0, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let m = simulate_match(&ctx, 1.0, 1.0, 3.07, SimMode::Discrete, &mut rng);
            assert_eq!(m, SimulatedMatch::nominal(m.outcome));
        }
    }

    #[test]
    fn poisson_mean_tracks_lambda() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let n = 20_000;
        let total: u64 = (0..n).map(|_| poisson_goals(1.6, &mut rng) as u64).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 1.6).abs() < 0.05, "mean {mean}");
    }

    #[test]
    fn non_positive_lambda_scores_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(poisson_goals(0.0, &mut rng), 0);
        assert_eq!(poisson_goals(-1.0, &mut rng), 0);
        assert_eq!(poisson_goals(f64::NAN, &mut rng), 0);
    }

    #[test]
    fn head_to_head_shares_cover_all_trials() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let h2h = simulate_head_to_head(
            1700.0,
            1500.0,
            (1.0, 1.0),
            &LeagueParams::default(),
            SimMode::Scoreline,
            2000,
            &mut rng,
        )
        .unwrap();
        let total = h2h.share(Outcome::Home) + h2h.share(Outcome::Draw) + h2h.share(Outcome::Away);
        assert!((total - 100.0).abs() < 1e-9);
        assert!(h2h.home > h2h.away);
        let top = h2h.top_scorelines(10);
        assert!(top.len() <= 10);
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn head_to_head_rejects_zero_trials() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let err = simulate_head_to_head(
            1500.0,
            1500.0,
            (1.0, 1.0),
            &LeagueParams::default(),
            SimMode::Discrete,
            0,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter(_)));
    }
}
