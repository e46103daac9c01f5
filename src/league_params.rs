use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::elo::DEFAULT_K;
use crate::elo_update::EloConfig;
use crate::error::SimError;

/// Home advantage in rating points (ClubElo, Norway).
pub const DEFAULT_HOME_ADVANTAGE: f64 = 61.2;
/// Mean total goals per match, Eliteserien 2022-2025.
pub const DEFAULT_MEAN_GOALS: f64 = 3.07;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeagueParams {
    pub home_advantage: f64,
    pub mean_goals: f64,
    pub k: f64,
    // Std dev of the Gaussian added to the rating difference before a
    // simulated match. Zero disables it.
    pub noise_std_dev: f64,
}

impl Default for LeagueParams {
    fn default() -> Self {
        Self {
            home_advantage: DEFAULT_HOME_ADVANTAGE,
            mean_goals: DEFAULT_MEAN_GOALS,
            k: DEFAULT_K,
            noise_std_dev: 0.0,
        }
    }
}

impl LeagueParams {
    /// Defaults overlaid with `HFA`, `MEAN_GOALS`, `ELO_K` and `ELO_NOISE_SD`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            home_advantage: env_parse("HFA").unwrap_or(d.home_advantage).clamp(-400.0, 400.0),
            mean_goals: env_parse("MEAN_GOALS").unwrap_or(d.mean_goals).clamp(0.1, 10.0),
            k: env_parse("ELO_K").unwrap_or(d.k).clamp(0.0, 200.0),
            noise_std_dev: env_parse("ELO_NOISE_SD")
                .unwrap_or(d.noise_std_dev)
                .clamp(0.0, 400.0),
        }
    }

    pub fn elo_config(&self) -> EloConfig {
        EloConfig {
            k: self.k,
            home_adv_pts: self.home_advantage,
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let finite = [self.home_advantage, self.mean_goals, self.k, self.noise_std_dev]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(SimError::invalid("league params must be finite"));
        }
        if self.mean_goals <= 0.0 {
            return Err(SimError::invalid(format!(
                "mean goals must be positive, got {}",
                self.mean_goals
            )));
        }
        if self.noise_std_dev < 0.0 {
            return Err(SimError::invalid(format!(
                "noise std dev must not be negative, got {}",
                self.noise_std_dev
            )));
        }
        Ok(())
    }
}

pub(crate) fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
}
