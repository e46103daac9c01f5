use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

pub const DEFAULT_TILT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubRating {
    pub name: String,
    pub rating: f64,
    pub as_of: NaiveDateTime,
    #[serde(default = "default_tilt")]
    pub tilt: f64,
}

fn default_tilt() -> f64 {
    DEFAULT_TILT
}

impl ClubRating {
    pub fn new(name: impl Into<String>, rating: f64, as_of: NaiveDateTime) -> Self {
        Self {
            name: name.into(),
            rating,
            as_of,
            tilt: DEFAULT_TILT,
        }
    }
}

/// Club name -> rating entry. Names are matched exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingTable {
    entries: BTreeMap<String, ClubRating>,
}

impl RatingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table, rejecting duplicate club names.
    pub fn from_entries(entries: impl IntoIterator<Item = ClubRating>) -> Result<Self, SimError> {
        let mut table = Self::new();
        for entry in entries {
            if table.entries.contains_key(&entry.name) {
                return Err(SimError::invalid(format!(
                    "duplicate rating entry for `{}`",
                    entry.name
                )));
            }
            table.insert(entry);
        }
        Ok(table)
    }

    pub fn insert(&mut self, entry: ClubRating) {
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn get(&self, club: &str) -> Option<&ClubRating> {
        self.entries.get(club)
    }

    pub fn get_mut(&mut self, club: &str) -> Option<&mut ClubRating> {
        self.entries.get_mut(club)
    }

    pub fn rating(&self, club: &str) -> Option<f64> {
        self.entries.get(club).map(|e| e.rating)
    }

    pub fn contains(&self, club: &str) -> bool {
        self.entries.contains_key(club)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in club-name order.
    pub fn iter(&self) -> impl Iterator<Item = &ClubRating> {
        self.entries.values()
    }

    /// Rank 1..N by rating (highest first) among `clubs`. Clubs missing from
    /// the table are left out.
    pub fn rating_ranks<'a>(
        &self,
        clubs: impl IntoIterator<Item = &'a str>,
    ) -> HashMap<String, usize> {
        let mut rated = clubs
            .into_iter()
            .filter_map(|club| self.get(club).map(|e| (club, e.rating)))
            .collect::<Vec<_>>();
        rated.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        rated.dedup_by(|a, b| a.0 == b.0);
        rated
            .into_iter()
            .enumerate()
            .map(|(idx, (club, _))| (club.to_string(), idx + 1))
            .collect()
    }
}

/// Per-club offensive multiplier; clubs without an entry use 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TiltTable {
    tilts: HashMap<String, f64>,
}

impl TiltTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ratings(table: &RatingTable) -> Self {
        let tilts = table
            .iter()
            .filter(|e| e.tilt != DEFAULT_TILT)
            .map(|e| (e.name.clone(), e.tilt))
            .collect();
        Self { tilts }
    }

    pub fn set(&mut self, club: impl Into<String>, tilt: f64) {
        self.tilts.insert(club.into(), tilt);
    }

    pub fn get(&self, club: &str) -> f64 {
        self.tilts.get(club).copied().unwrap_or(DEFAULT_TILT)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.tilts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn validate(&self) -> Result<(), SimError> {
        for (club, tilt) in self.iter() {
            if !(tilt.is_finite() && tilt > 0.0) {
                return Err(SimError::invalid(format!(
                    "tilt for `{club}` must be a positive number, got {tilt}"
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, f64)> for TiltTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            tilts: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, d)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = RatingTable::from_entries([
            ClubRating::new("Molde", 1600.0, day(1)),
            ClubRating::new("Molde", 1610.0, day(2)),
        ])
        .unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter(_)));
    }

    #[test]
    fn rating_ranks_order_by_rating() {
        let table = RatingTable::from_entries([
            ClubRating::new("Brann", 1580.0, day(1)),
            ClubRating::new("Bodø/Glimt", 1750.0, day(1)),
            ClubRating::new("Viking", 1600.0, day(1)),
        ])
        .unwrap();
        let ranks = table.rating_ranks(["Viking", "Brann", "Bodø/Glimt", "Unknown"]);
        assert_eq!(ranks.get("Bodø/Glimt"), Some(&1));
        assert_eq!(ranks.get("Viking"), Some(&2));
        assert_eq!(ranks.get("Brann"), Some(&3));
        assert!(!ranks.contains_key("Unknown"));
    }

    #[test]
    fn tilt_defaults_and_validation() {
        let mut tilts = TiltTable::new();
        assert_eq!(tilts.get("Odd"), 1.0);
        tilts.set("Odd", 1.2);
        assert_eq!(tilts.get("Odd"), 1.2);
        assert!(tilts.validate().is_ok());
        tilts.set("Jerv", 0.0);
        assert!(tilts.validate().is_err());
    }
}
