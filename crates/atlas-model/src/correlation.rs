//! Correlation factor/outcome vocabulary and the result mapping.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Explanatory variable measured on each country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Factor {
    Population,
    GdpPerCapita,
    HospitalBedDensity,
    Area,
    Temperature,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::Population,
        Factor::GdpPerCapita,
        Factor::HospitalBedDensity,
        Factor::Area,
        Factor::Temperature,
    ];

    /// Upper-case code used in flat result keys.
    pub fn code(self) -> &'static str {
        match self {
            Factor::Population => "POP",
            Factor::GdpPerCapita => "GDP",
            Factor::HospitalBedDensity => "HBD",
            Factor::Area => "AREA",
            Factor::Temperature => "TEMP",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Factor::Population => "population",
            Factor::GdpPerCapita => "GDP per capita",
            Factor::HospitalBedDensity => "hospital bed density",
            Factor::Area => "area",
            Factor::Temperature => "temperature",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Malaria outcome measured on each country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Outcome {
    DeathRate,
    IncidenceRate,
}

impl Outcome {
    pub const ALL: [Outcome; 2] = [Outcome::DeathRate, Outcome::IncidenceRate];

    /// Lower-case code used in flat result keys.
    pub fn code(self) -> &'static str {
        match self {
            Outcome::DeathRate => "d",
            Outcome::IncidenceRate => "i",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::DeathRate => "death rate",
            Outcome::IncidenceRate => "incidence rate",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pearson coefficient and two-tailed significance for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationStat {
    pub r: f64,
    pub p: f64,
    /// Number of pairwise-complete observations.
    pub n: usize,
}

/// The ten `(factor, outcome)` statistics from one analysis run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationResult {
    stats: BTreeMap<(Outcome, Factor), CorrelationStat>,
}

impl CorrelationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, factor: Factor, outcome: Outcome, stat: CorrelationStat) {
        self.stats.insert((outcome, factor), stat);
    }

    pub fn get(&self, factor: Factor, outcome: Outcome) -> Option<&CorrelationStat> {
        self.stats.get(&(outcome, factor))
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Iterates pairs ordered by outcome, then factor.
    pub fn iter(&self) -> impl Iterator<Item = (Factor, Outcome, &CorrelationStat)> {
        self.stats
            .iter()
            .map(|((outcome, factor), stat)| (*factor, *outcome, stat))
    }

    /// Flat `"{r|p}_{outcome}_{FACTOR}"` mapping for one outcome.
    pub fn outcome_entries(&self, outcome: Outcome) -> BTreeMap<String, f64> {
        let mut entries = BTreeMap::new();
        for (factor, pair_outcome, stat) in self.iter() {
            if pair_outcome != outcome {
                continue;
            }
            entries.insert(flat_key("r", outcome, factor), stat.r);
            entries.insert(flat_key("p", outcome, factor), stat.p);
        }
        entries
    }

    /// Flat mapping over every pair (20 entries for a complete run).
    pub fn entries(&self) -> BTreeMap<String, f64> {
        let mut entries = BTreeMap::new();
        for outcome in Outcome::ALL {
            entries.extend(self.outcome_entries(outcome));
        }
        entries
    }
}

fn flat_key(stat: &str, outcome: Outcome, factor: Factor) -> String {
    format!("{stat}_{}_{}", outcome.code(), factor.code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_keys_follow_stat_outcome_factor_order() {
        let mut result = CorrelationResult::new();
        result.insert(
            Factor::HospitalBedDensity,
            Outcome::DeathRate,
            CorrelationStat {
                r: -0.4,
                p: 0.01,
                n: 40,
            },
        );
        let entries = result.entries();
        assert_eq!(entries.get("r_d_HBD"), Some(&-0.4));
        assert_eq!(entries.get("p_d_HBD"), Some(&0.01));
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn outcome_entries_filter_by_outcome() {
        let mut result = CorrelationResult::new();
        let stat = CorrelationStat {
            r: 0.5,
            p: 0.2,
            n: 10,
        };
        result.insert(Factor::Area, Outcome::DeathRate, stat);
        result.insert(Factor::Area, Outcome::IncidenceRate, stat);
        let incidence = result.outcome_entries(Outcome::IncidenceRate);
        assert_eq!(
            incidence.keys().collect::<Vec<_>>(),
            vec!["p_i_AREA", "r_i_AREA"]
        );
    }
}
