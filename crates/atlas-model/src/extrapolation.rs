//! Analog assignments and the extrapolated per-state totals.

use serde::{Deserialize, Serialize};

use crate::profile::Geometry;

/// One of the k nearest training countries for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub country: String,
    /// Euclidean distance in standardized feature space.
    pub distance: f64,
}

/// The analog country picked for one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogAssignment {
    pub state: String,
    pub closest_country: String,
    /// Votes the winning country received among the neighbors.
    pub votes: usize,
    /// Neighbors ordered nearest first.
    pub neighbors: Vec<Neighbor>,
}

/// Estimated malaria totals for one state, scaled from its analog's rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrapolationResult {
    pub state: String,
    pub closest_country: String,
    pub pop_est: i64,
    /// `(incidence_1000 / 1000) * pop_est`
    pub total_incidence: f64,
    /// `(death_100000 / 100000) * pop_est`
    pub total_death: f64,
    pub geometry: Geometry,
}

/// Expected cases for `pop_est` people at `incidence_1000` per 1,000.
pub fn total_incidence(incidence_1000: f64, pop_est: i64) -> f64 {
    (incidence_1000 / 1000.0) * pop_est as f64
}

/// Expected deaths for `pop_est` people at `death_100000` per 100,000.
pub fn total_death(death_100000: f64, pop_est: i64) -> f64 {
    (death_100000 / 100_000.0) * pop_est as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_scale_rates_by_population() {
        assert_eq!(total_incidence(200.0, 1_000_000), 200_000.0);
        assert_eq!(total_death(50.0, 1_000_000), 500.0);
        assert_eq!(total_incidence(0.0, 5_000), 0.0);
    }
}
