//! Nearest-neighbor analog classifier.
//!
//! Countries are points in the standardized feature space {temperature, GDP
//! per capita, hospital-bed density}. A state's analog is the plurality vote
//! among its k nearest countries.

use std::collections::BTreeMap;

use tracing::{debug, info};

use atlas_model::{
    AnalogAssignment, AnalogOptions, AtlasError, CountryProfile, FeatureVector, Neighbor, Result,
    StateProfile,
};

fn invalid(message: impl Into<String>) -> AtlasError {
    AtlasError::InvalidModel {
        message: message.into(),
    }
}

fn ensure_finite(label: &str, features: &FeatureVector) -> Result<()> {
    if features.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(invalid(format!("{label} has non-finite features {features:?}")))
    }
}

/// Per-feature standardization fitted on the training countries.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: FeatureVector,
    scale: FeatureVector,
}

impl StandardScaler {
    /// Fits mean and population standard deviation; a constant feature
    /// gets scale 1 so it contributes nothing to distances.
    pub fn fit(points: &[FeatureVector]) -> Result<Self> {
        if points.is_empty() {
            return Err(invalid("cannot fit a scaler on zero points"));
        }
        let count = points.len() as f64;
        let mut mean = [0.0; 3];
        for point in points {
            for (m, v) in mean.iter_mut().zip(point) {
                *m += v / count;
            }
        }
        let mut variance = [0.0; 3];
        for point in points {
            for ((acc, v), m) in variance.iter_mut().zip(point).zip(&mean) {
                *acc += (v - m) * (v - m) / count;
            }
        }
        let scale = variance.map(|var| {
            let std = var.sqrt();
            if std > 0.0 { std } else { 1.0 }
        });
        Ok(Self { mean, scale })
    }

    pub fn transform(&self, features: &FeatureVector) -> FeatureVector {
        let mut out = [0.0; 3];
        for (idx, value) in out.iter_mut().enumerate() {
            *value = (features[idx] - self.mean[idx]) / self.scale[idx];
        }
        out
    }

    pub fn mean(&self) -> &FeatureVector {
        &self.mean
    }

    pub fn scale(&self) -> &FeatureVector {
        &self.scale
    }
}

fn distance(a: &FeatureVector, b: &FeatureVector) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// A fitted scaler plus the standardized countries it was trained on.
///
/// Fitting never mutates shared state; predictions borrow the model.
#[derive(Debug, Clone)]
pub struct AnalogModel {
    scaler: StandardScaler,
    points: Vec<(String, FeatureVector)>,
    k: usize,
}

impl AnalogModel {
    pub fn fit(countries: &[CountryProfile], options: &AnalogOptions) -> Result<Self> {
        if countries.is_empty() {
            return Err(invalid("no training countries"));
        }
        if options.k == 0 {
            return Err(invalid("k must be at least 1"));
        }
        let raw: Vec<FeatureVector> = countries.iter().map(CountryProfile::features).collect();
        for (country, features) in countries.iter().zip(&raw) {
            ensure_finite(&country.name, features)?;
        }
        let scaler = StandardScaler::fit(&raw)?;
        let mut points: Vec<(String, FeatureVector)> = countries
            .iter()
            .zip(&raw)
            .map(|(country, features)| (country.name.clone(), scaler.transform(features)))
            .collect();
        points.sort_by(|a, b| a.0.cmp(&b.0));
        let k = options.k.min(points.len());
        info!(
            countries = points.len(),
            k,
            requested_k = options.k,
            "analog model fitted"
        );
        Ok(Self { scaler, points, k })
    }

    /// Effective neighbor count, capped at the number of countries.
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// The k nearest countries to raw `features`, nearest first. Equal
    /// distances order by country name.
    pub fn neighbors(&self, features: &FeatureVector) -> Vec<Neighbor> {
        let query = self.scaler.transform(features);
        let mut ranked: Vec<(f64, &str)> = self
            .points
            .iter()
            .map(|(name, point)| (distance(&query, point), name.as_str()))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        ranked
            .into_iter()
            .take(self.k)
            .map(|(distance, country)| Neighbor {
                country: country.to_string(),
                distance,
            })
            .collect()
    }

    pub fn predict(&self, state: &StateProfile) -> Result<AnalogAssignment> {
        let features = state.features();
        ensure_finite(&state.state, &features)?;
        let neighbors = self.neighbors(&features);
        let (closest_country, votes) = plurality(&neighbors)
            .ok_or_else(|| invalid(format!("no neighbors found for {}", state.state)))?;
        debug!(
            state = %state.state,
            closest_country = %closest_country,
            votes,
            "analog assigned"
        );
        Ok(AnalogAssignment {
            state: state.state.clone(),
            closest_country,
            votes,
            neighbors,
        })
    }

    /// One assignment per state, in input order.
    pub fn predict_all(&self, states: &[StateProfile]) -> Result<Vec<AnalogAssignment>> {
        let assignments = states
            .iter()
            .map(|state| self.predict(state))
            .collect::<Result<Vec<_>>>()?;
        info!(states = assignments.len(), "analogs assigned");
        Ok(assignments)
    }
}

/// Most-voted country; ties go to the alphabetically lowest name.
fn plurality(neighbors: &[Neighbor]) -> Option<(String, usize)> {
    let mut votes: BTreeMap<&str, usize> = BTreeMap::new();
    for neighbor in neighbors {
        *votes.entry(neighbor.country.as_str()).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (country, count) in votes {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((country, count));
        }
    }
    best.map(|(country, count)| (country.to_string(), count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaler_uses_population_std() {
        let scaler =
            StandardScaler::fit(&[[0.0, 1.0, 5.0], [2.0, 3.0, 5.0]]).unwrap();
        assert_eq!(scaler.mean(), &[1.0, 2.0, 5.0]);
        assert_eq!(scaler.scale(), &[1.0, 1.0, 1.0]);
        assert_eq!(scaler.transform(&[2.0, 3.0, 7.0]), [1.0, 1.0, 2.0]);
    }

    #[test]
    fn plurality_breaks_ties_by_name() {
        let neighbors: Vec<Neighbor> = ["Peru", "Chad", "Peru", "Chad", "Mali"]
            .iter()
            .map(|c| Neighbor {
                country: (*c).to_string(),
                distance: 0.0,
            })
            .collect();
        assert_eq!(plurality(&neighbors), Some(("Chad".to_string(), 2)));
        assert_eq!(plurality(&[]), None);
    }
}
