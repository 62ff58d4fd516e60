//! Canonical per-entity profile tables.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::records::Keyed;

/// Polygon or multipolygon boundary, carried as WKT text.
///
/// The pipeline never inspects geometry; it only passes it through to the
/// output tables for map rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Geometry(String);

impl Geometry {
    pub fn new(wkt: impl Into<String>) -> Self {
        Self(wkt.into())
    }

    pub fn as_wkt(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One fully merged country row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryProfile {
    pub name: String,
    /// Square miles.
    pub area: f64,
    pub pop_est: i64,
    pub gdp_capita: f64,
    /// Beds per 1,000 people.
    pub hosp_beds_dens: f64,
    /// Mean annual °C.
    pub temp: f64,
    /// Cases per 1,000 at risk.
    pub incidence_1000: f64,
    /// Deaths per 100,000.
    pub death_100000: f64,
    pub continent: String,
    pub area_year: Option<i32>,
    pub temp_year: Option<i32>,
    pub hosp_year: Option<i32>,
    pub outcome_year: i32,
    pub geometry: Geometry,
}

/// One fully merged US state row. Malaria is not endemic, so the outcome
/// fields are what the extrapolation predicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateProfile {
    pub state: String,
    pub area: f64,
    pub pop_est: i64,
    pub gdp_capita: f64,
    pub temp: f64,
    pub hosp_beds_dens: f64,
    pub geometry: Geometry,
}

/// Position in the analog feature space: temperature, GDP per capita,
/// hospital-bed density.
pub type FeatureVector = [f64; 3];

impl CountryProfile {
    pub fn features(&self) -> FeatureVector {
        [self.temp, self.gdp_capita, self.hosp_beds_dens]
    }
}

impl StateProfile {
    pub fn features(&self) -> FeatureVector {
        [self.temp, self.gdp_capita, self.hosp_beds_dens]
    }
}

impl Keyed for CountryProfile {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Keyed for StateProfile {
    fn key(&self) -> &str {
        &self.state
    }
}
