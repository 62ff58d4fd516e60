//! Per-feature records produced by the source normalizers.
//!
//! Every record is keyed by the entity name exactly as it appears in its
//! source (whitespace-trimmed). Spelling variants across sources are not
//! reconciled; they surface later as join mismatches.

use serde::{Deserialize, Serialize};

use crate::profile::Geometry;

/// Anything the merge engine can index by entity name.
pub trait Keyed {
    fn key(&self) -> &str;
}

macro_rules! keyed {
    ($($ty:ty),+ $(,)?) => {
        $(impl Keyed for $ty {
            fn key(&self) -> &str {
                &self.name
            }
        })+
    };
}

/// Land area in square miles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    pub name: String,
    pub area: f64,
    /// Year the measurement refers to, when the source carries one.
    pub area_year: Option<i32>,
}

/// Mean annual temperature in degrees Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRecord {
    pub name: String,
    pub temp: f64,
    pub temp_year: Option<i32>,
    /// Mean measurement uncertainty over the averaged rows.
    pub uncertainty: Option<f64>,
}

/// Hospital beds per 1,000 people.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalRecord {
    pub name: String,
    pub hosp_beds_dens: f64,
    pub hosp_year: Option<i32>,
}

/// Country shape row with the GDP and population estimates it ships with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub name: String,
    /// GDP estimate in millions of dollars.
    pub gdp_md_est: f64,
    pub pop_est: i64,
    pub gdp_year: Option<i32>,
    pub pop_year: Option<i32>,
    pub continent: String,
    /// `gdp_md_est / pop_est`, unscaled.
    pub gdp_capita: f64,
    pub geometry: Geometry,
}

/// Malaria cases per 1,000 population at risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidenceRecord {
    pub name: String,
    pub code: Option<String>,
    pub year: i32,
    pub incidence_1000: f64,
}

/// Age-standardized malaria deaths per 100,000 people.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub name: String,
    pub code: Option<String>,
    pub year: i32,
    pub death_100000: f64,
}

/// Incidence and death rate for one country in the outcome reference year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub name: String,
    pub year: i32,
    pub incidence_1000: f64,
    pub death_100000: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub name: String,
    pub pop_est: i64,
    pub pop_year: Option<i32>,
}

/// GDP in millions of dollars, the same unit as the country shape source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdpRecord {
    pub name: String,
    pub gdp_md_est: f64,
    pub gdp_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateShapeRecord {
    pub name: String,
    pub geometry: Geometry,
}

keyed!(
    AreaRecord,
    TemperatureRecord,
    HospitalRecord,
    ShapeRecord,
    IncidenceRecord,
    DeathRecord,
    OutcomeRecord,
    PopulationRecord,
    GdpRecord,
    StateShapeRecord,
);
