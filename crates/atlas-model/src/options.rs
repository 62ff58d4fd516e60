//! Configuration options for the atlas pipeline.
//!
//! Defaults reproduce the reference analysis: World Bank area for 2010,
//! Berkeley Earth temperatures for 2013, OWID malaria rates for 2015, k = 5
//! neighbors, and Alaska/Hawaii excluded from the extrapolation. Every field
//! can be overridden from a TOML file; missing keys fall back to defaults.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AtlasError, Result};

/// Square kilometers to square miles.
pub const SQ_KM_TO_SQ_MI: f64 = 0.386102;

/// Unit of an area column in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    #[default]
    SquareKilometers,
    SquareMiles,
}

impl AreaUnit {
    pub fn to_square_miles(self, value: f64) -> f64 {
        match self {
            AreaUnit::SquareKilometers => value * SQ_KM_TO_SQ_MI,
            AreaUnit::SquareMiles => value,
        }
    }
}

/// Unit of a temperature column in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }
}

/// How the incidence and death tables are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Keep every incidence row, attach a death rate where one matches, then
    /// drop rows still missing a death rate. Death-only countries never
    /// appear.
    #[default]
    LeftFavoringIncidence,
    /// Keep only keys present in both tables.
    Inner,
}

impl fmt::Display for JoinPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinPolicy::LeftFavoringIncidence => f.write_str("left_favoring_incidence"),
            JoinPolicy::Inner => f.write_str("inner"),
        }
    }
}

/// Every input the pipeline reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    CountryArea,
    CountryTemperature,
    CountryHospital,
    CountryShape,
    MalariaIncidence,
    MalariaDeath,
    StateArea,
    StatePopulation,
    StateTemperature,
    StateHospital,
    StateGdp,
    StateShape,
}

impl SourceKind {
    pub const ALL: [SourceKind; 12] = [
        SourceKind::CountryArea,
        SourceKind::CountryTemperature,
        SourceKind::CountryHospital,
        SourceKind::CountryShape,
        SourceKind::MalariaIncidence,
        SourceKind::MalariaDeath,
        SourceKind::StateArea,
        SourceKind::StatePopulation,
        SourceKind::StateTemperature,
        SourceKind::StateHospital,
        SourceKind::StateGdp,
        SourceKind::StateShape,
    ];

    /// Stable name used in logs and the exclusion audit.
    pub fn name(self) -> &'static str {
        match self {
            SourceKind::CountryArea => "country_area",
            SourceKind::CountryTemperature => "country_temperature",
            SourceKind::CountryHospital => "country_hospital",
            SourceKind::CountryShape => "country_shape",
            SourceKind::MalariaIncidence => "malaria_incidence",
            SourceKind::MalariaDeath => "malaria_death",
            SourceKind::StateArea => "state_area",
            SourceKind::StatePopulation => "state_population",
            SourceKind::StateTemperature => "state_temperature",
            SourceKind::StateHospital => "state_hospital",
            SourceKind::StateGdp => "state_gdp",
            SourceKind::StateShape => "state_shape",
        }
    }

    /// Column that must be present to locate the header row.
    pub fn key_column(self, options: &PipelineOptions) -> &str {
        let countries = &options.countries;
        let states = &options.states;
        match self {
            SourceKind::CountryArea => &countries.area.key,
            SourceKind::CountryTemperature => &countries.temperature.key,
            SourceKind::CountryHospital => &countries.hospital.key,
            SourceKind::CountryShape => &countries.shape.name,
            SourceKind::MalariaIncidence => &countries.incidence.key,
            SourceKind::MalariaDeath => &countries.death.key,
            SourceKind::StateArea => &states.area.key,
            SourceKind::StatePopulation => &states.population.key,
            SourceKind::StateTemperature => &states.temperature.key,
            SourceKind::StateHospital => &states.hospital.key,
            SourceKind::StateGdp => &states.gdp.key,
            SourceKind::StateShape => &states.shape.key,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// File names of each source inside the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceLayout {
    pub country_area: String,
    pub country_temperature: String,
    pub country_hospital: String,
    pub country_shape: String,
    pub malaria_incidence: String,
    pub malaria_death: String,
    pub state_area: String,
    pub state_population: String,
    pub state_temperature: String,
    pub state_hospital: String,
    pub state_gdp: String,
    pub state_shape: String,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            country_area: "API_AG.LND.TOTL.K2_DS2_en_csv_v2_822348.csv".to_string(),
            country_temperature: "GlobalLandTemperaturesByCountry.csv".to_string(),
            country_hospital: "API_SH.MED.BEDS.ZS_DS2_en_csv_v2_867087.csv".to_string(),
            country_shape: "ne_110m_admin_0_countries.csv".to_string(),
            malaria_incidence: "incidence-of-malaria.csv".to_string(),
            malaria_death: "malaria-death-rates.csv".to_string(),
            state_area: "state_area.csv".to_string(),
            state_population: "state_population.csv".to_string(),
            state_temperature: "state_temperature.csv".to_string(),
            state_hospital: "state_hospital_beds.csv".to_string(),
            state_gdp: "state_gdp.csv".to_string(),
            state_shape: "us_states.csv".to_string(),
        }
    }
}

impl SourceLayout {
    pub fn file_name(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::CountryArea => &self.country_area,
            SourceKind::CountryTemperature => &self.country_temperature,
            SourceKind::CountryHospital => &self.country_hospital,
            SourceKind::CountryShape => &self.country_shape,
            SourceKind::MalariaIncidence => &self.malaria_incidence,
            SourceKind::MalariaDeath => &self.malaria_death,
            SourceKind::StateArea => &self.state_area,
            SourceKind::StatePopulation => &self.state_population,
            SourceKind::StateTemperature => &self.state_temperature,
            SourceKind::StateHospital => &self.state_hospital,
            SourceKind::StateGdp => &self.state_gdp,
            SourceKind::StateShape => &self.state_shape,
        }
    }
}

/// Wide table with one column per year (World Bank layout); the value is
/// read from the column named after `year`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearColumnSource {
    pub key: String,
    pub year: i32,
    #[serde(default)]
    pub unit: AreaUnit,
}

/// Wide table with one column per year; the most recent populated year at
/// or below `max_year` is used for each row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestYearSource {
    pub key: String,
    #[serde(default)]
    pub max_year: Option<i32>,
}

/// Long table of dated temperature readings, averaged per key for `year`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureSource {
    pub key: String,
    pub date: String,
    pub value: String,
    #[serde(default)]
    pub uncertainty: Option<String>,
    pub year: i32,
    #[serde(default)]
    pub unit: TemperatureUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeSource {
    pub name: String,
    pub gdp: String,
    pub population: String,
    pub gdp_year: String,
    pub pop_year: String,
    pub continent: String,
    pub geometry: String,
}

/// Long table of yearly rates (OWID layout), filtered to `year`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSource {
    pub key: String,
    pub code: String,
    pub year_column: String,
    pub value: String,
    pub year: i32,
}

/// Plain key/value table with an optional year filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSource {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub year_column: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl ValueSource {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            year_column: None,
            year: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometrySource {
    pub key: String,
    pub geometry: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountrySources {
    pub area: YearColumnSource,
    pub temperature: TemperatureSource,
    pub hospital: LatestYearSource,
    pub shape: ShapeSource,
    pub incidence: RateSource,
    pub death: RateSource,
}

impl Default for CountrySources {
    fn default() -> Self {
        Self {
            area: YearColumnSource {
                key: "Country Name".to_string(),
                year: 2010,
                unit: AreaUnit::SquareKilometers,
            },
            temperature: TemperatureSource {
                key: "Country".to_string(),
                date: "dt".to_string(),
                value: "AverageTemperature".to_string(),
                uncertainty: Some("AverageTemperatureUncertainty".to_string()),
                year: 2013,
                unit: TemperatureUnit::Celsius,
            },
            hospital: LatestYearSource {
                key: "Country Name".to_string(),
                max_year: None,
            },
            shape: ShapeSource {
                name: "NAME".to_string(),
                gdp: "GDP_MD_EST".to_string(),
                population: "POP_EST".to_string(),
                gdp_year: "GDP_YEAR".to_string(),
                pop_year: "POP_YEAR".to_string(),
                continent: "CONTINENT".to_string(),
                geometry: "geometry".to_string(),
            },
            incidence: RateSource {
                key: "Entity".to_string(),
                code: "Code".to_string(),
                year_column: "Year".to_string(),
                value: "Incidence of malaria (per 1,000 population at risk) \
                        (per 1,000 population at risk)"
                    .to_string(),
                year: 2015,
            },
            death: RateSource {
                key: "Entity".to_string(),
                code: "Code".to_string(),
                year_column: "Year".to_string(),
                value: "Deaths - Malaria - Sex: Both - Age: Age-standardized (Rate) \
                        (per 100,000 people)"
                    .to_string(),
                year: 2015,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSources {
    pub area: ValueSource,
    pub area_unit: AreaUnit,
    pub population: ValueSource,
    pub temperature: ValueSource,
    pub temperature_unit: TemperatureUnit,
    pub hospital: ValueSource,
    pub gdp: ValueSource,
    pub shape: GeometrySource,
}

impl Default for StateSources {
    fn default() -> Self {
        Self {
            area: ValueSource::new("State", "AREA_SQ_MI"),
            area_unit: AreaUnit::SquareMiles,
            population: ValueSource::new("State", "POP_EST"),
            temperature: ValueSource::new("State", "AVG_TEMP_F"),
            temperature_unit: TemperatureUnit::Fahrenheit,
            hospital: ValueSource::new("State", "HOSP_BEDS_PER_1000"),
            gdp: ValueSource::new("State", "GDP_MD_EST"),
            shape: GeometrySource {
                key: "NAME".to_string(),
                geometry: "geometry".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Policy for the incidence/death sub-merge.
    pub outcome_join: JoinPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalogOptions {
    /// Neighbors consulted per state.
    pub k: usize,
}

impl Default for AnalogOptions {
    fn default() -> Self {
        Self { k: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrapolationOptions {
    /// States left out of the extrapolation table by policy.
    #[serde(deserialize_with = "trimmed_names")]
    pub excluded_states: BTreeSet<String>,
}

/// Names read from config are trimmed; blank entries are dropped.
fn trimmed_names<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    Ok(names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect())
}

impl Default for ExtrapolationOptions {
    fn default() -> Self {
        Self {
            excluded_states: ["Alaska", "Hawaii"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ExtrapolationOptions {
    pub fn is_excluded(&self, state: &str) -> bool {
        self.excluded_states.contains(state.trim())
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub layout: SourceLayout,
    pub countries: CountrySources,
    pub states: StateSources,
    pub merge: MergeOptions,
    pub analog: AnalogOptions,
    pub extrapolation: ExtrapolationOptions,
}

impl PipelineOptions {
    /// Loads options from a TOML file; omitted keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AtlasError::io(path, e))?;
        Self::from_toml_str(&contents).map_err(|source| AtlasError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_analysis() {
        let options = PipelineOptions::default();
        assert_eq!(options.countries.area.year, 2010);
        assert_eq!(options.countries.temperature.year, 2013);
        assert_eq!(options.countries.incidence.year, 2015);
        assert_eq!(options.countries.death.year, 2015);
        assert_eq!(options.analog.k, 5);
        assert_eq!(options.merge.outcome_join, JoinPolicy::LeftFavoringIncidence);
        assert!(options.extrapolation.is_excluded("Alaska"));
        assert!(options.extrapolation.is_excluded("Hawaii"));
        assert!(!options.extrapolation.is_excluded("Texas"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let options = PipelineOptions::from_toml_str(
            r#"
            [analog]
            k = 3

            [merge]
            outcome_join = "inner"

            [extrapolation]
            excluded_states = ["Alaska"]
            "#,
        )
        .expect("parse options");
        assert_eq!(options.analog.k, 3);
        assert_eq!(options.merge.outcome_join, JoinPolicy::Inner);
        assert!(!options.extrapolation.is_excluded("Hawaii"));
        assert_eq!(options.countries.area.year, 2010);
        assert_eq!(options.layout, SourceLayout::default());
    }

    #[test]
    fn configured_state_names_are_trimmed() {
        let options = PipelineOptions::from_toml_str(
            r#"
            [extrapolation]
            excluded_states = [" Alaska", "Texas  ", "  "]
            "#,
        )
        .expect("parse options");
        assert!(options.extrapolation.is_excluded("Alaska"));
        assert!(options.extrapolation.is_excluded("Texas"));
        assert_eq!(options.extrapolation.excluded_states.len(), 2);
    }

    #[test]
    fn unit_conversions() {
        assert!((AreaUnit::SquareKilometers.to_square_miles(100.0) - 38.6102).abs() < 1e-9);
        assert_eq!(AreaUnit::SquareMiles.to_square_miles(12.5), 12.5);
        assert!((TemperatureUnit::Fahrenheit.to_celsius(212.0) - 100.0).abs() < 1e-9);
        assert_eq!(TemperatureUnit::Celsius.to_celsius(21.0), 21.0);
    }
}
