//! All normalized tables for one run.

use tracing::info_span;

use atlas_ingest::SourceFrames;
use atlas_model::{
    AreaRecord, CountrySources, DeathRecord, ExclusionReport, GdpRecord, HospitalRecord,
    IncidenceRecord, PopulationRecord, ShapeRecord, SourceKind, StateShapeRecord, StateSources,
    TemperatureRecord,
};

use crate::country::{
    normalize_country_area, normalize_country_hospital, normalize_country_shape,
    normalize_country_temperature, normalize_malaria_death, normalize_malaria_incidence,
};
use crate::normalized::Normalized;
use crate::state::{
    normalize_state_area, normalize_state_gdp, normalize_state_hospital,
    normalize_state_population, normalize_state_shape, normalize_state_temperature,
};

#[derive(Debug, Clone, Default)]
pub struct CountryTables {
    pub area: Normalized<AreaRecord>,
    pub temperature: Normalized<TemperatureRecord>,
    pub hospital: Normalized<HospitalRecord>,
    pub shape: Normalized<ShapeRecord>,
    pub incidence: Normalized<IncidenceRecord>,
    pub death: Normalized<DeathRecord>,
}

impl CountryTables {
    /// Exclusions from every country source, in source order.
    pub fn report(&self) -> ExclusionReport {
        let mut report = ExclusionReport::new();
        report.extend(self.area.report.clone());
        report.extend(self.temperature.report.clone());
        report.extend(self.hospital.report.clone());
        report.extend(self.shape.report.clone());
        report.extend(self.incidence.report.clone());
        report.extend(self.death.report.clone());
        report
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateTables {
    pub area: Normalized<AreaRecord>,
    pub population: Normalized<PopulationRecord>,
    pub temperature: Normalized<TemperatureRecord>,
    pub hospital: Normalized<HospitalRecord>,
    pub gdp: Normalized<GdpRecord>,
    pub shape: Normalized<StateShapeRecord>,
}

impl StateTables {
    pub fn report(&self) -> ExclusionReport {
        let mut report = ExclusionReport::new();
        report.extend(self.area.report.clone());
        report.extend(self.population.report.clone());
        report.extend(self.temperature.report.clone());
        report.extend(self.hospital.report.clone());
        report.extend(self.gdp.report.clone());
        report.extend(self.shape.report.clone());
        report
    }
}

pub fn normalize_countries(frames: &SourceFrames, sources: &CountrySources) -> CountryTables {
    let span = info_span!("normalize_countries");
    let _guard = span.enter();
    CountryTables {
        area: normalize_country_area(frames.get(SourceKind::CountryArea), &sources.area),
        temperature: normalize_country_temperature(
            frames.get(SourceKind::CountryTemperature),
            &sources.temperature,
        ),
        hospital: normalize_country_hospital(
            frames.get(SourceKind::CountryHospital),
            &sources.hospital,
        ),
        shape: normalize_country_shape(frames.get(SourceKind::CountryShape), &sources.shape),
        incidence: normalize_malaria_incidence(
            frames.get(SourceKind::MalariaIncidence),
            &sources.incidence,
        ),
        death: normalize_malaria_death(frames.get(SourceKind::MalariaDeath), &sources.death),
    }
}

pub fn normalize_states(frames: &SourceFrames, sources: &StateSources) -> StateTables {
    let span = info_span!("normalize_states");
    let _guard = span.enter();
    StateTables {
        area: normalize_state_area(
            frames.get(SourceKind::StateArea),
            &sources.area,
            sources.area_unit,
        ),
        population: normalize_state_population(
            frames.get(SourceKind::StatePopulation),
            &sources.population,
        ),
        temperature: normalize_state_temperature(
            frames.get(SourceKind::StateTemperature),
            &sources.temperature,
            sources.temperature_unit,
        ),
        hospital: normalize_state_hospital(frames.get(SourceKind::StateHospital), &sources.hospital),
        gdp: normalize_state_gdp(frames.get(SourceKind::StateGdp), &sources.gdp),
        shape: normalize_state_shape(frames.get(SourceKind::StateShape), &sources.shape),
    }
}
