//! Country-level source normalizers.
//!
//! Each normalizer reads the raw string frame of one source, keeps the
//! configured columns under canonical names, converts units and filters to
//! the reference year. Rows that cannot be used are recorded in the audit,
//! never silently dropped.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use tracing::debug;

use atlas_ingest::{column_names, parse_f64, parse_i64, string_column};
use atlas_model::{
    AreaRecord, DeathRecord, Geometry, HospitalRecord, IncidenceRecord, LatestYearSource,
    RateSource, ShapeRecord, ShapeSource, SourceKind, TemperatureRecord, TemperatureSource,
    YearColumnSource,
};

use crate::normalized::{Normalized, SourceAudit};
use crate::year::{parse_year_cell, parse_year_label, year_of_date};

/// Land area for the configured year, converted to square miles.
pub fn normalize_country_area(df: &DataFrame, source: &YearColumnSource) -> Normalized<AreaRecord> {
    let mut audit = SourceAudit::new(SourceKind::CountryArea);
    let value_column = source.year.to_string();
    if !audit.require_columns(df, &[source.key.as_str(), value_column.as_str()]) {
        return audit.finish(Vec::new());
    }
    let (Some(keys), Some(values)) = (
        string_column(df, &source.key),
        string_column(df, &value_column),
    ) else {
        return audit.finish(Vec::new());
    };

    let mut records = Vec::with_capacity(keys.len());
    for (idx, (key, raw)) in keys.iter().zip(&values).enumerate() {
        if key.is_empty() {
            audit.missing_key(idx, &source.key);
            continue;
        }
        match parse_f64(raw) {
            Some(area) if area >= 0.0 => records.push(AreaRecord {
                name: key.clone(),
                area: source.unit.to_square_miles(area),
                area_year: Some(source.year),
            }),
            Some(area) => audit.invalid_value(key, &value_column, area),
            None => audit.missing_value(key, &value_column),
        }
    }
    audit.finish(records)
}

#[derive(Default)]
struct TemperatureAccumulator {
    sum: f64,
    count: usize,
    uncertainty_sum: f64,
    uncertainty_count: usize,
    in_year_rows: usize,
}

/// Mean temperature per country over the readings dated in the reference
/// year.
///
/// A reading missing its value (or its uncertainty, when that column is
/// configured) is skipped. A country with readings only in other years is
/// recorded as out of the reference year; one whose in-year readings are all
/// incomplete is recorded as a missing value.
pub fn normalize_country_temperature(
    df: &DataFrame,
    source: &TemperatureSource,
) -> Normalized<TemperatureRecord> {
    let mut audit = SourceAudit::new(SourceKind::CountryTemperature);
    let required = [source.key.as_str(), source.date.as_str(), source.value.as_str()];
    if !audit.require_columns(df, &required) {
        return audit.finish(Vec::new());
    }
    let (Some(keys), Some(dates), Some(values)) = (
        string_column(df, &source.key),
        string_column(df, &source.date),
        string_column(df, &source.value),
    ) else {
        return audit.finish(Vec::new());
    };
    let uncertainties = source
        .uncertainty
        .as_deref()
        .and_then(|column| string_column(df, column));
    if source.uncertainty.is_some() && uncertainties.is_none() {
        debug!(column = ?source.uncertainty, "uncertainty column absent; averaging without it");
    }

    let mut by_key: BTreeMap<&str, TemperatureAccumulator> = BTreeMap::new();
    for idx in 0..keys.len() {
        let key = keys[idx].as_str();
        if key.is_empty() {
            audit.missing_key(idx, &source.key);
            continue;
        }
        let entry = by_key.entry(key).or_default();
        if year_of_date(&dates[idx]) != Some(source.year) {
            audit.other_year();
            continue;
        }
        entry.in_year_rows += 1;
        let Some(value) = parse_f64(&values[idx]) else {
            continue;
        };
        let uncertainty = match &uncertainties {
            Some(column) => match parse_f64(&column[idx]) {
                Some(u) => Some(u),
                None => continue,
            },
            None => None,
        };
        entry.sum += source.unit.to_celsius(value);
        entry.count += 1;
        if let Some(u) = uncertainty {
            entry.uncertainty_sum += u;
            entry.uncertainty_count += 1;
        }
    }

    let mut records = Vec::new();
    for (key, acc) in by_key {
        if acc.in_year_rows == 0 {
            audit.no_reference_year(key, None);
        } else if acc.count == 0 {
            audit.missing_value(key, &source.value);
        } else {
            records.push(TemperatureRecord {
                name: key.to_string(),
                temp: acc.sum / acc.count as f64,
                temp_year: Some(source.year),
                uncertainty: (acc.uncertainty_count > 0)
                    .then(|| acc.uncertainty_sum / acc.uncertainty_count as f64),
            });
        }
    }
    audit.finish(records)
}

/// Hospital bed density from the most recent populated year column.
pub fn normalize_country_hospital(
    df: &DataFrame,
    source: &LatestYearSource,
) -> Normalized<HospitalRecord> {
    let mut audit = SourceAudit::new(SourceKind::CountryHospital);
    if !audit.require_columns(df, &[source.key.as_str()]) {
        return audit.finish(Vec::new());
    }
    let mut year_columns: Vec<(i32, String)> = column_names(df)
        .into_iter()
        .filter_map(|name| parse_year_label(&name).map(|year| (year, name)))
        .filter(|(year, _)| source.max_year.is_none_or(|max| *year <= max))
        .collect();
    year_columns.sort_by(|a, b| b.0.cmp(&a.0));
    if year_columns.is_empty() {
        audit.missing_column("<year columns>");
        return audit.finish(Vec::new());
    }
    let Some(keys) = string_column(df, &source.key) else {
        return audit.finish(Vec::new());
    };
    let columns: Vec<(i32, Vec<String>)> = year_columns
        .iter()
        .filter_map(|(year, name)| string_column(df, name).map(|values| (*year, values)))
        .collect();

    let mut records = Vec::with_capacity(keys.len());
    for (idx, key) in keys.iter().enumerate() {
        if key.is_empty() {
            audit.missing_key(idx, &source.key);
            continue;
        }
        let latest = columns
            .iter()
            .find_map(|(year, values)| parse_f64(&values[idx]).map(|value| (*year, value)));
        match latest {
            Some((year, value)) => records.push(HospitalRecord {
                name: key.clone(),
                hosp_beds_dens: value,
                hosp_year: Some(year),
            }),
            None => audit.missing_value(key, "<any year>"),
        }
    }
    audit.finish(records)
}

/// Country shapes with per-capita GDP computed from the bundled estimates.
pub fn normalize_country_shape(df: &DataFrame, source: &ShapeSource) -> Normalized<ShapeRecord> {
    let mut audit = SourceAudit::new(SourceKind::CountryShape);
    let required = [
        source.name.as_str(),
        source.gdp.as_str(),
        source.population.as_str(),
        source.continent.as_str(),
        source.geometry.as_str(),
    ];
    if !audit.require_columns(df, &required) {
        return audit.finish(Vec::new());
    }
    let (Some(names), Some(gdps), Some(pops), Some(continents), Some(geometries)) = (
        string_column(df, &source.name),
        string_column(df, &source.gdp),
        string_column(df, &source.population),
        string_column(df, &source.continent),
        string_column(df, &source.geometry),
    ) else {
        return audit.finish(Vec::new());
    };
    let gdp_years = string_column(df, &source.gdp_year);
    let pop_years = string_column(df, &source.pop_year);

    let mut records = Vec::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        if name.is_empty() {
            audit.missing_key(idx, &source.name);
            continue;
        }
        let Some(gdp_md_est) = parse_f64(&gdps[idx]) else {
            audit.missing_value(name, &source.gdp);
            continue;
        };
        let Some(pop_est) = parse_i64(&pops[idx]) else {
            audit.missing_value(name, &source.population);
            continue;
        };
        if pop_est <= 0 {
            audit.invalid_value(name, &source.population, pop_est);
            continue;
        }
        records.push(ShapeRecord {
            name: name.clone(),
            gdp_md_est,
            pop_est,
            gdp_year: gdp_years.as_ref().and_then(|years| parse_year_cell(&years[idx])),
            pop_year: pop_years.as_ref().and_then(|years| parse_year_cell(&years[idx])),
            continent: continents[idx].clone(),
            gdp_capita: gdp_md_est / pop_est as f64,
            geometry: Geometry::new(geometries[idx].clone()),
        });
    }
    audit.finish(records)
}

/// One row of a rate table that passed the year filter.
struct RateRow {
    name: String,
    code: Option<String>,
    year: i32,
    value: f64,
}

fn rate_rows(df: &DataFrame, source: &RateSource, audit: &mut SourceAudit) -> Vec<RateRow> {
    let required = [
        source.key.as_str(),
        source.year_column.as_str(),
        source.value.as_str(),
    ];
    if !audit.require_columns(df, &required) {
        return Vec::new();
    }
    let (Some(keys), Some(years), Some(values)) = (
        string_column(df, &source.key),
        string_column(df, &source.year_column),
        string_column(df, &source.value),
    ) else {
        return Vec::new();
    };
    let codes = string_column(df, &source.code);

    let mut rows = Vec::new();
    for (idx, key) in keys.iter().enumerate() {
        if key.is_empty() {
            audit.missing_key(idx, &source.key);
            continue;
        }
        if parse_year_cell(&years[idx]) != Some(source.year) {
            audit.other_year();
            continue;
        }
        let Some(value) = parse_f64(&values[idx]) else {
            audit.missing_value(key, &source.value);
            continue;
        };
        rows.push(RateRow {
            name: key.clone(),
            code: codes
                .as_ref()
                .map(|codes| codes[idx].clone())
                .filter(|code| !code.is_empty()),
            year: source.year,
            value,
        });
    }
    rows
}

/// Malaria incidence per 1,000 at risk for the reference year.
pub fn normalize_malaria_incidence(
    df: &DataFrame,
    source: &RateSource,
) -> Normalized<IncidenceRecord> {
    let mut audit = SourceAudit::new(SourceKind::MalariaIncidence);
    let records = rate_rows(df, source, &mut audit)
        .into_iter()
        .map(|row| IncidenceRecord {
            name: row.name,
            code: row.code,
            year: row.year,
            incidence_1000: row.value,
        })
        .collect();
    audit.finish(records)
}

/// Malaria deaths per 100,000 for the reference year.
pub fn normalize_malaria_death(df: &DataFrame, source: &RateSource) -> Normalized<DeathRecord> {
    let mut audit = SourceAudit::new(SourceKind::MalariaDeath);
    let records = rate_rows(df, source, &mut audit)
        .into_iter()
        .map(|row| DeathRecord {
            name: row.name,
            code: row.code,
            year: row.year,
            death_100000: row.value,
        })
        .collect();
    audit.finish(records)
}
