//! State-level source normalizers.
//!
//! State sources are plain key/value tables. Units are converted to the
//! country conventions (square miles, degrees Celsius, millions of dollars)
//! so state and country features share one feature space.

use polars::prelude::DataFrame;

use atlas_ingest::{parse_f64, parse_i64, string_column};
use atlas_model::{
    AreaRecord, AreaUnit, GdpRecord, Geometry, GeometrySource, HospitalRecord, PopulationRecord,
    SourceKind, StateShapeRecord, TemperatureRecord, TemperatureUnit, ValueSource,
};

use crate::normalized::{Normalized, SourceAudit};
use crate::year::parse_year_cell;

/// A keyed raw cell that passed the optional year filter.
struct ValueRow {
    key: String,
    raw: String,
    year: Option<i32>,
}

fn value_rows(df: &DataFrame, source: &ValueSource, audit: &mut SourceAudit) -> Vec<ValueRow> {
    let mut required = vec![source.key.as_str(), source.value.as_str()];
    if let Some(year_column) = source.year_column.as_deref() {
        required.push(year_column);
    }
    if !audit.require_columns(df, &required) {
        return Vec::new();
    }
    let (Some(keys), Some(values)) = (
        string_column(df, &source.key),
        string_column(df, &source.value),
    ) else {
        return Vec::new();
    };
    let years = source
        .year_column
        .as_deref()
        .and_then(|column| string_column(df, column));

    let mut rows = Vec::with_capacity(keys.len());
    for (idx, key) in keys.iter().enumerate() {
        if key.is_empty() {
            audit.missing_key(idx, &source.key);
            continue;
        }
        let year = years.as_ref().and_then(|years| parse_year_cell(&years[idx]));
        if let Some(wanted) = source.year
            && years.is_some()
            && year != Some(wanted)
        {
            audit.other_year();
            continue;
        }
        if values[idx].is_empty() {
            audit.missing_value(key, &source.value);
            continue;
        }
        rows.push(ValueRow {
            key: key.clone(),
            raw: values[idx].clone(),
            year: year.or(source.year),
        });
    }
    rows
}

/// Parses each row's value, recording unparsable cells as invalid.
fn parse_rows<T>(
    rows: Vec<ValueRow>,
    column: &str,
    audit: &mut SourceAudit,
    parse: impl Fn(&str) -> Option<T>,
) -> Vec<(ValueRow, T)> {
    let mut parsed = Vec::with_capacity(rows.len());
    for row in rows {
        match parse(&row.raw) {
            Some(value) => parsed.push((row, value)),
            None => audit.invalid_value(&row.key, column, &row.raw),
        }
    }
    parsed
}

pub fn normalize_state_area(
    df: &DataFrame,
    source: &ValueSource,
    unit: AreaUnit,
) -> Normalized<AreaRecord> {
    let mut audit = SourceAudit::new(SourceKind::StateArea);
    let rows = value_rows(df, source, &mut audit);
    let records = parse_rows(rows, &source.value, &mut audit, parse_f64)
        .into_iter()
        .map(|(row, area)| AreaRecord {
            name: row.key,
            area: unit.to_square_miles(area),
            area_year: row.year,
        })
        .collect();
    audit.finish(records)
}

pub fn normalize_state_population(
    df: &DataFrame,
    source: &ValueSource,
) -> Normalized<PopulationRecord> {
    let mut audit = SourceAudit::new(SourceKind::StatePopulation);
    let rows = value_rows(df, source, &mut audit);
    let mut records = Vec::with_capacity(rows.len());
    for (row, pop_est) in parse_rows(rows, &source.value, &mut audit, parse_i64) {
        if pop_est < 0 {
            audit.invalid_value(&row.key, &source.value, pop_est);
            continue;
        }
        records.push(PopulationRecord {
            name: row.key,
            pop_est,
            pop_year: row.year,
        });
    }
    audit.finish(records)
}

/// Mean temperature, converted to degrees Celsius.
pub fn normalize_state_temperature(
    df: &DataFrame,
    source: &ValueSource,
    unit: TemperatureUnit,
) -> Normalized<TemperatureRecord> {
    let mut audit = SourceAudit::new(SourceKind::StateTemperature);
    let rows = value_rows(df, source, &mut audit);
    let records = parse_rows(rows, &source.value, &mut audit, parse_f64)
        .into_iter()
        .map(|(row, temp)| TemperatureRecord {
            name: row.key,
            temp: unit.to_celsius(temp),
            temp_year: row.year,
            uncertainty: None,
        })
        .collect();
    audit.finish(records)
}

pub fn normalize_state_hospital(df: &DataFrame, source: &ValueSource) -> Normalized<HospitalRecord> {
    let mut audit = SourceAudit::new(SourceKind::StateHospital);
    let rows = value_rows(df, source, &mut audit);
    let records = parse_rows(rows, &source.value, &mut audit, parse_f64)
        .into_iter()
        .map(|(row, hosp_beds_dens)| HospitalRecord {
            name: row.key,
            hosp_beds_dens,
            hosp_year: row.year,
        })
        .collect();
    audit.finish(records)
}

/// GDP in millions of dollars.
pub fn normalize_state_gdp(df: &DataFrame, source: &ValueSource) -> Normalized<GdpRecord> {
    let mut audit = SourceAudit::new(SourceKind::StateGdp);
    let rows = value_rows(df, source, &mut audit);
    let records = parse_rows(rows, &source.value, &mut audit, parse_f64)
        .into_iter()
        .map(|(row, gdp_md_est)| GdpRecord {
            name: row.key,
            gdp_md_est,
            gdp_year: row.year,
        })
        .collect();
    audit.finish(records)
}

pub fn normalize_state_shape(
    df: &DataFrame,
    source: &GeometrySource,
) -> Normalized<StateShapeRecord> {
    let mut audit = SourceAudit::new(SourceKind::StateShape);
    let value = ValueSource::new(&source.key, &source.geometry);
    let records = value_rows(df, &value, &mut audit)
        .into_iter()
        .map(|row| StateShapeRecord {
            name: row.key,
            geometry: Geometry::new(row.raw),
        })
        .collect();
    audit.finish(records)
}
