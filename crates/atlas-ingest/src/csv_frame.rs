//! CSV loading into Polars frames.
//!
//! Public datasets rarely start with their header: World Bank exports carry
//! a four-line preamble, and spreadsheet exports often add a title row. The
//! reader scans the first rows for the header, then builds a frame of string
//! columns; numeric parsing is left to the normalizers, which know which
//! columns they need.

use std::collections::BTreeSet;
use std::path::Path;

use csv::ReaderBuilder;
use polars::prelude::{Column, DataFrame, IntoColumn, NamedFrom, Series};
use tracing::debug;

use atlas_model::{AtlasError, Result};

/// Rows inspected when looking for the header.
const HEADER_PROBE_ROWS: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Explicit zero-based header row (after blank lines are skipped).
    pub header_row_index: Option<usize>,
    /// Column name the header row must contain, e.g. `Country Name`.
    pub key_column: Option<String>,
}

impl IngestOptions {
    pub fn with_key_column(mut self, key_column: impl Into<String>) -> Self {
        self.key_column = Some(key_column.into());
        self
    }

    pub fn with_header_row(mut self, index: usize) -> Self {
        self.header_row_index = Some(index);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Converts to a frame of nullable string columns; empty cells become null.
    pub fn into_frame(self) -> Result<DataFrame> {
        let CsvTable { headers, rows } = self;
        let names = unique_headers(&headers);
        let mut columns: Vec<Column> = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            let values: Vec<Option<String>> = rows
                .iter()
                .map(|row| {
                    row.get(idx)
                        .map(|cell| cell.trim())
                        .filter(|cell| !cell.is_empty())
                        .map(str::to_string)
                })
                .collect();
            columns.push(Series::new(name.as_str().into(), values).into_column());
        }
        DataFrame::new(columns).map_err(AtlasError::frame)
    }
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Collapses internal whitespace so headers compare reliably.
fn normalize_header(raw: &str) -> String {
    normalize_cell(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Empty or repeated header names get positional names so the frame stays
/// valid; World Bank exports end every row with a trailing comma.
fn unique_headers(headers: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut names = Vec::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let base = if header.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            header.clone()
        };
        let mut name = base.clone();
        let mut suffix = 2;
        while !seen.insert(name.clone()) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        names.push(name);
    }
    names
}

fn non_empty(row: &[String]) -> usize {
    row.iter().filter(|cell| !cell.is_empty()).count()
}

/// Picks the header row among the first few rows.
///
/// With a key column, the first row containing it wins. Without one, the
/// first row as wide as the widest probed row is taken, which skips short
/// title and preamble lines.
fn detect_header_row(rows: &[Vec<String>], key_column: Option<&str>) -> usize {
    let probe = rows.len().min(HEADER_PROBE_ROWS);
    if let Some(key) = key_column {
        let key = normalize_header(key);
        if let Some(idx) = rows
            .iter()
            .take(probe)
            .position(|row| row.iter().any(|cell| normalize_header(cell) == key))
        {
            return idx;
        }
    }
    let widest = rows.iter().take(probe).map(|row| non_empty(row)).max().unwrap_or(0);
    rows.iter()
        .take(probe)
        .position(|row| non_empty(row) == widest)
        .unwrap_or(0)
}

pub fn read_csv_table(path: &Path, options: &IngestOptions) -> Result<CsvTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AtlasError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AtlasError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let row: Vec<String> = record.iter().map(normalize_cell).collect();
        if row.iter().all(String::is_empty) {
            continue;
        }
        raw_rows.push(row);
    }
    if raw_rows.is_empty() {
        return Ok(CsvTable::default());
    }
    let header_index = options
        .header_row_index
        .unwrap_or_else(|| detect_header_row(&raw_rows, options.key_column.as_deref()));
    let Some(header_row) = raw_rows.get(header_index) else {
        return Err(AtlasError::Csv {
            path: path.to_path_buf(),
            message: format!("header row {header_index} is past the end of the file"),
        });
    };
    let headers: Vec<String> = header_row.iter().map(|h| normalize_header(h)).collect();
    let rows: Vec<Vec<String>> = raw_rows
        .into_iter()
        .skip(header_index + 1)
        .map(|mut row| {
            row.resize(headers.len(), String::new());
            row
        })
        .collect();
    debug!(
        path = %path.display(),
        header_index,
        columns = headers.len(),
        rows = rows.len(),
        "read csv table"
    );
    Ok(CsvTable { headers, rows })
}

/// Reads a CSV source into a frame of string columns.
pub fn read_csv_frame(path: &Path, options: &IngestOptions) -> Result<DataFrame> {
    read_csv_table(path, options)?.into_frame()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
            .collect()
    }

    #[test]
    fn header_found_by_key_column() {
        let raw = rows(&[
            &["Data Source", "World Development Indicators"],
            &["Last Updated Date", "2020-02-21"],
            &["Country Name", "Country Code", "2010", ""],
            &["Aruba", "ABW", "180", ""],
        ]);
        assert_eq!(detect_header_row(&raw, Some("Country Name")), 2);
    }

    #[test]
    fn header_falls_back_to_widest_row() {
        let raw = rows(&[&["Title"], &["State", "AREA_SQ_MI"], &["Ohio", "44825"]]);
        assert_eq!(detect_header_row(&raw, None), 1);
        assert_eq!(detect_header_row(&raw, Some("Missing")), 1);
    }

    #[test]
    fn unique_headers_fill_blanks_and_dedupe() {
        let headers = vec![
            "A".to_string(),
            String::new(),
            "A".to_string(),
            "A".to_string(),
        ];
        assert_eq!(unique_headers(&headers), vec!["A", "column_2", "A_2", "A_3"]);
    }
}
