//! Year extraction from column labels and date strings.

use chrono::{Datelike, NaiveDate};

/// Plausible range for a year-labelled column; rejects codes like `1000`.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1800..=2200;

/// Parses a column label such as `"2010"` as a year.
pub fn parse_year_label(label: &str) -> Option<i32> {
    let trimmed = label.trim();
    if trimmed.len() != 4 || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<i32>().ok().filter(|year| YEAR_RANGE.contains(year))
}

/// Year of an ISO date (`2013-06-01`), or of a bare leading year. Both
/// forms are held to the same plausible range.
pub fn year_of_date(value: &str) -> Option<i32> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.year()).filter(|year| YEAR_RANGE.contains(year));
    }
    trimmed.get(..4).and_then(parse_year_label)
}

/// Parses a year cell, tolerating float renderings like `2015.0`.
pub fn parse_year_cell(value: &str) -> Option<i32> {
    atlas_ingest::parse_i64(value)
        .and_then(|year| i32::try_from(year).ok())
        .filter(|year| YEAR_RANGE.contains(year))
}
