//! Normalizer output and the per-source audit collector.

use std::collections::BTreeSet;

use polars::prelude::DataFrame;
use tracing::{debug, info, warn};

use atlas_ingest::has_column;
use atlas_model::{ExclusionReason, ExclusionReport, ExclusionStage, Keyed, SourceKind};

/// Records a normalizer kept, plus everything it dropped.
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub report: ExclusionReport,
    /// Rows skipped only because they belong to another year. Long
    /// time-series sources drop most rows this way, so they are counted
    /// rather than listed.
    pub other_year_rows: usize,
}

impl<T> Normalized<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Required columns the source lacked; non-empty means the result is
    /// empty or partial.
    pub fn missing_columns(&self) -> Vec<&str> {
        self.report
            .iter()
            .filter_map(|exclusion| match &exclusion.reason {
                ExclusionReason::MissingColumn { column } => Some(column.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl<T> Default for Normalized<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            report: ExclusionReport::new(),
            other_year_rows: 0,
        }
    }
}

/// Collects exclusions for one source while it is normalized.
pub(crate) struct SourceAudit {
    source: SourceKind,
    stage: ExclusionStage,
    report: ExclusionReport,
    other_year_rows: usize,
}

impl SourceAudit {
    pub(crate) fn new(source: SourceKind) -> Self {
        Self {
            source,
            stage: ExclusionStage::Normalize(source.name().to_string()),
            report: ExclusionReport::new(),
            other_year_rows: 0,
        }
    }

    /// Returns false, recording every absent column, unless all are present.
    pub(crate) fn require_columns(&mut self, df: &DataFrame, columns: &[&str]) -> bool {
        let mut complete = true;
        for column in columns {
            if !has_column(df, column) {
                self.missing_column(column);
                complete = false;
            }
        }
        complete
    }

    /// Records a required column the source lacks, keyed by the source name.
    pub(crate) fn missing_column(&mut self, column: &str) {
        warn!(source = %self.source, column, "required column missing");
        self.report.push(
            self.stage.clone(),
            self.source.name(),
            ExclusionReason::MissingColumn {
                column: column.to_string(),
            },
        );
    }

    pub(crate) fn missing_value(&mut self, key: &str, column: &str) {
        self.report.push(
            self.stage.clone(),
            key,
            ExclusionReason::MissingValue {
                column: column.to_string(),
            },
        );
    }

    pub(crate) fn missing_key(&mut self, row: usize, column: &str) {
        self.missing_value(&format!("row {}", row + 1), column);
    }

    pub(crate) fn invalid_value(&mut self, key: &str, column: &str, value: impl ToString) {
        self.report.push(
            self.stage.clone(),
            key,
            ExclusionReason::InvalidValue {
                column: column.to_string(),
                value: value.to_string(),
            },
        );
    }

    pub(crate) fn no_reference_year(&mut self, key: &str, year: Option<i32>) {
        self.report.push(
            self.stage.clone(),
            key,
            ExclusionReason::OutOfReferenceYear { year },
        );
    }

    pub(crate) fn other_year(&mut self) {
        self.other_year_rows += 1;
    }

    /// Drops repeated keys (first occurrence wins) and returns the result.
    pub(crate) fn finish<T: Keyed>(mut self, records: Vec<T>) -> Normalized<T> {
        let mut seen = BTreeSet::new();
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if seen.insert(record.key().to_string()) {
                kept.push(record);
            } else {
                debug!(source = %self.source, key = record.key(), "duplicate key dropped");
                self.report
                    .push(self.stage.clone(), record.key(), ExclusionReason::DuplicateKey);
            }
        }
        info!(
            source = %self.source,
            kept = kept.len(),
            excluded = self.report.len(),
            other_year_rows = self.other_year_rows,
            "source normalized"
        );
        Normalized {
            records: kept,
            report: self.report,
            other_year_rows: self.other_year_rows,
        }
    }
}
