//! Audit trail for rows and keys dropped by the pipeline.
//!
//! Nothing is removed silently: normalizers, the merge engine and the
//! extrapolation calculator each record an [`Exclusion`] for every row they
//! discard, so counts can be surfaced in logs, summaries, and tests.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage that produced an exclusion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "stage", content = "source")]
pub enum ExclusionStage {
    /// A source normalizer, named by source.
    Normalize(String),
    CountryMerge,
    OutcomeMerge,
    StateMerge,
    Extrapolation,
}

impl fmt::Display for ExclusionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionStage::Normalize(source) => write!(f, "normalize:{source}"),
            ExclusionStage::CountryMerge => f.write_str("country_merge"),
            ExclusionStage::OutcomeMerge => f.write_str("outcome_merge"),
            ExclusionStage::StateMerge => f.write_str("state_merge"),
            ExclusionStage::Extrapolation => f.write_str("extrapolation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExclusionReason {
    /// A required value was empty or unparseable.
    MissingValue { column: String },
    /// A required column was absent from the source.
    MissingColumn { column: String },
    /// Row belongs to a year other than the reference year.
    OutOfReferenceYear { year: Option<i32> },
    /// Key present in some feature tables but absent from these.
    JoinMismatch { missing_from: Vec<String> },
    /// Predicted analog country has no country profile.
    UnmatchedAnalog { country: String },
    /// Removed by configuration, not by data quality.
    PolicyExcluded,
    /// Key already seen earlier in the same source.
    DuplicateKey,
    /// A value outside the domain the calculation accepts.
    InvalidValue { column: String, value: String },
}

impl ExclusionReason {
    pub fn kind(&self) -> &'static str {
        match self {
            ExclusionReason::MissingValue { .. } => "missing_value",
            ExclusionReason::MissingColumn { .. } => "missing_column",
            ExclusionReason::OutOfReferenceYear { .. } => "out_of_reference_year",
            ExclusionReason::JoinMismatch { .. } => "join_mismatch",
            ExclusionReason::UnmatchedAnalog { .. } => "unmatched_analog",
            ExclusionReason::PolicyExcluded => "policy_excluded",
            ExclusionReason::DuplicateKey => "duplicate_key",
            ExclusionReason::InvalidValue { .. } => "invalid_value",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::MissingValue { column } => write!(f, "missing value in {column}"),
            ExclusionReason::MissingColumn { column } => write!(f, "missing column {column}"),
            ExclusionReason::OutOfReferenceYear { year: Some(year) } => {
                write!(f, "year {year} outside reference year")
            }
            ExclusionReason::OutOfReferenceYear { year: None } => {
                f.write_str("no rows in the reference year")
            }
            ExclusionReason::JoinMismatch { missing_from } => {
                write!(f, "absent from {}", missing_from.join(", "))
            }
            ExclusionReason::UnmatchedAnalog { country } => {
                write!(f, "analog {country} has no country profile")
            }
            ExclusionReason::PolicyExcluded => f.write_str("excluded by configuration"),
            ExclusionReason::DuplicateKey => f.write_str("duplicate key"),
            ExclusionReason::InvalidValue { column, value } => {
                write!(f, "invalid {column} value {value}")
            }
        }
    }
}

/// One dropped row or key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    #[serde(flatten)]
    pub stage: ExclusionStage,
    /// Entity name, or a row label when the key itself was missing.
    pub key: String,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionReport {
    pub exclusions: Vec<Exclusion>,
}

impl ExclusionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: ExclusionStage, key: impl Into<String>, reason: ExclusionReason) {
        self.exclusions.push(Exclusion {
            stage,
            key: key.into(),
            reason,
        });
    }

    pub fn extend(&mut self, other: ExclusionReport) {
        self.exclusions.extend(other.exclusions);
    }

    pub fn len(&self) -> usize {
        self.exclusions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exclusions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exclusion> {
        self.exclusions.iter()
    }

    /// Exclusions recorded by one stage.
    pub fn for_stage<'a>(
        &'a self,
        stage: &ExclusionStage,
    ) -> impl Iterator<Item = &'a Exclusion> + use<'a> {
        let stage = stage.clone();
        self.exclusions.iter().filter(move |e| e.stage == stage)
    }

    /// Keys excluded by one stage, in recording order.
    pub fn keys_for_stage(&self, stage: &ExclusionStage) -> Vec<&str> {
        self.for_stage(stage).map(|e| e.key.as_str()).collect()
    }

    pub fn contains_key(&self, stage: &ExclusionStage, key: &str) -> bool {
        self.for_stage(stage).any(|e| e.key == key)
    }

    pub fn count_by_stage(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for exclusion in &self.exclusions {
            *counts.entry(exclusion.stage.to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn count_by_reason(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for exclusion in &self.exclusions {
            *counts.entry(exclusion.reason.kind()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_group_by_stage_and_reason() {
        let mut report = ExclusionReport::new();
        report.push(
            ExclusionStage::CountryMerge,
            "S. Sudan",
            ExclusionReason::JoinMismatch {
                missing_from: vec!["area".to_string()],
            },
        );
        report.push(
            ExclusionStage::CountryMerge,
            "Czechia",
            ExclusionReason::JoinMismatch {
                missing_from: vec!["temperature".to_string()],
            },
        );
        report.push(
            ExclusionStage::Extrapolation,
            "Alaska",
            ExclusionReason::PolicyExcluded,
        );

        let by_stage = report.count_by_stage();
        assert_eq!(by_stage.get("country_merge"), Some(&2));
        assert_eq!(by_stage.get("extrapolation"), Some(&1));
        assert_eq!(report.count_by_reason().get("join_mismatch"), Some(&2));
        assert!(report.contains_key(&ExclusionStage::Extrapolation, "Alaska"));
        assert_eq!(
            report.keys_for_stage(&ExclusionStage::CountryMerge),
            vec!["S. Sudan", "Czechia"]
        );
    }

    #[test]
    fn stage_lookup_outlives_a_temporary_stage() {
        let mut report = ExclusionReport::new();
        report.push(
            ExclusionStage::Normalize("state_gdp".to_string()),
            "Guam",
            ExclusionReason::OutOfReferenceYear { year: None },
        );
        let keys = report.keys_for_stage(&ExclusionStage::Normalize("state_gdp".to_string()));
        assert_eq!(keys, vec!["Guam"]);
        assert_eq!(
            report
                .for_stage(&ExclusionStage::Normalize("state_area".to_string()))
                .count(),
            0
        );
    }

    #[test]
    fn exclusion_serializes_with_flat_stage() {
        let mut report = ExclusionReport::new();
        report.push(
            ExclusionStage::Normalize("country_area".to_string()),
            "Aruba",
            ExclusionReason::MissingValue {
                column: "2010".to_string(),
            },
        );
        let json = serde_json::to_value(&report).expect("serialize report");
        let first = &json["exclusions"][0];
        assert_eq!(first["stage"], "normalize");
        assert_eq!(first["source"], "country_area");
        assert_eq!(first["reason"]["kind"], "missing_value");
    }
}
