//! Result tables written for the map renderer.
//!
//! File names are fixed so the renderer can find them without configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use atlas_core::PipelineOutput;
use atlas_model::{AnalogAssignment, CorrelationResult, Exclusion, ExclusionReport};

pub const CORRELATIONS_FILE: &str = "correlations.json";
pub const COUNTRY_PROFILES_FILE: &str = "country_profiles.csv";
pub const STATE_PROFILES_FILE: &str = "state_profiles.csv";
pub const ANALOGS_FILE: &str = "analogs.csv";
pub const EXTRAPOLATION_FILE: &str = "extrapolation.csv";
pub const EXCLUSIONS_FILE: &str = "exclusions.json";

/// Paths of the files one run wrote.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub correlations: PathBuf,
    pub country_profiles: PathBuf,
    pub state_profiles: PathBuf,
    pub analogs: PathBuf,
    pub extrapolation: PathBuf,
    pub exclusions: PathBuf,
}

impl OutputPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            correlations: dir.join(CORRELATIONS_FILE),
            country_profiles: dir.join(COUNTRY_PROFILES_FILE),
            state_profiles: dir.join(STATE_PROFILES_FILE),
            analogs: dir.join(ANALOGS_FILE),
            extrapolation: dir.join(EXTRAPOLATION_FILE),
            exclusions: dir.join(EXCLUSIONS_FILE),
        }
    }

    pub fn all(&self) -> [&Path; 6] {
        [
            self.correlations.as_path(),
            self.country_profiles.as_path(),
            self.state_profiles.as_path(),
            self.analogs.as_path(),
            self.extrapolation.as_path(),
            self.exclusions.as_path(),
        ]
    }
}

#[derive(Serialize)]
struct CorrelationPair {
    factor: &'static str,
    outcome: &'static str,
    r: f64,
    p: f64,
    n: usize,
}

#[derive(Serialize)]
struct CorrelationsDocument {
    /// Flat `r_*`/`p_*` mapping.
    entries: BTreeMap<String, f64>,
    pairs: Vec<CorrelationPair>,
}

impl CorrelationsDocument {
    fn new(result: &CorrelationResult) -> Self {
        let pairs = result
            .iter()
            .map(|(factor, outcome, stat)| CorrelationPair {
                factor: factor.code(),
                outcome: outcome.code(),
                r: stat.r,
                p: stat.p,
                n: stat.n,
            })
            .collect();
        Self {
            entries: result.entries(),
            pairs,
        }
    }
}

/// Neighbors flatten to `name:distance` pairs joined by `;`.
#[derive(Serialize)]
struct AnalogRow<'a> {
    state: &'a str,
    closest_country: &'a str,
    votes: usize,
    neighbors: String,
}

impl<'a> AnalogRow<'a> {
    fn new(assignment: &'a AnalogAssignment) -> Self {
        let neighbors = assignment
            .neighbors
            .iter()
            .map(|n| format!("{}:{:.6}", n.country, n.distance))
            .collect::<Vec<_>>()
            .join(";");
        Self {
            state: &assignment.state,
            closest_country: &assignment.closest_country,
            votes: assignment.votes,
            neighbors,
        }
    }
}

#[derive(Serialize)]
struct ExclusionsDocument<'a> {
    total: usize,
    by_stage: BTreeMap<String, usize>,
    by_reason: BTreeMap<&'static str, usize>,
    exclusions: &'a [Exclusion],
}

impl<'a> ExclusionsDocument<'a> {
    fn new(report: &'a ExclusionReport) -> Self {
        Self {
            total: report.len(),
            by_stage: report.count_by_stage(),
            by_reason: report.count_by_reason(),
            exclusions: &report.exclusions,
        }
    }
}

/// Writes every result table into `dir`, creating it when needed.
pub fn write_outputs(dir: &Path, output: &PipelineOutput) -> Result<OutputPaths> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let paths = OutputPaths::in_dir(dir);

    write_json(&paths.correlations, &CorrelationsDocument::new(&output.correlations))?;
    write_csv(&paths.country_profiles, &output.countries)?;
    write_csv(&paths.state_profiles, &output.states)?;
    let analogs: Vec<AnalogRow<'_>> = output.assignments.iter().map(AnalogRow::new).collect();
    write_csv(&paths.analogs, &analogs)?;
    write_csv(&paths.extrapolation, &output.extrapolation)?;
    write_json(&paths.exclusions, &ExclusionsDocument::new(&output.report))?;

    info!(output_dir = %dir.display(), files = paths.all().len(), "outputs written");
    Ok(paths)
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("write {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut contents = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize {}", path.display()))?;
    contents.push('\n');
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
