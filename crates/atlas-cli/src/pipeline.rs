//! Run stages behind `atlas run`.
//!
//! 1. **Configure**: Load options from TOML, apply flag overrides
//! 2. **Ingest**: Discover and read the source CSV files
//! 3. **Normalize**: Turn raw frames into typed per-feature tables
//! 4. **Analyze**: Run the analysis pipeline
//! 5. **Output**: Write result tables (see [`crate::output`])

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, info_span};

use atlas_core::{PipelineContext, PipelineInputs, PipelineOutput, run_pipeline};
use atlas_ingest::{DiscoveredSources, discover_sources, read_sources};
use atlas_model::{JoinPolicy, PipelineOptions, SourceKind};
use atlas_normalize::{normalize_countries, normalize_states};

/// Flag overrides applied on top of the loaded options.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub k: Option<usize>,
    pub outcome_join: Option<JoinPolicy>,
    /// Drop the built-in state exclusions before adding `exclude_states`.
    pub clear_exclusions: bool,
    pub exclude_states: Vec<String>,
}

/// Rows read from one source file.
#[derive(Debug, Clone)]
pub struct SourceSummary {
    pub kind: SourceKind,
    pub path: PathBuf,
    pub found: bool,
    pub rows: usize,
}

#[derive(Debug)]
pub struct IngestResult {
    pub discovered: DiscoveredSources,
    pub sources: Vec<SourceSummary>,
    pub inputs: PipelineInputs,
}

// ============================================================================
// Stage 1: Configure
// ============================================================================

/// Loads options from `config`, or the defaults when no file is given.
pub fn load_options(config: Option<&Path>) -> Result<PipelineOptions> {
    match config {
        Some(path) => PipelineOptions::load(path)
            .with_context(|| format!("load config {}", path.display())),
        None => Ok(PipelineOptions::default()),
    }
}

/// Builds the pipeline context from options and command-line overrides.
pub fn build_context(options: PipelineOptions, overrides: &Overrides) -> PipelineContext {
    let mut ctx = PipelineContext::new(options);
    if let Some(k) = overrides.k {
        ctx = ctx.with_k(k);
    }
    if let Some(policy) = overrides.outcome_join {
        ctx = ctx.with_outcome_join(policy);
    }
    if overrides.clear_exclusions {
        ctx = ctx.without_excluded_states();
    }
    if !overrides.exclude_states.is_empty() {
        ctx = ctx.with_excluded_states(overrides.exclude_states.iter().cloned());
    }
    debug!(
        k = ctx.options.analog.k,
        outcome_join = ?ctx.options.merge.outcome_join,
        excluded = ?ctx.options.extrapolation.excluded_states,
        "pipeline context ready"
    );
    ctx
}

// ============================================================================
// Stages 2-3: Ingest and normalize
// ============================================================================

/// Reads every source under `data_dir` and normalizes it.
///
/// Missing files are not an error here; their tables come back empty and
/// the analysis refuses to run on them.
pub fn ingest(data_dir: &Path, options: &PipelineOptions) -> Result<IngestResult> {
    if !data_dir.is_dir() {
        bail!("data directory not found: {}", data_dir.display());
    }
    let discovered = discover_sources(data_dir, &options.layout)
        .with_context(|| format!("scan {}", data_dir.display()))?;
    let frames = read_sources(&discovered, options).context("read sources")?;

    let mut sources = Vec::with_capacity(SourceKind::ALL.len());
    for kind in SourceKind::ALL {
        let (path, found) = match discovered.path(kind) {
            Some(path) => (path.to_path_buf(), true),
            None => (data_dir.join(options.layout.file_name(kind)), false),
        };
        sources.push(SourceSummary {
            kind,
            path,
            found,
            rows: frames.get(kind).height(),
        });
    }

    let span = info_span!("normalize");
    let _guard = span.enter();
    let inputs = PipelineInputs {
        countries: normalize_countries(&frames, &options.countries),
        states: normalize_states(&frames, &options.states),
    };
    info!(
        found = discovered.found.len(),
        missing = discovered.missing.len(),
        "sources normalized"
    );
    Ok(IngestResult {
        discovered,
        sources,
        inputs,
    })
}

// ============================================================================
// Stage 4: Analyze
// ============================================================================

pub fn analyze(inputs: &PipelineInputs, ctx: &PipelineContext) -> Result<PipelineOutput> {
    run_pipeline(inputs, ctx).context("analysis pipeline")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_defaults() {
        let overrides = Overrides {
            k: Some(3),
            outcome_join: Some(JoinPolicy::Inner),
            clear_exclusions: true,
            exclude_states: vec![" Texas ".to_string()],
        };
        let ctx = build_context(PipelineOptions::default(), &overrides);
        assert_eq!(ctx.options.analog.k, 3);
        assert_eq!(ctx.options.merge.outcome_join, JoinPolicy::Inner);
        let excluded: Vec<&str> = ctx
            .options
            .extrapolation
            .excluded_states
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(excluded, vec!["Texas"]);
    }

    #[test]
    fn extra_exclusions_keep_the_defaults() {
        let overrides = Overrides {
            exclude_states: vec!["Maine".to_string()],
            ..Overrides::default()
        };
        let ctx = build_context(PipelineOptions::default(), &overrides);
        let excluded = &ctx.options.extrapolation.excluded_states;
        assert!(excluded.contains("Alaska"));
        assert!(excluded.contains("Maine"));
    }

    #[test]
    fn missing_data_directory_is_an_error() {
        let err = ingest(Path::new("/nonexistent/atlas-data"), &PipelineOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("data directory not found"));
    }
}
