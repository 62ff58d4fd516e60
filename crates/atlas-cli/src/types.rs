use std::path::PathBuf;

use atlas_cli::output::OutputPaths;
use atlas_cli::pipeline::SourceSummary;
use atlas_core::PipelineOutput;

#[derive(Debug)]
pub struct RunResult {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub sources: Vec<SourceSummary>,
    pub output: PipelineOutput,
    /// `None` on a dry run.
    pub written: Option<OutputPaths>,
}
