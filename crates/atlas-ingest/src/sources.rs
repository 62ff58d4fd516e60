//! Loading every discovered source into frames.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use tracing::{info, info_span};

use atlas_model::{PipelineOptions, Result, SourceKind};

use crate::csv_frame::{IngestOptions, read_csv_frame};
use crate::discovery::DiscoveredSources;

/// Raw string frames keyed by source. Absent sources read as empty frames,
/// so the normalizers report their columns missing instead of failing.
#[derive(Debug, Clone, Default)]
pub struct SourceFrames {
    frames: BTreeMap<SourceKind, DataFrame>,
    empty: DataFrame,
}

impl SourceFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: SourceKind, frame: DataFrame) {
        self.frames.insert(kind, frame);
    }

    pub fn with(mut self, kind: SourceKind, frame: DataFrame) -> Self {
        self.insert(kind, frame);
        self
    }

    pub fn contains(&self, kind: SourceKind) -> bool {
        self.frames.contains_key(&kind)
    }

    pub fn get(&self, kind: SourceKind) -> &DataFrame {
        self.frames.get(&kind).unwrap_or(&self.empty)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Reads each discovered source, locating its header by the configured key
/// column.
pub fn read_sources(
    discovered: &DiscoveredSources,
    options: &PipelineOptions,
) -> Result<SourceFrames> {
    let mut frames = SourceFrames::new();
    for (kind, path) in &discovered.found {
        let span = info_span!("read_source", source = %kind);
        let _guard = span.enter();
        let ingest = IngestOptions::default().with_key_column(kind.key_column(options));
        let frame = read_csv_frame(path, &ingest)?;
        info!(
            path = %path.display(),
            rows = frame.height(),
            columns = frame.width(),
            "source loaded"
        );
        frames.insert(*kind, frame);
    }
    Ok(frames)
}
