//! Source file discovery in a data directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use atlas_model::{AtlasError, Result, SourceKind, SourceLayout};

/// Source files located for one run.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredSources {
    pub found: BTreeMap<SourceKind, PathBuf>,
    pub missing: Vec<(SourceKind, PathBuf)>,
}

impl DiscoveredSources {
    pub fn path(&self, kind: SourceKind) -> Option<&Path> {
        self.found.get(&kind).map(PathBuf::as_path)
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Lists all CSV files in a directory, sorted by file name.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| AtlasError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| AtlasError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Matches every source in `layout` against the files in `dir`.
///
/// File names compare case-insensitively so exports from case-insensitive
/// filesystems still resolve.
pub fn discover_sources(dir: &Path, layout: &SourceLayout) -> Result<DiscoveredSources> {
    let files = list_csv_files(dir)?;
    let mut discovered = DiscoveredSources::default();
    for kind in SourceKind::ALL {
        let expected = layout.file_name(kind);
        let matched = files.iter().find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.eq_ignore_ascii_case(expected))
        });
        match matched {
            Some(path) => {
                debug!(source = %kind, path = %path.display(), "source found");
                discovered.found.insert(kind, path.clone());
            }
            None => {
                warn!(source = %kind, expected, "source file missing");
                discovered.missing.push((kind, dir.join(expected)));
            }
        }
    }
    Ok(discovered)
}
