use std::path::PathBuf;

use thiserror::Error;

use crate::correlation::{Factor, Outcome};

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("{source_name}: required column `{column}` is missing")]
    MissingFeature { source_name: String, column: String },

    #[error("correlation of {factor} with {outcome} is undefined: {reason}")]
    UndefinedCorrelation {
        factor: Factor,
        outcome: Outcome,
        reason: String,
    },

    #[error("state {state} maps to analog {country}, which has no country profile")]
    UnmatchedAnalog { state: String, country: String },

    #[error("invalid analog model: {message}")]
    InvalidModel { message: String },

    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse CSV {path}: {message}")]
    Csv { path: PathBuf, message: String },

    #[error("frame error: {message}")]
    Frame { message: String },
}

impl AtlasError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn frame(message: impl std::fmt::Display) -> Self {
        Self::Frame {
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
