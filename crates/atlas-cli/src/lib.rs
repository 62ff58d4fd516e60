//! Library side of the `atlas` binary: logging, run stages, output writers.

pub mod logging;
pub mod output;
pub mod pipeline;
