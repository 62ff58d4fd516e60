#![deny(unsafe_code)]

pub mod csv_frame;
pub mod discovery;
pub mod polars_utils;
pub mod sources;

pub use csv_frame::{CsvTable, IngestOptions, read_csv_frame, read_csv_table};
pub use discovery::{DiscoveredSources, discover_sources, list_csv_files};
pub use polars_utils::{
    any_to_f64, any_to_string, column_names, f64_column, has_column, parse_f64,
    parse_i64, string_column,
};
pub use sources::{SourceFrames, read_sources};
