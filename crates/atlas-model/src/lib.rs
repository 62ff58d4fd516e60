#![deny(unsafe_code)]

pub mod audit;
pub mod correlation;
pub mod error;
pub mod extrapolation;
pub mod options;
pub mod profile;
pub mod records;

pub use audit::{Exclusion, ExclusionReason, ExclusionReport, ExclusionStage};
pub use correlation::{CorrelationResult, CorrelationStat, Factor, Outcome};
pub use error::{AtlasError, Result};
pub use extrapolation::{AnalogAssignment, ExtrapolationResult, Neighbor, total_death, total_incidence};
pub use options::{
    AnalogOptions, AreaUnit, CountrySources, ExtrapolationOptions, GeometrySource, JoinPolicy,
    LatestYearSource, MergeOptions, PipelineOptions, RateSource, SQ_KM_TO_SQ_MI, ShapeSource,
    SourceKind, SourceLayout, StateSources, TemperatureSource, TemperatureUnit, ValueSource,
    YearColumnSource,
};
pub use profile::{CountryProfile, FeatureVector, Geometry, StateProfile};
pub use records::{
    AreaRecord, DeathRecord, GdpRecord, HospitalRecord, IncidenceRecord, Keyed, OutcomeRecord,
    PopulationRecord, ShapeRecord, StateShapeRecord, TemperatureRecord,
};
