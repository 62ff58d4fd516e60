#![deny(unsafe_code)]

pub mod analog;
pub mod correlation;
pub mod extrapolation;
pub mod merge;
pub mod pipeline;
pub mod pipeline_context;

pub use analog::{AnalogModel, StandardScaler};
pub use correlation::{
    MIN_PAIRS, analyze_correlations, complete_pairs, factor_value, outcome_value, pearson,
};
pub use extrapolation::{ExtrapolationOutcome, extrapolate};
pub use merge::{
    MergeOutcome, index_by_key, merge_country_profiles, merge_outcomes, merge_state_profiles,
};
pub use pipeline::{
    AnalogStep, AnalysisPipeline, AnalysisStep, CorrelationStep, CountryMergeStep,
    ExtrapolationStep, PipelineInputs, PipelineOutput, PipelineState, SourceCheckStep,
    StateMergeStep, StepTiming, build_default_pipeline, run_pipeline,
};
pub use pipeline_context::PipelineContext;
