//! Analysis pipeline with ordered step execution.
//!
//! Each step implements [`AnalysisStep`] and runs to completion before the
//! next one starts.
//!
//! # Standard Pipeline Order
//!
//! 1. **SourceCheckStep** - Collect normalizer exclusions, warn on missing columns
//! 2. **CountryMergeStep** - Merge country feature tables and outcomes
//! 3. **StateMergeStep** - Merge state feature tables
//! 4. **CorrelationStep** - Correlate country factors with outcomes
//! 5. **AnalogStep** - Fit the analog model and assign every state
//! 6. **ExtrapolationStep** - Scale analog rates onto state populations

use std::time::{Duration, Instant};

use tracing::{info, info_span, warn};

use atlas_model::{
    AnalogAssignment, AtlasError, CorrelationResult, CountryProfile, ExclusionReport,
    ExtrapolationResult, Result, SourceKind, StateProfile,
};
use atlas_normalize::{CountryTables, Normalized, StateTables};

use crate::analog::AnalogModel;
use crate::correlation::analyze_correlations;
use crate::extrapolation::extrapolate;
use crate::merge::{merge_country_profiles, merge_state_profiles};
use crate::pipeline_context::PipelineContext;

/// Normalized tables the pipeline starts from.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub countries: CountryTables,
    pub states: StateTables,
}

/// A single step in the analysis pipeline.
pub trait AnalysisStep {
    fn execute(
        &self,
        inputs: &PipelineInputs,
        ctx: &PipelineContext,
        state: &mut PipelineState,
    ) -> Result<()>;

    /// Human-readable name for this step (for logging/debugging).
    fn step_name(&self) -> &str;
}

/// Mutable state shared across pipeline steps.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub countries: Vec<CountryProfile>,
    pub states: Vec<StateProfile>,
    pub correlations: CorrelationResult,
    pub model: Option<AnalogModel>,
    pub assignments: Vec<AnalogAssignment>,
    pub extrapolation: Vec<ExtrapolationResult>,
    pub report: ExclusionReport,
    pub timings: Vec<StepTiming>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepTiming {
    pub step: String,
    pub elapsed: Duration,
}

/// Every table one run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub countries: Vec<CountryProfile>,
    pub states: Vec<StateProfile>,
    pub correlations: CorrelationResult,
    pub model: AnalogModel,
    pub assignments: Vec<AnalogAssignment>,
    pub extrapolation: Vec<ExtrapolationResult>,
    /// Normalizer, merge and extrapolation exclusions, in stage order.
    pub report: ExclusionReport,
    pub timings: Vec<StepTiming>,
}

impl PipelineState {
    fn into_output(self) -> Result<PipelineOutput> {
        let model = self.model.ok_or_else(|| AtlasError::InvalidModel {
            message: "pipeline finished without fitting an analog model".to_string(),
        })?;
        Ok(PipelineOutput {
            countries: self.countries,
            states: self.states,
            correlations: self.correlations,
            model,
            assignments: self.assignments,
            extrapolation: self.extrapolation,
            report: self.report,
            timings: self.timings,
        })
    }
}

/// An ordered pipeline of analysis steps.
pub struct AnalysisPipeline {
    steps: Vec<Box<dyn AnalysisStep>>,
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisPipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step(mut self, step: Box<dyn AnalysisStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Remove a step by name.
    pub fn remove_step(mut self, step_name: &str) -> Self {
        self.steps.retain(|s| s.step_name() != step_name);
        self
    }

    /// List step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step_name()).collect()
    }

    /// Runs every step against `state`, recording step timings.
    pub fn execute_with_state(
        &self,
        inputs: &PipelineInputs,
        ctx: &PipelineContext,
        state: &mut PipelineState,
    ) -> Result<()> {
        for step in &self.steps {
            let span = info_span!("step", name = step.step_name());
            let _guard = span.enter();
            let started = Instant::now();
            step.execute(inputs, ctx, state)?;
            let elapsed = started.elapsed();
            info!(elapsed_ms = elapsed.as_millis() as u64, "step finished");
            state.timings.push(StepTiming {
                step: step.step_name().to_string(),
                elapsed,
            });
        }
        Ok(())
    }

    pub fn execute(&self, inputs: &PipelineInputs, ctx: &PipelineContext) -> Result<PipelineOutput> {
        let mut state = PipelineState::default();
        self.execute_with_state(inputs, ctx, &mut state)?;
        state.into_output()
    }
}

fn missing_features<T>(kind: SourceKind, table: &Normalized<T>) -> Vec<AtlasError> {
    table
        .missing_columns()
        .into_iter()
        .map(|column| AtlasError::MissingFeature {
            source_name: kind.name().to_string(),
            column: column.to_string(),
        })
        .collect()
}

/// Step 1: gather normalizer exclusions into the run report.
///
/// A source missing a required column arrives empty with a `MissingColumn`
/// exclusion. The run continues: the merges drop the entities that source
/// would have covered, and later steps fail only if nothing is left.
pub struct SourceCheckStep;

impl AnalysisStep for SourceCheckStep {
    fn execute(
        &self,
        inputs: &PipelineInputs,
        _ctx: &PipelineContext,
        state: &mut PipelineState,
    ) -> Result<()> {
        let countries = &inputs.countries;
        let states = &inputs.states;
        let missing = [
            missing_features(SourceKind::CountryArea, &countries.area),
            missing_features(SourceKind::CountryTemperature, &countries.temperature),
            missing_features(SourceKind::CountryHospital, &countries.hospital),
            missing_features(SourceKind::CountryShape, &countries.shape),
            missing_features(SourceKind::MalariaIncidence, &countries.incidence),
            missing_features(SourceKind::MalariaDeath, &countries.death),
            missing_features(SourceKind::StateArea, &states.area),
            missing_features(SourceKind::StatePopulation, &states.population),
            missing_features(SourceKind::StateTemperature, &states.temperature),
            missing_features(SourceKind::StateHospital, &states.hospital),
            missing_features(SourceKind::StateGdp, &states.gdp),
            missing_features(SourceKind::StateShape, &states.shape),
        ];
        for error in missing.iter().flatten() {
            warn!(%error, "source contributes no rows");
        }
        state.report.extend(countries.report());
        state.report.extend(states.report());
        Ok(())
    }

    fn step_name(&self) -> &str {
        "source_check"
    }
}

/// Step 2: country profiles.
pub struct CountryMergeStep;

impl AnalysisStep for CountryMergeStep {
    fn execute(
        &self,
        inputs: &PipelineInputs,
        ctx: &PipelineContext,
        state: &mut PipelineState,
    ) -> Result<()> {
        let merged = merge_country_profiles(&inputs.countries, ctx.options.merge.outcome_join);
        state.countries = merged.profiles;
        state.report.extend(merged.report);
        Ok(())
    }

    fn step_name(&self) -> &str {
        "country_merge"
    }
}

/// Step 3: state profiles.
pub struct StateMergeStep;

impl AnalysisStep for StateMergeStep {
    fn execute(
        &self,
        inputs: &PipelineInputs,
        _ctx: &PipelineContext,
        state: &mut PipelineState,
    ) -> Result<()> {
        let merged = merge_state_profiles(&inputs.states);
        state.states = merged.profiles;
        state.report.extend(merged.report);
        Ok(())
    }

    fn step_name(&self) -> &str {
        "state_merge"
    }
}

/// Step 4: factor/outcome correlations.
pub struct CorrelationStep;

impl AnalysisStep for CorrelationStep {
    fn execute(
        &self,
        _inputs: &PipelineInputs,
        _ctx: &PipelineContext,
        state: &mut PipelineState,
    ) -> Result<()> {
        state.correlations = analyze_correlations(&state.countries)?;
        Ok(())
    }

    fn step_name(&self) -> &str {
        "correlation"
    }
}

/// Step 5: analog model fit and state assignment.
pub struct AnalogStep;

impl AnalysisStep for AnalogStep {
    fn execute(
        &self,
        _inputs: &PipelineInputs,
        ctx: &PipelineContext,
        state: &mut PipelineState,
    ) -> Result<()> {
        let model = AnalogModel::fit(&state.countries, &ctx.options.analog)?;
        state.assignments = model.predict_all(&state.states)?;
        state.model = Some(model);
        Ok(())
    }

    fn step_name(&self) -> &str {
        "analog"
    }
}

/// Step 6: extrapolated totals.
pub struct ExtrapolationStep;

impl AnalysisStep for ExtrapolationStep {
    fn execute(
        &self,
        _inputs: &PipelineInputs,
        ctx: &PipelineContext,
        state: &mut PipelineState,
    ) -> Result<()> {
        let outcome = extrapolate(
            &state.states,
            &state.countries,
            &state.assignments,
            &ctx.options.extrapolation,
        );
        let unmatched = outcome.unmatched_analogs().len();
        if unmatched > 0 {
            warn!(unmatched, "states dropped for lack of an analog profile");
        }
        state.extrapolation = outcome.rows;
        state.report.extend(outcome.report);
        Ok(())
    }

    fn step_name(&self) -> &str {
        "extrapolation"
    }
}

/// Build the default analysis pipeline.
pub fn build_default_pipeline() -> AnalysisPipeline {
    AnalysisPipeline::new()
        .add_step(Box::new(SourceCheckStep))
        .add_step(Box::new(CountryMergeStep))
        .add_step(Box::new(StateMergeStep))
        .add_step(Box::new(CorrelationStep))
        .add_step(Box::new(AnalogStep))
        .add_step(Box::new(ExtrapolationStep))
}

/// Runs the default pipeline over normalized inputs.
pub fn run_pipeline(inputs: &PipelineInputs, ctx: &PipelineContext) -> Result<PipelineOutput> {
    let span = info_span!("run_pipeline");
    let _guard = span.enter();
    let output = build_default_pipeline().execute(inputs, ctx)?;
    info!(
        countries = output.countries.len(),
        states = output.states.len(),
        extrapolated = output.extrapolation.len(),
        excluded = output.report.len(),
        "pipeline finished"
    );
    Ok(output)
}
