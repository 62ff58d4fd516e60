//! Pipeline context for one analysis run.
//!
//! Bundles the options every stage reads so they are resolved once, from
//! defaults, a config file and command-line overrides, before the run.

use atlas_model::{JoinPolicy, PipelineOptions};

#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    pub options: PipelineOptions,
}

impl PipelineContext {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Sets the neighbor count for the analog classifier.
    pub fn with_k(mut self, k: usize) -> Self {
        self.options.analog.k = k;
        self
    }

    pub fn with_outcome_join(mut self, policy: JoinPolicy) -> Self {
        self.options.merge.outcome_join = policy;
        self
    }

    /// Adds states to the extrapolation exclusion set.
    pub fn with_excluded_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .extrapolation
            .excluded_states
            .extend(states.into_iter().map(|s| s.into().trim().to_string()));
        self
    }

    /// Empties the exclusion set, including the default entries.
    pub fn without_excluded_states(mut self) -> Self {
        self.options.extrapolation.excluded_states.clear();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let ctx = PipelineContext::default()
            .with_k(3)
            .with_outcome_join(JoinPolicy::Inner)
            .with_excluded_states([" Texas "]);
        assert_eq!(ctx.options.analog.k, 3);
        assert_eq!(ctx.options.merge.outcome_join, JoinPolicy::Inner);
        assert!(ctx.options.extrapolation.is_excluded("Texas"));
        assert!(ctx.options.extrapolation.is_excluded("Alaska"));

        let cleared = ctx.without_excluded_states().with_excluded_states(["Ohio"]);
        assert!(!cleared.options.extrapolation.is_excluded("Alaska"));
        assert!(cleared.options.extrapolation.is_excluded("Ohio"));
    }
}
