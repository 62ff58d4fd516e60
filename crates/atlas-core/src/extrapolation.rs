//! Scaling each analog country's malaria rates onto its state's population.

use tracing::{info, warn};

use atlas_model::{
    AnalogAssignment, AtlasError, CountryProfile, ExclusionReason, ExclusionReport, ExclusionStage,
    ExtrapolationOptions, ExtrapolationResult, StateProfile, total_death, total_incidence,
};

use crate::merge::index_by_key;

#[derive(Debug, Clone, Default)]
pub struct ExtrapolationOutcome {
    pub rows: Vec<ExtrapolationResult>,
    pub report: ExclusionReport,
}

impl ExtrapolationOutcome {
    /// States dropped because their analog country has no profile.
    pub fn unmatched_analogs(&self) -> Vec<AtlasError> {
        self.report
            .iter()
            .filter_map(|exclusion| match &exclusion.reason {
                ExclusionReason::UnmatchedAnalog { country } => Some(AtlasError::UnmatchedAnalog {
                    state: exclusion.key.clone(),
                    country: country.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}

/// Joins each assignment to its state and analog country and computes the
/// expected totals. Output is sorted by state.
///
/// States in the exclusion set are dropped as policy exclusions. An analog
/// without a country profile drops only that state.
pub fn extrapolate(
    states: &[StateProfile],
    countries: &[CountryProfile],
    assignments: &[AnalogAssignment],
    options: &ExtrapolationOptions,
) -> ExtrapolationOutcome {
    let stage = ExclusionStage::Extrapolation;
    let mut report = ExclusionReport::new();
    let state_index = index_by_key(states);
    let country_index = index_by_key(countries);

    let mut rows = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        if options.is_excluded(&assignment.state) {
            report.push(stage.clone(), &assignment.state, ExclusionReason::PolicyExcluded);
            continue;
        }
        let Some(state) = state_index.get(assignment.state.as_str()) else {
            report.push(
                stage.clone(),
                &assignment.state,
                ExclusionReason::JoinMismatch {
                    missing_from: vec!["state_profiles".to_string()],
                },
            );
            continue;
        };
        let Some(country) = country_index.get(assignment.closest_country.as_str()) else {
            let error = AtlasError::UnmatchedAnalog {
                state: assignment.state.clone(),
                country: assignment.closest_country.clone(),
            };
            warn!(%error, "state dropped from extrapolation");
            report.push(
                stage.clone(),
                &assignment.state,
                ExclusionReason::UnmatchedAnalog {
                    country: assignment.closest_country.clone(),
                },
            );
            continue;
        };
        rows.push(ExtrapolationResult {
            state: state.state.clone(),
            closest_country: country.name.clone(),
            pop_est: state.pop_est,
            total_incidence: total_incidence(country.incidence_1000, state.pop_est),
            total_death: total_death(country.death_100000, state.pop_est),
            geometry: state.geometry.clone(),
        });
    }
    rows.sort_by(|a, b| a.state.cmp(&b.state));
    info!(states = rows.len(), excluded = report.len(), "extrapolation computed");
    ExtrapolationOutcome { rows, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_model::Geometry;

    fn state(name: &str, pop_est: i64) -> StateProfile {
        StateProfile {
            state: name.to_string(),
            area: 1.0,
            pop_est,
            gdp_capita: 0.05,
            temp: 15.0,
            hosp_beds_dens: 2.5,
            geometry: Geometry::new("POLYGON EMPTY"),
        }
    }

    fn country(name: &str, incidence_1000: f64, death_100000: f64) -> CountryProfile {
        CountryProfile {
            name: name.to_string(),
            area: 1.0,
            pop_est: 1,
            gdp_capita: 0.01,
            hosp_beds_dens: 1.0,
            temp: 25.0,
            incidence_1000,
            death_100000,
            continent: "Africa".to_string(),
            area_year: None,
            temp_year: None,
            hosp_year: None,
            outcome_year: 2015,
            geometry: Geometry::default(),
        }
    }

    fn assign(state: &str, country: &str) -> AnalogAssignment {
        AnalogAssignment {
            state: state.to_string(),
            closest_country: country.to_string(),
            votes: 1,
            neighbors: Vec::new(),
        }
    }

    #[test]
    fn scales_rates_and_skips_unmatched_analogs() {
        let states = [state("Texas", 1_000_000), state("Ohio", 2_000), state("Alaska", 10)];
        let countries = [country("Chad", 200.0, 50.0)];
        let assignments = [
            assign("Texas", "Chad"),
            assign("Ohio", "Atlantis"),
            assign("Alaska", "Chad"),
        ];
        let outcome = extrapolate(
            &states,
            &countries,
            &assignments,
            &ExtrapolationOptions::default(),
        );
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].total_incidence, 200_000.0);
        assert_eq!(outcome.rows[0].total_death, 500.0);
        let reasons: Vec<&str> = outcome.report.iter().map(|e| e.reason.kind()).collect();
        assert_eq!(reasons, vec!["unmatched_analog", "policy_excluded"]);

        let unmatched = outcome.unmatched_analogs();
        assert_eq!(unmatched.len(), 1);
        assert!(matches!(
            &unmatched[0],
            AtlasError::UnmatchedAnalog { state, country } if state == "Ohio" && country == "Atlantis"
        ));
        assert_eq!(
            unmatched[0].to_string(),
            "state Ohio maps to analog Atlantis, which has no country profile"
        );
    }
}
