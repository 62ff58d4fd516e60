//! Pearson correlation between country factors and malaria outcomes.

use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::{debug, info};

use atlas_model::{
    AtlasError, CorrelationResult, CorrelationStat, CountryProfile, Factor, Outcome, Result,
};

/// Fewest complete pairs for which a p-value is defined.
pub const MIN_PAIRS: usize = 3;

pub fn factor_value(profile: &CountryProfile, factor: Factor) -> f64 {
    match factor {
        Factor::Population => profile.pop_est as f64,
        Factor::GdpPerCapita => profile.gdp_capita,
        Factor::HospitalBedDensity => profile.hosp_beds_dens,
        Factor::Area => profile.area,
        Factor::Temperature => profile.temp,
    }
}

pub fn outcome_value(profile: &CountryProfile, outcome: Outcome) -> f64 {
    match outcome {
        Outcome::DeathRate => profile.death_100000,
        Outcome::IncidenceRate => profile.incidence_1000,
    }
}

fn undefined(factor: Factor, outcome: Outcome, reason: impl Into<String>) -> AtlasError {
    AtlasError::UndefinedCorrelation {
        factor,
        outcome,
        reason: reason.into(),
    }
}

/// Pearson `r` and two-tailed `p` over finite `(x, y)` pairs.
///
/// `r` is clamped into `[-1, 1]`; a perfect correlation has `p = 0`.
pub fn pearson(factor: Factor, outcome: Outcome, pairs: &[(f64, f64)]) -> Result<CorrelationStat> {
    let n = pairs.len();
    if n < MIN_PAIRS {
        return Err(undefined(
            factor,
            outcome,
            format!("{n} complete pairs, need at least {MIN_PAIRS}"),
        ));
    }
    let (first_x, first_y) = pairs[0];
    if pairs.iter().all(|(x, _)| *x == first_x) {
        return Err(undefined(factor, outcome, format!("{factor} has zero variance")));
    }
    if pairs.iter().all(|(_, y)| *y == first_y) {
        return Err(undefined(factor, outcome, format!("{outcome} has zero variance")));
    }

    let count = n as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / count;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / count;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return Err(undefined(factor, outcome, "zero variance"));
    }
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let p = two_tailed_p(r, n).map_err(|reason| undefined(factor, outcome, reason))?;
    Ok(CorrelationStat { r, p, n })
}

fn two_tailed_p(r: f64, n: usize) -> std::result::Result<f64, String> {
    let residual = 1.0 - r * r;
    if residual <= 0.0 {
        return Ok(0.0);
    }
    let freedom = (n - 2) as f64;
    let t = r * (freedom / residual).sqrt();
    let dist = StudentsT::new(0.0, 1.0, freedom).map_err(|e| e.to_string())?;
    Ok((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

/// Pairwise-complete `(factor, outcome)` values; non-finite pairs are skipped.
pub fn complete_pairs(
    profiles: &[CountryProfile],
    factor: Factor,
    outcome: Outcome,
) -> Vec<(f64, f64)> {
    profiles
        .iter()
        .map(|profile| (factor_value(profile, factor), outcome_value(profile, outcome)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect()
}

/// Correlates every factor with every outcome.
pub fn analyze_correlations(profiles: &[CountryProfile]) -> Result<CorrelationResult> {
    let mut result = CorrelationResult::new();
    for outcome in Outcome::ALL {
        for factor in Factor::ALL {
            let pairs = complete_pairs(profiles, factor, outcome);
            let stat = pearson(factor, outcome, &pairs)?;
            debug!(
                factor = factor.code(),
                outcome = outcome.code(),
                r = stat.r,
                p = stat.p,
                n = stat.n,
                "correlation"
            );
            result.insert(factor, outcome, stat);
        }
    }
    info!(pairs = result.len(), countries = profiles.len(), "correlations computed");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_columns_are_perfectly_correlated() {
        let pairs: Vec<(f64, f64)> = (1..=10).map(|v| (f64::from(v), f64::from(v))).collect();
        let stat = pearson(Factor::Area, Outcome::DeathRate, &pairs).unwrap();
        assert_eq!(stat.r, 1.0);
        assert_eq!(stat.p, 0.0);
        assert_eq!(stat.n, 10);
    }

    #[test]
    fn mirrored_columns_are_negatively_correlated() {
        let pairs: Vec<(f64, f64)> = (1..=10).map(|v| (f64::from(v), -2.0 * f64::from(v))).collect();
        let stat = pearson(Factor::Area, Outcome::DeathRate, &pairs).unwrap();
        assert!((stat.r + 1.0).abs() < 1e-12);
        assert!(stat.p < 1e-6);
    }

    #[test]
    fn known_value_matches_reference() {
        // x = 1..5, y = [2, 4, 5, 4, 5]: r = 0.7746, p = 0.1240.
        let pairs = [(1.0, 2.0), (2.0, 4.0), (3.0, 5.0), (4.0, 4.0), (5.0, 5.0)];
        let stat = pearson(Factor::Temperature, Outcome::IncidenceRate, &pairs).unwrap();
        assert!((stat.r - 0.774_596_669).abs() < 1e-6);
        assert!((stat.p - 0.124).abs() < 1e-3);
    }

    #[test]
    fn too_few_pairs_is_undefined() {
        let err = pearson(Factor::Area, Outcome::DeathRate, &[(1.0, 2.0), (2.0, 3.0)]).unwrap_err();
        assert!(matches!(err, AtlasError::UndefinedCorrelation { .. }));
    }

    #[test]
    fn constant_column_is_undefined() {
        let pairs = [(1.0, 2.0), (1.0, 3.0), (1.0, 4.0)];
        let err = pearson(Factor::Population, Outcome::DeathRate, &pairs).unwrap_err();
        assert!(err.to_string().contains("zero variance"));
    }
}
