//! Entity merge engine.
//!
//! Joins per-feature tables on the entity name into typed profiles. Keys
//! missing from any table are dropped and recorded with every table they
//! were absent from; output is sorted by key.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use atlas_model::{
    CountryProfile, DeathRecord, ExclusionReason, ExclusionReport, ExclusionStage,
    IncidenceRecord, JoinPolicy, Keyed, OutcomeRecord, StateProfile,
};
use atlas_normalize::{CountryTables, StateTables};

/// Profiles produced by a merge, plus the keys it dropped.
#[derive(Debug, Clone)]
pub struct MergeOutcome<P> {
    pub profiles: Vec<P>,
    pub report: ExclusionReport,
}

impl<P> MergeOutcome<P> {
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Indexes records by key; the first record for a key wins.
pub fn index_by_key<T: Keyed>(records: &[T]) -> BTreeMap<&str, &T> {
    let mut index = BTreeMap::new();
    for record in records {
        index.entry(record.key()).or_insert(record);
    }
    index
}

/// Key sets of the tables taking part in one inner join.
struct JoinTables<'a> {
    tables: Vec<(&'static str, BTreeSet<&'a str>)>,
    /// Keys an earlier stage already dropped and recorded.
    settled: BTreeSet<String>,
}

impl<'a> JoinTables<'a> {
    fn new() -> Self {
        Self {
            tables: Vec::new(),
            settled: BTreeSet::new(),
        }
    }

    fn settled(mut self, report: &ExclusionReport) -> Self {
        self.settled
            .extend(report.iter().map(|exclusion| exclusion.key.clone()));
        self
    }

    fn table<T: Keyed>(mut self, name: &'static str, records: &'a [T]) -> Self {
        let keys = records.iter().map(Keyed::key).collect();
        self.tables.push((name, keys));
        self
    }

    /// Keys present in every table, sorted. Every other key not already
    /// settled is recorded as a join mismatch naming the tables it was
    /// missing from.
    fn resolve(&self, stage: &ExclusionStage, report: &mut ExclusionReport) -> Vec<&'a str> {
        let all_keys: BTreeSet<&'a str> = self
            .tables
            .iter()
            .flat_map(|(_, keys)| keys.iter().copied())
            .collect();
        let mut joined = Vec::with_capacity(all_keys.len());
        let mut mismatched = 0usize;
        for key in all_keys {
            let missing_from: Vec<String> = self
                .tables
                .iter()
                .filter(|(_, keys)| !keys.contains(key))
                .map(|(name, _)| (*name).to_string())
                .collect();
            if missing_from.is_empty() {
                joined.push(key);
            } else if self.settled.contains(key) {
                debug!(%stage, key, "already dropped upstream");
            } else {
                debug!(%stage, key, missing_from = ?missing_from, "join mismatch");
                report.push(
                    stage.clone(),
                    key,
                    ExclusionReason::JoinMismatch { missing_from },
                );
                mismatched += 1;
            }
        }
        if mismatched > 0 {
            warn!(%stage, joined = joined.len(), mismatched, "keys dropped by inner join");
        }
        joined
    }
}

fn codes_match(incidence: &IncidenceRecord, death: &DeathRecord) -> bool {
    incidence.year == death.year && incidence.code == death.code
}

/// Combines the incidence and death tables under `policy`.
///
/// Both policies keep the same countries: those with an incidence row and a
/// death row agreeing on name, year and code. They differ in how the dropped
/// incidence rows are recorded: as a missing death rate under
/// [`JoinPolicy::LeftFavoringIncidence`], as a join mismatch under
/// [`JoinPolicy::Inner`].
pub fn merge_outcomes(
    incidence: &[IncidenceRecord],
    deaths: &[DeathRecord],
    policy: JoinPolicy,
) -> MergeOutcome<OutcomeRecord> {
    let stage = ExclusionStage::OutcomeMerge;
    let mut report = ExclusionReport::new();
    let incidence_index = index_by_key(incidence);
    let death_index = index_by_key(deaths);

    let mut profiles = Vec::with_capacity(incidence_index.len());
    for (key, row) in &incidence_index {
        match death_index.get(key).filter(|death| codes_match(row, death)) {
            Some(death) => profiles.push(OutcomeRecord {
                name: (*key).to_string(),
                year: row.year,
                incidence_1000: row.incidence_1000,
                death_100000: death.death_100000,
            }),
            None => {
                let reason = match policy {
                    JoinPolicy::LeftFavoringIncidence => ExclusionReason::MissingValue {
                        column: "death_100000".to_string(),
                    },
                    JoinPolicy::Inner => ExclusionReason::JoinMismatch {
                        missing_from: vec!["death".to_string()],
                    },
                };
                report.push(stage.clone(), *key, reason);
            }
        }
    }
    for key in death_index.keys() {
        if !incidence_index.contains_key(key) {
            report.push(
                stage.clone(),
                *key,
                ExclusionReason::JoinMismatch {
                    missing_from: vec!["incidence".to_string()],
                },
            );
        }
    }
    info!(
        policy = %policy,
        kept = profiles.len(),
        excluded = report.len(),
        "outcomes merged"
    );
    MergeOutcome { profiles, report }
}

/// Inner join of the country feature tables with the merged outcomes.
pub fn merge_country_profiles(
    tables: &CountryTables,
    policy: JoinPolicy,
) -> MergeOutcome<CountryProfile> {
    let outcomes = merge_outcomes(&tables.incidence.records, &tables.death.records, policy);
    let stage = ExclusionStage::CountryMerge;
    let joins = JoinTables::new().settled(&outcomes.report);
    let mut report = outcomes.report;

    let keys = joins
        .table("area", &tables.area.records)
        .table("temperature", &tables.temperature.records)
        .table("hospital", &tables.hospital.records)
        .table("shape", &tables.shape.records)
        .table("outcomes", &outcomes.profiles)
        .resolve(&stage, &mut report);

    let area = index_by_key(&tables.area.records);
    let temperature = index_by_key(&tables.temperature.records);
    let hospital = index_by_key(&tables.hospital.records);
    let shape = index_by_key(&tables.shape.records);
    let outcome = index_by_key(&outcomes.profiles);

    let mut profiles = Vec::with_capacity(keys.len());
    for key in keys {
        let (Some(area), Some(temperature), Some(hospital), Some(shape), Some(outcome)) = (
            area.get(key),
            temperature.get(key),
            hospital.get(key),
            shape.get(key),
            outcome.get(key),
        ) else {
            continue;
        };
        profiles.push(CountryProfile {
            name: key.to_string(),
            area: area.area,
            pop_est: shape.pop_est,
            gdp_capita: shape.gdp_capita,
            hosp_beds_dens: hospital.hosp_beds_dens,
            temp: temperature.temp,
            incidence_1000: outcome.incidence_1000,
            death_100000: outcome.death_100000,
            continent: shape.continent.clone(),
            area_year: area.area_year,
            temp_year: temperature.temp_year,
            hosp_year: hospital.hosp_year,
            outcome_year: outcome.year,
            geometry: shape.geometry.clone(),
        });
    }
    info!(countries = profiles.len(), excluded = report.len(), "country profiles merged");
    MergeOutcome { profiles, report }
}

/// Inner join of the state feature tables.
///
/// GDP per capita is derived here, in the same unit as the country column.
/// A state with a non-positive population is dropped as invalid.
pub fn merge_state_profiles(tables: &StateTables) -> MergeOutcome<StateProfile> {
    let stage = ExclusionStage::StateMerge;
    let mut report = ExclusionReport::new();

    let keys = JoinTables::new()
        .table("area", &tables.area.records)
        .table("population", &tables.population.records)
        .table("temperature", &tables.temperature.records)
        .table("hospital", &tables.hospital.records)
        .table("gdp", &tables.gdp.records)
        .table("shape", &tables.shape.records)
        .resolve(&stage, &mut report);

    let area = index_by_key(&tables.area.records);
    let population = index_by_key(&tables.population.records);
    let temperature = index_by_key(&tables.temperature.records);
    let hospital = index_by_key(&tables.hospital.records);
    let gdp = index_by_key(&tables.gdp.records);
    let shape = index_by_key(&tables.shape.records);

    let mut profiles = Vec::with_capacity(keys.len());
    for key in keys {
        let (
            Some(area),
            Some(population),
            Some(temperature),
            Some(hospital),
            Some(gdp),
            Some(shape),
        ) = (
            area.get(key),
            population.get(key),
            temperature.get(key),
            hospital.get(key),
            gdp.get(key),
            shape.get(key),
        )
        else {
            continue;
        };
        if population.pop_est <= 0 {
            report.push(
                stage.clone(),
                key,
                ExclusionReason::InvalidValue {
                    column: "pop_est".to_string(),
                    value: population.pop_est.to_string(),
                },
            );
            continue;
        }
        profiles.push(StateProfile {
            state: key.to_string(),
            area: area.area,
            pop_est: population.pop_est,
            gdp_capita: gdp.gdp_md_est / population.pop_est as f64,
            temp: temperature.temp,
            hosp_beds_dens: hospital.hosp_beds_dens,
            geometry: shape.geometry.clone(),
        });
    }
    info!(states = profiles.len(), excluded = report.len(), "state profiles merged");
    MergeOutcome { profiles, report }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incidence(name: &str, code: Option<&str>, rate: f64) -> IncidenceRecord {
        IncidenceRecord {
            name: name.to_string(),
            code: code.map(str::to_string),
            year: 2015,
            incidence_1000: rate,
        }
    }

    fn death(name: &str, code: Option<&str>, rate: f64) -> DeathRecord {
        DeathRecord {
            name: name.to_string(),
            code: code.map(str::to_string),
            year: 2015,
            death_100000: rate,
        }
    }

    #[test]
    fn left_policy_records_missing_death_rate() {
        let incidence = vec![
            incidence("Chad", Some("TCD"), 200.0),
            incidence("Mali", Some("MLI"), 300.0),
        ];
        let deaths = vec![death("Chad", Some("TCD"), 50.0), death("Peru", Some("PER"), 1.0)];
        let merged = merge_outcomes(&incidence, &deaths, JoinPolicy::LeftFavoringIncidence);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.profiles[0].death_100000, 50.0);
        let kinds: Vec<(&str, &str)> = merged
            .report
            .iter()
            .map(|e| (e.key.as_str(), e.reason.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![("Mali", "missing_value"), ("Peru", "join_mismatch")]
        );
    }

    #[test]
    fn inner_policy_keeps_same_rows() {
        let incidence = vec![incidence("Chad", Some("TCD"), 200.0), incidence("Mali", None, 1.0)];
        let deaths = vec![death("Chad", Some("TCD"), 50.0), death("Mali", Some("MLI"), 2.0)];
        let left = merge_outcomes(&incidence, &deaths, JoinPolicy::LeftFavoringIncidence);
        let inner = merge_outcomes(&incidence, &deaths, JoinPolicy::Inner);
        assert_eq!(left.profiles, inner.profiles);
        assert_eq!(inner.report.exclusions[0].reason.kind(), "join_mismatch");
    }

    #[test]
    fn settled_keys_are_not_recorded_again() {
        #[derive(Debug)]
        struct Row(&'static str);
        impl Keyed for Row {
            fn key(&self) -> &str {
                self.0
            }
        }
        let mut upstream = ExclusionReport::new();
        upstream.push(
            ExclusionStage::OutcomeMerge,
            "y",
            ExclusionReason::JoinMismatch {
                missing_from: vec!["incidence".to_string()],
            },
        );
        let a = [Row("x"), Row("y"), Row("z")];
        let b = [Row("x")];
        let mut report = ExclusionReport::new();
        let keys = JoinTables::new()
            .table("a", &a)
            .table("b", &b)
            .settled(&upstream)
            .resolve(&ExclusionStage::CountryMerge, &mut report);
        assert_eq!(keys, vec!["x"]);
        assert_eq!(report.keys_for_stage(&ExclusionStage::CountryMerge), vec!["z"]);
    }

    #[test]
    fn join_mismatch_names_every_missing_table() {
        #[derive(Debug)]
        struct Row(&'static str);
        impl Keyed for Row {
            fn key(&self) -> &str {
                self.0
            }
        }
        let a = [Row("x"), Row("y")];
        let b = [Row("x")];
        let c = [Row("x"), Row("z")];
        let mut report = ExclusionReport::new();
        let keys = JoinTables::new()
            .table("a", &a)
            .table("b", &b)
            .table("c", &c)
            .resolve(&ExclusionStage::CountryMerge, &mut report);
        assert_eq!(keys, vec!["x"]);
        let reasons: Vec<&ExclusionReason> = report.iter().map(|e| &e.reason).collect();
        assert_eq!(
            reasons,
            vec![
                &ExclusionReason::JoinMismatch {
                    missing_from: vec!["b".to_string(), "c".to_string()]
                },
                &ExclusionReason::JoinMismatch {
                    missing_from: vec!["a".to_string(), "b".to_string()]
                },
            ]
        );
    }
}
