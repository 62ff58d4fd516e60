use std::io::Write;

use atlas_model::{
    AtlasError, CountryProfile, Geometry, JoinPolicy, PipelineOptions, SourceKind, SourceLayout,
};

fn sample_country() -> CountryProfile {
    CountryProfile {
        name: "Kenya".to_string(),
        area: 219_746.0,
        pop_est: 47_615_739,
        gdp_capita: 0.003_16,
        hosp_beds_dens: 1.4,
        temp: 25.2,
        incidence_1000: 71.3,
        death_100000: 27.9,
        continent: "Africa".to_string(),
        area_year: Some(2010),
        temp_year: Some(2013),
        hosp_year: Some(2010),
        outcome_year: 2015,
        geometry: Geometry::new("POLYGON ((0 0, 1 0, 1 1, 0 0))"),
    }
}

#[test]
fn country_features_are_temp_gdp_hospital() {
    let country = sample_country();
    assert_eq!(country.features(), [25.2, 0.003_16, 1.4]);
}

#[test]
fn country_profile_round_trips_through_json() {
    let country = sample_country();
    let json = serde_json::to_string(&country).expect("serialize profile");
    assert!(json.contains("\"geometry\":\"POLYGON ((0 0, 1 0, 1 1, 0 0))\""));
    let round: CountryProfile = serde_json::from_str(&json).expect("deserialize profile");
    assert_eq!(round, country);
}

#[test]
fn every_source_has_a_layout_file_and_key_column() {
    let options = PipelineOptions::default();
    let layout = SourceLayout::default();
    for kind in SourceKind::ALL {
        assert!(layout.file_name(kind).ends_with(".csv"), "{kind}");
        assert!(!kind.key_column(&options).is_empty(), "{kind}");
    }
}

#[test]
fn load_reads_toml_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[merge]\noutcome_join = \"inner\"").expect("write config");
    let options = PipelineOptions::load(file.path()).expect("load options");
    assert_eq!(options.merge.outcome_join, JoinPolicy::Inner);
}

#[test]
fn load_reports_bad_toml_with_path() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[analog]\nk = \"five\"").expect("write config");
    let error = PipelineOptions::load(file.path()).expect_err("invalid config");
    assert!(matches!(error, AtlasError::Toml { .. }));
}
