//! End-to-end runs over a small data directory written to disk.

use std::fs;
use std::path::Path;

use atlas_cli::output::{EXTRAPOLATION_FILE, OutputPaths, write_outputs};
use atlas_cli::pipeline::{Overrides, analyze, build_context, ingest, load_options};
use atlas_model::{PipelineOptions, SourceKind};

/// (name, area km², mean °C, beds, GDP millions, population, incidence, deaths)
const COUNTRIES: &[(&str, f64, f64, f64, f64, i64, f64, f64)] = &[
    ("Brazil", 8_358_140.0, 25.0, 2.2, 3_000_000.0, 207_000_000, 4.0, 0.05),
    ("Chad", 1_259_200.0, 28.0, 0.4, 30_000.0, 15_000_000, 200.0, 50.0),
    ("India", 2_973_190.0, 24.0, 0.7, 9_000_000.0, 1_300_000_000, 18.0, 1.2),
    ("Iran", 1_622_500.0, 17.0, 1.5, 1_600_000.0, 82_000_000, 0.01, 0.001),
    ("Mali", 1_220_190.0, 29.0, 0.1, 40_000.0, 18_000_000, 380.0, 90.0),
    ("Peru", 1_279_999.0, 19.0, 1.6, 400_000.0, 32_000_000, 2.0, 0.1),
];

/// (state, area mi², °F, beds, GDP millions, population)
const STATES: &[(&str, f64, f64, f64, f64, i64)] = &[
    ("Alaska", 665_384.0, 26.6, 2.2, 50_000.0, 740_000),
    ("Maine", 35_380.0, 44.6, 2.5, 60_000.0, 1_300_000),
    ("Ohio", 44_825.0, 66.2, 1.6, 125_000.0, 10_000_000),
    ("Texas", 268_596.0, 66.2, 2.3, 1_600_000.0, 28_000_000),
];

fn write_csv(dir: &Path, name: &str, headers: &[&str], rows: Vec<Vec<String>>) {
    let mut writer = csv::Writer::from_path(dir.join(name)).expect("create csv");
    writer.write_record(headers).expect("write header");
    for row in rows {
        writer.write_record(&row).expect("write row");
    }
    writer.flush().expect("flush csv");
}

fn write_data_dir(dir: &Path) {
    let options = PipelineOptions::default();
    let layout = &options.layout;
    let countries = &options.countries;
    let states = &options.states;

    // World Bank exports start with a preamble before the header row.
    let area_rows: Vec<String> = COUNTRIES
        .iter()
        .map(|c| format!("\"{}\",\"XXX\",\"{}\",\"{}\"", c.0, c.1 * 0.99, c.1))
        .collect();
    fs::write(
        dir.join(&layout.country_area),
        format!(
            "\"Data Source\",\"World Development Indicators\",\n\n\
             \"Last Updated Date\",\"2019-01-30\",\n\n\
             \"Country Name\",\"Country Code\",\"2009\",\"2010\"\n{}\n",
            area_rows.join("\n")
        ),
    )
    .expect("write area");

    let mut temperature = Vec::new();
    for c in COUNTRIES {
        for month in ["01", "07"] {
            temperature.push(vec![
                format!("2013-{month}-01"),
                c.2.to_string(),
                "0.3".to_string(),
                c.0.to_string(),
            ]);
        }
        temperature.push(vec![
            "1900-01-01".to_string(),
            "-40".to_string(),
            "2.0".to_string(),
            c.0.to_string(),
        ]);
    }
    write_csv(
        dir,
        &layout.country_temperature,
        &["dt", "AverageTemperature", "AverageTemperatureUncertainty", "Country"],
        temperature,
    );

    write_csv(
        dir,
        &layout.country_hospital,
        &[countries.hospital.key.as_str(), "2012", "2014"],
        COUNTRIES
            .iter()
            .map(|c| vec![c.0.to_string(), "9.9".to_string(), c.3.to_string()])
            .collect(),
    );

    write_csv(
        dir,
        &layout.country_shape,
        &["NAME", "GDP_MD_EST", "POP_EST", "GDP_YEAR", "POP_YEAR", "CONTINENT", "geometry"],
        COUNTRIES
            .iter()
            .map(|c| {
                vec![
                    c.0.to_string(),
                    c.4.to_string(),
                    c.5.to_string(),
                    "2016".to_string(),
                    "2017".to_string(),
                    "Somewhere".to_string(),
                    format!("POINT ({} 0)", c.0.len()),
                ]
            })
            .collect(),
    );

    for (file, source, value) in [
        (&layout.malaria_incidence, &countries.incidence, 6usize),
        (&layout.malaria_death, &countries.death, 7usize),
    ] {
        let mut rows: Vec<Vec<String>> = COUNTRIES
            .iter()
            .map(|c| {
                let rate = if value == 6 { c.6 } else { c.7 };
                vec![
                    c.0.to_string(),
                    c.0[..3].to_uppercase(),
                    "2015".to_string(),
                    rate.to_string(),
                ]
            })
            .collect();
        rows.push(vec![
            "Chad".to_string(),
            "CHA".to_string(),
            "2000".to_string(),
            "999".to_string(),
        ]);
        write_csv(
            dir,
            file,
            &[
                source.key.as_str(),
                source.code.as_str(),
                source.year_column.as_str(),
                source.value.as_str(),
            ],
            rows,
        );
    }

    let state_table = |file: &str, column: &str, value: fn(&(&str, f64, f64, f64, f64, i64)) -> String| {
        write_csv(
            dir,
            file,
            &["State", column],
            STATES.iter().map(|s| vec![s.0.to_string(), value(s)]).collect(),
        );
    };
    state_table(&layout.state_area, &states.area.value, |s| s.1.to_string());
    state_table(&layout.state_temperature, &states.temperature.value, |s| s.2.to_string());
    state_table(&layout.state_hospital, &states.hospital.value, |s| s.3.to_string());
    state_table(&layout.state_gdp, &states.gdp.value, |s| s.4.to_string());
    state_table(&layout.state_population, &states.population.value, |s| s.5.to_string());
    write_csv(
        dir,
        &layout.state_shape,
        &["NAME", "geometry"],
        STATES
            .iter()
            .map(|s| vec![s.0.to_string(), format!("POINT ({} 1)", s.0.len())])
            .collect(),
    );
}

#[test]
fn full_run_writes_every_table() {
    let data = tempfile::tempdir().expect("temp dir");
    write_data_dir(data.path());
    let options = load_options(None).expect("options");
    let ingested = ingest(data.path(), &options).expect("ingest");
    assert!(ingested.discovered.is_complete());
    assert!(ingested.sources.iter().all(|s| s.found && s.rows > 0));

    let ctx = build_context(options, &Overrides::default());
    let output = analyze(&ingested.inputs, &ctx).expect("analyze");
    assert_eq!(output.countries.len(), COUNTRIES.len());
    assert_eq!(output.states.len(), STATES.len());
    assert_eq!(output.correlations.entries().len(), 20);

    let out_dir = data.path().join("output");
    let paths = write_outputs(&out_dir, &output).expect("write outputs");
    for path in paths.all() {
        assert!(path.is_file(), "{} missing", path.display());
    }

    let correlations: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&paths.correlations).expect("read"))
            .expect("json");
    assert_eq!(correlations["entries"].as_object().map(|m| m.len()), Some(20));
    assert_eq!(correlations["pairs"].as_array().map(Vec::len), Some(10));

    let exclusions: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&paths.exclusions).expect("read"))
            .expect("json");
    assert_eq!(exclusions["by_reason"]["policy_excluded"], 1);
    assert_eq!(exclusions["by_stage"]["extrapolation"], 1);
}

#[test]
fn extrapolation_table_follows_the_nearest_analog() {
    let data = tempfile::tempdir().expect("temp dir");
    write_data_dir(data.path());
    let options = PipelineOptions::default();
    let ingested = ingest(data.path(), &options).expect("ingest");
    let overrides = Overrides {
        k: Some(1),
        ..Overrides::default()
    };
    let output = analyze(&ingested.inputs, &build_context(options, &overrides)).expect("analyze");
    let paths = write_outputs(data.path(), &output).expect("write outputs");
    assert_eq!(paths.extrapolation, data.path().join(EXTRAPOLATION_FILE));

    let mut reader = csv::Reader::from_path(&paths.extrapolation).expect("open csv");
    let headers = reader.headers().expect("headers").clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["state", "closest_country", "pop_est", "total_incidence", "total_death", "geometry"]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
    let states: Vec<&str> = rows.iter().map(|r| &r[0]).collect();
    assert_eq!(states, vec!["Maine", "Ohio", "Texas"]);

    let ohio = &rows[1];
    assert_eq!(&ohio[1], "Peru");
    let cases: f64 = ohio[3].parse().expect("cases");
    let deaths: f64 = ohio[4].parse().expect("deaths");
    assert!((cases - 20_000.0).abs() < 1e-6);
    assert!((deaths - 10.0).abs() < 1e-9);
    assert_eq!(&ohio[5], "POINT (4 1)");
}

#[test]
fn missing_state_file_keeps_country_results() {
    let data = tempfile::tempdir().expect("temp dir");
    write_data_dir(data.path());
    let options = PipelineOptions::default();
    fs::remove_file(data.path().join(&options.layout.state_gdp)).expect("remove");

    let ingested = ingest(data.path(), &options).expect("ingest");
    let missing: Vec<SourceKind> = ingested.discovered.missing.iter().map(|(k, _)| *k).collect();
    assert_eq!(missing, vec![SourceKind::StateGdp]);

    let output = analyze(&ingested.inputs, &build_context(options, &Overrides::default()))
        .expect("analyze");
    assert_eq!(output.countries.len(), COUNTRIES.len());
    assert_eq!(output.correlations.entries().len(), 20);
    assert!(output.states.is_empty());
    assert!(output.extrapolation.is_empty());

    let paths = write_outputs(&data.path().join("output"), &output).expect("write outputs");
    let exclusions: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&paths.exclusions).expect("read"))
            .expect("json");
    assert_eq!(exclusions["by_stage"]["state_merge"], STATES.len());
    assert!(exclusions["by_reason"]["missing_column"].as_u64() > Some(0));
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("atlas.toml");
    fs::write(
        &path,
        "[analog]\nk = 3\n\n[extrapolation]\nexcluded_states = [\"Texas\"]\n",
    )
    .expect("write config");
    let options = load_options(Some(&path)).expect("load");
    assert_eq!(options.analog.k, 3);
    assert!(options.extrapolation.is_excluded("Texas"));
    assert!(!options.extrapolation.is_excluded("Alaska"));
    assert_eq!(options.layout, atlas_model::SourceLayout::default());

    assert!(load_options(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn outputs_land_in_a_fresh_directory() {
    let data = tempfile::tempdir().expect("temp dir");
    write_data_dir(data.path());
    let options = PipelineOptions::default();
    let ingested = ingest(data.path(), &options).expect("ingest");
    let output =
        analyze(&ingested.inputs, &build_context(options, &Overrides::default())).expect("analyze");
    let nested = data.path().join("runs").join("first");
    let paths = write_outputs(&nested, &output).expect("write outputs");
    let expected = OutputPaths::in_dir(&nested);
    assert_eq!(paths.analogs, expected.analogs);

    let analogs = fs::read_to_string(&paths.analogs).expect("read analogs");
    let mut lines = analogs.lines();
    assert_eq!(lines.next(), Some("state,closest_country,votes,neighbors"));
    assert_eq!(lines.count(), STATES.len());
}
