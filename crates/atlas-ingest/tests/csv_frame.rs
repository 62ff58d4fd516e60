use std::fs;

use atlas_ingest::{
    IngestOptions, column_names, discover_sources, f64_column, read_csv_frame, read_csv_table,
    read_sources, string_column,
};
use atlas_model::{PipelineOptions, SourceKind, SourceLayout};

const WORLD_BANK: &str = "\u{feff}\"Data Source\",\"World Development Indicators\",\n\
\n\
\"Last Updated Date\",\"2020-02-21\",\n\
\n\
\"Country Name\",\"Country Code\",\"Indicator Name\",\"Indicator Code\",\"2009\",\"2010\",\n\
\"Aruba\",\"ABW\",\"Land area (sq. km)\",\"AG.LND.TOTL.K2\",\"180\",\"180\",\n\
\"Chad\",\"TCD\",\"Land area (sq. km)\",\"AG.LND.TOTL.K2\",\"1259200\",\"\",\n";

#[test]
fn reads_world_bank_export_past_preamble() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("area.csv");
    fs::write(&path, WORLD_BANK).expect("write csv");

    let options = IngestOptions::default().with_key_column("Country Name");
    let frame = read_csv_frame(&path, &options).expect("read frame");

    assert_eq!(frame.height(), 2);
    let names = column_names(&frame);
    assert_eq!(&names[..6], &["Country Name", "Country Code", "Indicator Name", "Indicator Code", "2009", "2010"]);
    assert_eq!(names[6], "column_7");
    assert_eq!(
        string_column(&frame, "Country Name").expect("names"),
        vec!["Aruba", "Chad"]
    );
    assert_eq!(
        f64_column(&frame, "2010").expect("2010"),
        vec![Some(180.0), None]
    );
    assert!(f64_column(&frame, "1999").is_none());
}

#[test]
fn explicit_header_row_overrides_detection() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("states.csv");
    fs::write(&path, "State,POP_EST\nOhio,11689100\nUtah,3205958\n").expect("write csv");

    let table = read_csv_table(&path, &IngestOptions::default().with_header_row(1))
        .expect("read table");
    assert_eq!(table.headers, vec!["Ohio", "11689100"]);
    assert_eq!(table.rows.len(), 1);
}

#[test]
fn empty_file_yields_empty_frame() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("empty.csv");
    fs::write(&path, "\n\n").expect("write csv");
    let frame = read_csv_frame(&path, &IngestOptions::default()).expect("read frame");
    assert_eq!(frame.height(), 0);
    assert_eq!(frame.width(), 0);
}

#[test]
fn discovery_reports_found_and_missing_sources() {
    let dir = tempfile::tempdir().expect("temp dir");
    let layout = SourceLayout::default();
    fs::write(dir.path().join(&layout.malaria_incidence), "Entity\n").expect("write csv");
    fs::write(
        dir.path().join(layout.state_gdp.to_uppercase()),
        "State\n",
    )
    .expect("write csv");
    fs::write(dir.path().join("notes.txt"), "ignored").expect("write txt");

    let discovered = discover_sources(dir.path(), &layout).expect("discover");
    assert!(discovered.path(SourceKind::MalariaIncidence).is_some());
    assert!(discovered.path(SourceKind::StateGdp).is_some());
    assert_eq!(discovered.found.len(), 2);
    assert_eq!(discovered.missing.len(), SourceKind::ALL.len() - 2);
    assert!(!discovered.is_complete());
}

#[test]
fn read_sources_loads_found_files_and_defaults_missing_ones() {
    let dir = tempfile::tempdir().expect("temp dir");
    let options = PipelineOptions::default();
    fs::write(dir.path().join(&options.layout.country_area), WORLD_BANK).expect("write csv");
    fs::write(
        dir.path().join(&options.layout.state_population),
        "State,POP_EST\nOhio,11689100\n",
    )
    .expect("write csv");

    let discovered = discover_sources(dir.path(), &options.layout).expect("discover");
    let frames = read_sources(&discovered, &options).expect("read sources");
    assert_eq!(frames.len(), 2);
    assert_eq!(frames.get(SourceKind::CountryArea).height(), 2);
    assert_eq!(frames.get(SourceKind::StatePopulation).height(), 1);
    assert!(!frames.contains(SourceKind::StateGdp));
    assert_eq!(frames.get(SourceKind::StateGdp).width(), 0);
}
