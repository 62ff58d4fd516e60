use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::Table;
use tracing::{info, info_span};

use atlas_cli::output::write_outputs;
use atlas_cli::pipeline::{Overrides, analyze, build_context, ingest, load_options};
use atlas_model::{JoinPolicy, PipelineOptions, SourceKind};

use crate::cli::{OutcomeJoinArg, RunArgs, SourcesArgs};
use crate::summary::{apply_table_style, header_cell};
use crate::types::RunResult;

pub fn run_sources(args: &SourcesArgs) -> Result<()> {
    let options = load_options(args.config.as_deref())?;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("File"),
        header_cell("Columns"),
    ]);
    apply_table_style(&mut table);
    for kind in SourceKind::ALL {
        table.add_row(vec![
            kind.name().to_string(),
            options.layout.file_name(kind).to_string(),
            source_columns(kind, &options).join(", "),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_analysis(args: &RunArgs) -> Result<RunResult> {
    let data_dir = &args.data_dir;
    let run_span = info_span!("run", data_dir = %data_dir.display());
    let _run_guard = run_span.enter();
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("output"));

    let options = load_options(args.config.as_deref())?;
    let ctx = build_context(options, &overrides_from_args(args));

    let ingest_start = Instant::now();
    let ingested = info_span!("ingest").in_scope(|| ingest(data_dir, &ctx.options))?;
    info!(
        found = ingested.discovered.found.len(),
        missing = ingested.discovered.missing.len(),
        duration_ms = ingest_start.elapsed().as_millis(),
        "ingest complete"
    );

    let analyze_start = Instant::now();
    let output = analyze(&ingested.inputs, &ctx)?;
    info!(
        duration_ms = analyze_start.elapsed().as_millis(),
        "analysis complete"
    );

    let written = if args.dry_run {
        info!("dry run; skipping output files");
        None
    } else {
        let paths = info_span!("output", output_dir = %output_dir.display())
            .in_scope(|| write_outputs(&output_dir, &output))
            .context("write outputs")?;
        Some(paths)
    };

    Ok(RunResult {
        data_dir: data_dir.clone(),
        output_dir,
        sources: ingested.sources,
        output,
        written,
    })
}

fn overrides_from_args(args: &RunArgs) -> Overrides {
    Overrides {
        k: args.k.map(|k| k as usize),
        outcome_join: args.outcome_join.map(|arg| match arg {
            OutcomeJoinArg::Left => JoinPolicy::LeftFavoringIncidence,
            OutcomeJoinArg::Inner => JoinPolicy::Inner,
        }),
        clear_exclusions: args.no_default_exclusions,
        exclude_states: args.exclude_state.clone(),
    }
}

/// Column names the normalizer for `kind` reads.
fn source_columns(kind: SourceKind, options: &PipelineOptions) -> Vec<String> {
    let countries = &options.countries;
    let states = &options.states;
    let value_columns = |source: &atlas_model::ValueSource| {
        let mut columns = vec![source.key.clone(), source.value.clone()];
        columns.extend(source.year_column.clone());
        columns
    };
    match kind {
        SourceKind::CountryArea => vec![
            countries.area.key.clone(),
            countries.area.year.to_string(),
        ],
        SourceKind::CountryTemperature => {
            let source = &countries.temperature;
            let mut columns = vec![source.key.clone(), source.date.clone(), source.value.clone()];
            columns.extend(source.uncertainty.clone());
            columns
        }
        SourceKind::CountryHospital => {
            vec![countries.hospital.key.clone(), "<year columns>".to_string()]
        }
        SourceKind::CountryShape => {
            let source = &countries.shape;
            vec![
                source.name.clone(),
                source.gdp.clone(),
                source.population.clone(),
                source.gdp_year.clone(),
                source.pop_year.clone(),
                source.continent.clone(),
                source.geometry.clone(),
            ]
        }
        SourceKind::MalariaIncidence | SourceKind::MalariaDeath => {
            let source = if kind == SourceKind::MalariaIncidence {
                &countries.incidence
            } else {
                &countries.death
            };
            vec![
                source.key.clone(),
                source.code.clone(),
                source.year_column.clone(),
                source.value.clone(),
            ]
        }
        SourceKind::StateArea => value_columns(&states.area),
        SourceKind::StatePopulation => value_columns(&states.population),
        SourceKind::StateTemperature => value_columns(&states.temperature),
        SourceKind::StateHospital => value_columns(&states.hospital),
        SourceKind::StateGdp => value_columns(&states.gdp),
        SourceKind::StateShape => vec![states.shape.key.clone(), states.shape.geometry.clone()],
    }
}
