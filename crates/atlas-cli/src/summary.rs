use std::collections::BTreeMap;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use atlas_model::{CorrelationResult, ExclusionReport, ExtrapolationResult, Factor, Outcome};

use crate::types::RunResult;

/// Significance threshold used to highlight p-values.
const ALPHA: f64 = 0.05;

pub fn print_summary(result: &RunResult) {
    println!("Data: {}", result.data_dir.display());
    match &result.written {
        Some(_) => println!("Output: {}", result.output_dir.display()),
        None => println!("Output: dry run, nothing written"),
    }
    print_source_table(result);
    print_correlation_table(&result.output.correlations);
    print_extrapolation_table(&result.output.extrapolation);
    print_exclusion_table(&result.output.report);
}

fn print_source_table(result: &RunResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("File"),
        header_cell("Rows"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for source in &result.sources {
        let file = source
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let rows = if source.found {
            Cell::new(source.rows)
        } else {
            Cell::new("missing")
                .fg(Color::Red)
                .add_attribute(Attribute::Bold)
        };
        table.add_row(vec![Cell::new(source.kind.name()), dim_cell(file), rows]);
    }
    println!();
    println!("Sources:");
    println!("{table}");
}

fn print_correlation_table(correlations: &CorrelationResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Factor"),
        header_cell("r (death)"),
        header_cell("p (death)"),
        header_cell("r (incidence)"),
        header_cell("p (incidence)"),
        header_cell("n"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for factor in Factor::ALL {
        let death = correlations.get(factor, Outcome::DeathRate);
        let incidence = correlations.get(factor, Outcome::IncidenceRate);
        let n = death.or(incidence).map(|stat| stat.n);
        table.add_row(vec![
            Cell::new(factor.label()),
            stat_cell(death.map(|stat| stat.r)),
            p_cell(death.map(|stat| stat.p)),
            stat_cell(incidence.map(|stat| stat.r)),
            p_cell(incidence.map(|stat| stat.p)),
            n.map_or_else(|| dim_cell("-"), Cell::new),
        ]);
    }
    println!();
    println!("Correlations:");
    println!("{table}");
}

fn print_extrapolation_table(rows: &[ExtrapolationResult]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("State"),
        header_cell("Analog"),
        header_cell("Population"),
        header_cell("Cases"),
        header_cell("Deaths"),
    ]);
    apply_table_style(&mut table);
    for index in 2..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let mut total_pop = 0i64;
    let mut total_cases = 0.0;
    let mut total_deaths = 0.0;
    for row in rows {
        total_pop += row.pop_est;
        total_cases += row.total_incidence;
        total_deaths += row.total_death;
        table.add_row(vec![
            Cell::new(&row.state),
            Cell::new(&row.closest_country).fg(Color::Blue),
            Cell::new(row.pop_est),
            Cell::new(format!("{:.0}", row.total_incidence)),
            Cell::new(format!("{:.1}", row.total_death)),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total_pop).add_attribute(Attribute::Bold),
        Cell::new(format!("{total_cases:.0}")).add_attribute(Attribute::Bold),
        Cell::new(format!("{total_deaths:.1}")).add_attribute(Attribute::Bold),
    ]);
    println!();
    println!("Extrapolation:");
    println!("{table}");
}

fn print_exclusion_table(report: &ExclusionReport) {
    if report.is_empty() {
        return;
    }
    let mut reasons: BTreeMap<String, BTreeMap<&'static str, usize>> = BTreeMap::new();
    for exclusion in report.iter() {
        *reasons
            .entry(exclusion.stage.to_string())
            .or_default()
            .entry(exclusion.reason.kind())
            .or_insert(0) += 1;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("Excluded"),
        header_cell("Reasons"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (stage, count) in report.count_by_stage() {
        let detail = reasons
            .get(&stage)
            .map(|kinds| {
                kinds
                    .iter()
                    .map(|(kind, n)| format!("{kind} ({n})"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(stage),
            count_cell(count, Color::Yellow),
            dim_cell(detail),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        count_cell(report.len(), Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!();
    println!("Exclusions:");
    println!("{table}");
}

fn stat_cell(value: Option<f64>) -> Cell {
    match value {
        Some(value) => Cell::new(format!("{value:.4}")),
        None => dim_cell("-"),
    }
}

fn p_cell(value: Option<f64>) -> Cell {
    match value {
        Some(value) if value < ALPHA => Cell::new(format!("{value:.4}"))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        other => stat_cell(other),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color)
    } else {
        dim_cell(count)
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
