//! `sqlgraph build` command implementation.

use std::path::Path;

use clap::ValueEnum;
use colored::Colorize;
use sqlgraph::{Diagnostic, GraphBuild};

use super::display::print_diagnostics;
use super::session::{build_graph, load_config};

/// How `build` prints the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON object keyed by canonical object name
    Json,
    /// Counts and diagnostics
    Summary,
    /// Graphviz DOT
    Dot,
}

/// Run the build command.
pub fn run(
    input: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    parallel: bool,
) -> Result<(), sqlgraph::Error> {
    let config = load_config(config)?;
    let build = build_graph(input, &config, parallel)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&build.graph)?);
            note_diagnostics(&build.diagnostics);
        }
        OutputFormat::Dot => {
            print!("{}", build.graph.to_dot());
            note_diagnostics(&build.diagnostics);
        }
        OutputFormat::Summary => print_summary(&build),
    }

    Ok(())
}

/// Point at `--format summary` without mixing diagnostics into the graph output.
fn note_diagnostics(diagnostics: &[Diagnostic]) {
    if !diagnostics.is_empty() {
        eprintln!(
            "{}: {} diagnostics (use --format summary to list them)",
            "warning".yellow(),
            diagnostics.len()
        );
    }
}

fn print_summary(build: &GraphBuild) {
    let stats = &build.stats;
    println!("{}", "Dependency graph built".green().bold());
    println!();
    println!("  Objects:            {}", stats.objects_seeded);
    println!("  Definitions walked: {}", stats.objects_traversed);
    println!(
        "  Parse failures:     {}",
        if stats.parse_failures == 0 {
            stats.parse_failures.to_string().green()
        } else {
            stats.parse_failures.to_string().red()
        }
    );
    println!("  Edges:              {}", stats.edges_recorded);
    println!("  Dynamic SQL walked: {}", stats.dynamic_sql_fragments);
    println!("  Duration:           {:.2?}", stats.duration);
    println!();

    let (input_errors, limitations): (Vec<&Diagnostic>, Vec<&Diagnostic>) = build
        .diagnostics
        .iter()
        .partition(|diagnostic| diagnostic.kind.is_input_error());
    print_diagnostics("Input problems", &input_errors);
    println!();
    print_diagnostics("Not modeled", &limitations);
}
