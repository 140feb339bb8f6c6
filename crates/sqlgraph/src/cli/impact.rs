//! `sqlgraph impact` command implementation.

use std::path::Path;

use colored::Colorize;
use sqlgraph::Impact;

use super::display::{find_object, print_keys};
use super::session::{build_graph, load_config};

/// Run the impact command.
pub fn run(
    input: &Path,
    config: Option<&Path>,
    object: &str,
    depth: Option<usize>,
) -> Result<(), sqlgraph::Error> {
    let config = load_config(config)?;
    let build = build_graph(input, &config, false)?;

    let key = find_object(&build.graph, object, &config)?;
    let impact = build.graph.impact(&key, depth).ok_or_else(|| {
        sqlgraph::Error::InvalidObject(format!("'{object}' is not in the graph"))
    })?;

    println!("Impact analysis for {}:", impact.target.as_str().cyan().bold());
    print_impact_analysis(&impact);

    Ok(())
}

/// Display impact analysis results.
fn print_impact_analysis(impact: &Impact) {
    println!();

    println!(
        "  {} ({} objects):",
        "Direct dependents".white().bold(),
        impact.direct.len().to_string().green()
    );
    print_keys(impact.direct.iter().map(|entry| &entry.key), "(none)");

    println!();

    println!(
        "  {} ({} objects):",
        "Transitive dependents".white().bold(),
        impact.transitive.len().to_string().yellow()
    );
    print_keys(
        impact.transitive.iter().map(|entry| &entry.key),
        "(none beyond direct)",
    );
}
