//! Loading configuration and input shared by every command.

use std::path::Path;

use colored::Colorize;
use sqlgraph::input::load_objects;
use sqlgraph::{AnalysisConfig, GraphBuild, GraphBuilder};

/// Load the configuration file, or the defaults if none was given.
pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, sqlgraph::Error> {
    path.map_or_else(|| Ok(AnalysisConfig::default()), AnalysisConfig::load)
}

/// Read `input` and build its graph.
///
/// Skipped input lines are reported on stderr; they do not fail the command.
pub fn build_graph(
    input: &Path,
    config: &AnalysisConfig,
    parallel: bool,
) -> Result<GraphBuild, sqlgraph::Error> {
    let loaded = load_objects(input, config)?;
    for warning in &loaded.warnings {
        eprintln!("{}: {warning}", "warning".yellow());
    }

    let builder = GraphBuilder::new(config.clone());
    if parallel {
        builder.build_parallel(loaded.objects)
    } else {
        builder.build(loaded.objects)
    }
}
