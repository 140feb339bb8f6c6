//! `sqlgraph usage` command implementation.

use std::path::Path;

use colored::Colorize;
use sqlgraph::{CanonicalKey, DependencyGraph, ObjectKind};

use super::display::{find_object, print_keys};
use super::session::{build_graph, load_config};

/// Run the usage command.
pub fn run(input: &Path, config: Option<&Path>, object: &str) -> Result<(), sqlgraph::Error> {
    let config = load_config(config)?;
    let build = build_graph(input, &config, false)?;

    let key = find_object(&build.graph, object, &config)?;
    let Some(node) = build.graph.node(&key) else {
        return Err(sqlgraph::Error::InvalidObject(format!(
            "'{object}' is not in the graph"
        )));
    };

    println!("Usage of {} {}:", node.kind, key.as_str().cyan().bold());
    if node.kind == ObjectKind::Table {
        print_table_usage(&build.graph, &key);
    } else {
        print_routine_usage(&build.graph, &key);
    }

    Ok(())
}

fn print_table_usage(graph: &DependencyGraph, key: &CanonicalKey) {
    let Some(usage) = graph.table_usage(key) else {
        return;
    };
    print_section("Read by", &usage.readers);
    print_section("Written by", &usage.writers);
}

fn print_routine_usage(graph: &DependencyGraph, key: &CanonicalKey) {
    let Some(usage) = graph.routine_usage(key) else {
        return;
    };
    print_section("Reads", &usage.reads);
    print_section("Writes", &usage.writes);
    print_section("Calls", &usage.calls);
    print_section("Called by", &usage.called_by);
    print_section("Read by", &usage.read_by);
}

fn print_section(heading: &str, keys: &[CanonicalKey]) {
    println!();
    println!(
        "  {} ({}):",
        heading.white().bold(),
        keys.len().to_string().green()
    );
    print_keys(keys.iter(), "(none)");
}
