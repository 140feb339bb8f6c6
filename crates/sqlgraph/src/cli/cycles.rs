//! `sqlgraph cycles` command implementation.

use std::path::Path;

use colored::Colorize;
use sqlgraph::{CanonicalKey, Cycle, DependencyGraph, EdgeKind};

use super::session::{build_graph, load_config};

/// Run the cycles command.
pub fn run(input: &Path, config: Option<&Path>) -> Result<(), sqlgraph::Error> {
    let config = load_config(config)?;
    let build = build_graph(input, &config, false)?;

    let cycles = build.graph.find_cycles();

    if cycles.is_empty() {
        println!("{}", "No circular dependencies detected.".green());
        return Ok(());
    }

    println!(
        "Found {} circular dependencies:",
        cycles.len().to_string().red().bold()
    );
    println!();

    for (i, cycle) in cycles.iter().enumerate() {
        let edges = cycle_edges(&build.graph, cycle);
        let label = if edges.iter().all(|(_, _, kind)| *kind == EdgeKind::Call) {
            "recursive calls"
        } else {
            "data loop"
        };
        println!(
            "  {} {} ({label}, {} objects):",
            "Cycle".yellow().bold(),
            i + 1,
            cycle.members.len()
        );

        for (from, to, kind) in edges {
            println!("    {}", describe_edge(from, to, kind).dimmed());
        }
    }

    Ok(())
}

/// Every edge between two members of `cycle`, one entry per edge kind.
fn cycle_edges<'a>(
    graph: &'a DependencyGraph,
    cycle: &'a Cycle,
) -> Vec<(&'a CanonicalKey, &'a CanonicalKey, EdgeKind)> {
    cycle
        .members
        .iter()
        .filter_map(|from| graph.node(from).map(|node| (from, node)))
        .flat_map(move |(from, node)| {
            node.out_nodes
                .iter()
                .filter(move |to| cycle.members.binary_search(*to).is_ok())
                .flat_map(move |to| node.edge_kinds_to(to).map(move |kind| (from, to, kind)))
        })
        .collect()
}

/// Phrase an edge with the routine as subject.
fn describe_edge(from: &CanonicalKey, to: &CanonicalKey, kind: EdgeKind) -> String {
    match kind {
        // data flows from the table to its reader
        EdgeKind::DataFlow => format!("{to} reads {from}"),
        EdgeKind::Write | EdgeKind::Call => format!("{from} {kind} {to}"),
    }
}
