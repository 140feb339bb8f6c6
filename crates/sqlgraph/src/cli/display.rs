//! Common display utilities for CLI commands.

use std::collections::BTreeSet;

use colored::Colorize;
use sqlgraph::resolver::{NameDefaults, resolve_reference};
use sqlgraph::{AnalysisConfig, CanonicalKey, DependencyGraph, Diagnostic};

const MAX_DISPLAY_ITEMS: usize = 10;

/// Display a list of objects with optional truncation.
///
/// Shows up to `MAX_DISPLAY_ITEMS` keys with bullet points. If there are more,
/// shows "... and N more". If empty, shows the provided `empty_message`.
pub fn print_keys<'a>(keys: impl ExactSizeIterator<Item = &'a CanonicalKey>, empty_message: &str) {
    let total = keys.len();
    if total == 0 {
        println!("    {}", empty_message.dimmed());
        return;
    }

    for key in keys.take(MAX_DISPLAY_ITEMS) {
        println!("    {} {key}", "•".dimmed());
    }

    if total > MAX_DISPLAY_ITEMS {
        println!(
            "    {} ... and {} more",
            "•".dimmed(),
            total - MAX_DISPLAY_ITEMS
        );
    }
}

/// Display diagnostics under a heading, truncated like [`print_keys`].
pub fn print_diagnostics(heading: &str, diagnostics: &[&Diagnostic]) {
    println!(
        "  {} ({}):",
        heading.white().bold(),
        diagnostics.len().to_string().yellow()
    );
    if diagnostics.is_empty() {
        println!("    {}", "(none)".dimmed());
        return;
    }

    for diagnostic in diagnostics.iter().take(MAX_DISPLAY_ITEMS) {
        println!(
            "    {} {} {}: {}",
            "•".dimmed(),
            format!("[{}]", diagnostic.kind).dimmed(),
            diagnostic.object,
            diagnostic.message
        );
    }

    if diagnostics.len() > MAX_DISPLAY_ITEMS {
        println!(
            "    {} ... and {} more",
            "•".dimmed(),
            diagnostics.len() - MAX_DISPLAY_ITEMS
        );
    }
}

/// Find the graph node a user-typed name refers to.
///
/// The name is first qualified with the configured defaults. If that misses
/// and the name has no catalog part, every catalog in the graph is tried; a
/// single match is accepted.
pub fn find_object(
    graph: &DependencyGraph,
    text: &str,
    config: &AnalysisConfig,
) -> Result<CanonicalKey, sqlgraph::Error> {
    let name = tsql_syntax::parse_object_name(text)
        .ok_or_else(|| sqlgraph::Error::InvalidObject(format!("'{text}' is not an object name")))?;

    let defaults = NameDefaults::new(&config.default_catalog, &config.default_schema);
    let key = resolve_reference(&name, defaults);
    if graph.node(&key).is_some() {
        return Ok(key);
    }
    if name.catalog_name().is_some() {
        return Err(not_found(text));
    }

    let catalogs: BTreeSet<&str> = graph.nodes().map(|(_, node)| node.catalog.as_str()).collect();
    let matches: Vec<CanonicalKey> = catalogs
        .into_iter()
        .map(|catalog| {
            resolve_reference(&name, NameDefaults::new(catalog, &config.default_schema))
        })
        .filter(|candidate| graph.node(candidate).is_some())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    match matches.as_slice() {
        [] => Err(not_found(text)),
        [only] => Ok(only.clone()),
        several => {
            let listed: Vec<String> = several.iter().map(ToString::to_string).collect();
            Err(sqlgraph::Error::InvalidObject(format!(
                "'{text}' is ambiguous ({}); qualify it with a catalog",
                listed.join(", ")
            )))
        }
    }
}

fn not_found(text: &str) -> sqlgraph::Error {
    sqlgraph::Error::InvalidObject(format!("'{text}' is not in the graph"))
}
