//! Catalog-partitioned parallel builds.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      build_parallel                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Phase 1 (Parallel):   rayon worker per catalog partition    │
//! │                        own Traversal, own graph, own sink    │
//! │  Phase 2 (Sequential): merge partial graphs in name order    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every worker's graph is seeded from the whole object catalog, so a
//! reference from one catalog into another resolves exactly as it does in a
//! sequential build. Each object is walked by exactly one worker. Because
//! [`DependencyGraph::merge`] is a commutative, idempotent union, the merged
//! graph equals the sequential one.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::debug;

use crate::catalog::ObjectCatalog;
use crate::config::AnalysisConfig;
use crate::diagnostics::Diagnostic;
use crate::engine::{Traversal, TraversalCounters};
use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::parser::SqlParser;
use crate::resolver::CanonicalKey;

/// One worker's output.
#[derive(Debug, Default)]
pub(crate) struct PartialBuild {
    pub graph: DependencyGraph,
    pub diagnostics: Vec<Diagnostic>,
    pub counters: TraversalCounters,
}

/// Group object keys by case-folded catalog name, keeping input order
/// within each group.
pub(crate) fn partition_by_catalog(catalog: &ObjectCatalog) -> Vec<(String, Vec<CanonicalKey>)> {
    let mut partitions: BTreeMap<String, Vec<CanonicalKey>> = BTreeMap::new();
    for (key, object) in catalog.iter() {
        partitions
            .entry(object.catalog.to_lowercase())
            .or_default()
            .push(key.clone());
    }
    partitions.into_iter().collect()
}

/// Walk every partition on the rayon pool.
///
/// Results come back in partition name order.
pub(crate) fn build_partitions(
    catalog: &ObjectCatalog,
    config: &AnalysisConfig,
    parser: &dyn SqlParser,
) -> Result<Vec<PartialBuild>> {
    partition_by_catalog(catalog)
        .into_par_iter()
        .map(|(name, keys)| {
            debug!(catalog = %name, objects = keys.len(), "Analyzing catalog partition");
            let mut traversal = Traversal::new(catalog, config, parser);
            for key in &keys {
                traversal.analyze_object(key)?;
            }
            let (graph, diagnostics, counters) = traversal.into_parts();
            Ok(PartialBuild {
                graph,
                diagnostics,
                counters,
            })
        })
        .collect()
}

/// Union partial builds into one.
pub(crate) fn merge_partials(partials: Vec<PartialBuild>) -> PartialBuild {
    partials
        .into_iter()
        .fold(PartialBuild::default(), |mut merged, partial| {
            merged.graph.merge(partial.graph);
            merged.diagnostics.extend(partial.diagnostics);
            merged.counters.objects_traversed += partial.counters.objects_traversed;
            merged.counters.parse_failures += partial.counters.parse_failures;
            merged.counters.dynamic_sql_fragments += partial.counters.dynamic_sql_fragments;
            merged
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlObject;
    use tsql_syntax::TsqlParser;

    fn catalog(objects: Vec<SqlObject>) -> ObjectCatalog {
        let mut sink: Vec<Diagnostic> = Vec::new();
        ObjectCatalog::build(objects, &mut sink).expect("valid objects")
    }

    #[test]
    fn partitions_group_catalogs_case_insensitively() {
        let catalog = catalog(vec![
            SqlObject::table("Sales", "dbo", "b"),
            SqlObject::table("Hr", "dbo", "a"),
            SqlObject::table("SALES", "dbo", "a"),
        ]);
        let partitions = partition_by_catalog(&catalog);
        let shape: Vec<_> = partitions
            .iter()
            .map(|(name, keys)| (name.as_str(), keys.len()))
            .collect();
        assert_eq!(shape, [("hr", 1), ("sales", 2)]);
        assert_eq!(partitions[1].1[0], CanonicalKey::new("Sales", "dbo", "b"));
    }

    #[test]
    fn cross_catalog_edges_survive_partitioning() {
        let catalog = catalog(vec![
            SqlObject::table("CFLIVE", "dbo", "oas_grplist"),
            SqlObject::procedure(
                "Nova",
                "B2B2",
                "TestProc",
                "SELECT * FROM [CFLIVE].[dbo].[oas_grplist]",
            ),
        ]);
        let config = AnalysisConfig::default();
        let partials = build_partitions(&catalog, &config, &TsqlParser).expect("build");
        assert_eq!(partials.len(), 2);

        let merged = merge_partials(partials);
        assert!(merged.graph.contains_edge(
            &CanonicalKey::new("CFLIVE", "dbo", "oas_grplist"),
            &CanonicalKey::new("Nova", "B2B2", "TestProc"),
        ));
        assert_eq!(merged.counters.objects_traversed, 1);
        assert_eq!(merged.graph.len(), 2);
    }
}
