//! # Sqlgraph: Dependency Graphs for SQL Server Code
//!
//! Sqlgraph reads the definitions of tables, views, functions and stored
//! procedures and builds a directed graph of who reads from, writes to and
//! calls whom. Names in the SQL text are resolved against the set of known
//! objects, so an unqualified `Orders` inside `[Sales].[dbo].[Report]`
//! becomes `[Sales].[dbo].[Orders]`.
//!
//! ## Design Philosophy
//!
//! - **Graph, not analyzer** - Records dependencies; no type checking or permissions
//! - **Always a graph** - Bad SQL becomes a diagnostic, never a failed run
//! - **Merge-safe** - Partial graphs union into the same result in any order
//! - **Library first** - The CLI is a thin layer over [`GraphBuilder`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use sqlgraph::{AnalysisConfig, GraphBuilder, SqlObject};
//!
//! let objects = vec![
//!     SqlObject::table("Sales", "dbo", "Orders"),
//!     SqlObject::procedure("Sales", "dbo", "Report", "SELECT * FROM Orders"),
//! ];
//!
//! let build = GraphBuilder::new(AnalysisConfig::default()).build(objects)?;
//! println!(
//!     "{} objects, {} edges, {} diagnostics",
//!     build.stats.objects_seeded,
//!     build.stats.edges_recorded,
//!     build.diagnostics.len()
//! );
//! println!("{}", serde_json::to_string_pretty(&build.graph)?);
//! # Ok::<(), sqlgraph::Error>(())
//! ```

pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod graph;
pub mod input;
pub mod parser;
pub mod resolver;

mod error;
mod parallel;
mod types;

pub use catalog::ObjectCatalog;
pub use config::AnalysisConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
pub use engine::Traversal;
pub use error::{Error, Result};
pub use graph::{DependencyGraph, GraphNode};
pub use parser::SqlParser;
pub use resolver::CanonicalKey;
pub use tsql_syntax::TsqlParser;
pub use types::{
    BuildStats, Cycle, EdgeKind, Impact, ImpactEntry, ObjectKind, ObjectRecord, RoutineUsage,
    SqlObject, TableUsage,
};

use std::time::Instant;

use tracing::{info, warn};

use engine::TraversalCounters;

/// The result of one build: the graph plus everything noticed on the way.
#[derive(Debug, Clone)]
pub struct GraphBuild {
    /// The dependency graph
    pub graph: DependencyGraph,
    /// Recoverable problems, in the order they were found
    pub diagnostics: Vec<Diagnostic>,
    /// Counts and timing
    pub stats: BuildStats,
}

/// Builds dependency graphs from object definitions.
///
/// Every build starts from scratch: the objects are cataloged, a node is
/// seeded for each one, and each definition is parsed and walked once.
#[derive(Debug, Clone)]
pub struct GraphBuilder<P: SqlParser = TsqlParser> {
    config: AnalysisConfig,
    parser: P,
}

impl GraphBuilder {
    /// Create a builder that parses with [`TsqlParser`].
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_parser(config, TsqlParser)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl<P: SqlParser> GraphBuilder<P> {
    /// Create a builder with a custom parser.
    #[must_use]
    pub fn with_parser(config: AnalysisConfig, parser: P) -> Self {
        Self { config, parser }
    }

    /// The configuration this builder resolves names with.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Build the graph on the current thread, walking objects in input order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid and
    /// `Error::InvalidObject` if an object has an empty name, schema or
    /// catalog. Problems in the SQL itself never fail the build.
    pub fn build<I>(&self, objects: I) -> Result<GraphBuild>
    where
        I: IntoIterator<Item = SqlObject>,
    {
        self.config.validate()?;
        let started = Instant::now();
        let mut diagnostics = Vec::new();
        let catalog = ObjectCatalog::build(objects, &mut diagnostics)?;
        info!(objects = catalog.len(), "Building dependency graph");

        let mut traversal = Traversal::with_sink(&catalog, &self.config, &self.parser, diagnostics);
        traversal.analyze_all()?;
        let (graph, diagnostics, counters) = traversal.into_parts();

        Ok(finish(&catalog, graph, diagnostics, counters, started))
    }

    /// Build the graph with one rayon worker per catalog.
    ///
    /// The graph equals the one [`Self::build`] produces. Diagnostics are
    /// grouped by catalog, in catalog name order.
    ///
    /// # Errors
    ///
    /// Same as [`Self::build`].
    pub fn build_parallel<I>(&self, objects: I) -> Result<GraphBuild>
    where
        I: IntoIterator<Item = SqlObject>,
    {
        self.config.validate()?;
        let started = Instant::now();
        let mut diagnostics = Vec::new();
        let catalog = ObjectCatalog::build(objects, &mut diagnostics)?;
        info!(
            objects = catalog.len(),
            catalogs = catalog.catalog_names().len(),
            "Building dependency graph in parallel"
        );

        let partials = parallel::build_partitions(&catalog, &self.config, &self.parser)?;
        let merged = parallel::merge_partials(partials);
        diagnostics.extend(merged.diagnostics);

        let mut graph = DependencyGraph::from_catalog(&catalog);
        graph.merge(merged.graph);

        Ok(finish(&catalog, graph, diagnostics, merged.counters, started))
    }
}

fn finish(
    catalog: &ObjectCatalog,
    graph: DependencyGraph,
    diagnostics: Vec<Diagnostic>,
    counters: TraversalCounters,
    started: Instant,
) -> GraphBuild {
    let stats = BuildStats {
        objects_seeded: catalog.len(),
        objects_traversed: counters.objects_traversed,
        parse_failures: counters.parse_failures,
        edges_recorded: graph.edge_count(),
        dynamic_sql_fragments: counters.dynamic_sql_fragments,
        duration: started.elapsed(),
    };
    info!(
        nodes = graph.len(),
        edges = stats.edges_recorded,
        parse_failures = stats.parse_failures,
        diagnostics = diagnostics.len(),
        duration_ms = stats.duration.as_millis(),
        "Dependency graph built"
    );
    GraphBuild {
        graph,
        diagnostics,
        stats,
    }
}

/// Build a graph with the default configuration and parser.
///
/// Only the graph is returned. Diagnostics and statistics are dropped, with
/// a single `warn` event giving the diagnostic count. Callers that need to
/// know which objects failed to parse or which references did not resolve
/// should call [`GraphBuilder::build`] and read [`GraphBuild::diagnostics`]:
///
/// ```
/// use sqlgraph::{GraphBuilder, SqlObject, build_graph};
///
/// let objects = vec![SqlObject::procedure("Sales", "dbo", "Broken", "SELECT (1")];
/// let graph = build_graph(objects.clone())?;
/// let build = GraphBuilder::default().build(objects)?;
/// assert_eq!(graph, build.graph);
/// assert_eq!(build.diagnostics.len(), 1);
/// # Ok::<(), sqlgraph::Error>(())
/// ```
///
/// # Errors
///
/// Returns `Error::InvalidObject` if an object has an empty name, schema or
/// catalog.
pub fn build_graph(objects: Vec<SqlObject>) -> Result<DependencyGraph> {
    let build = GraphBuilder::default().build(objects)?;
    if !build.diagnostics.is_empty() {
        warn!(
            diagnostics = build.diagnostics.len(),
            parse_failures = build.stats.parse_failures,
            "build_graph dropped diagnostics; use GraphBuilder::build to read them"
        );
    }
    Ok(build.graph)
}
