//! The traversal engine.
//!
//! A [`Traversal`] owns the graph being built and walks one object's syntax
//! tree at a time. Each walk starts from [`Traversal::set_current_object`] and
//! threads an [`ObjectScope`] (the current object's key, catalog, schema,
//! visible CTE names and dynamic SQL depth) through every visit function as
//! an argument. The only state shared between visits is the graph, the
//! diagnostic sink and the [`DmlTargetTracker`].
//!
//! Dispatch is a `match` over the syntax tree enums:
//!
//! | Syntax | Effect |
//! |--------|--------|
//! | Table or view in FROM/JOIN | data-flow edge to the current object, unless it is the enclosing write target |
//! | Function call or table-valued function | data-flow edge from the function |
//! | INSERT/UPDATE/DELETE/MERGE/TRUNCATE/BULK INSERT, SELECT INTO, OUTPUT INTO | write edge from the current object |
//! | EXEC of a procedure or function | call edge from the current object |
//! | EXEC(string), `sp_executesql` | the string is parsed and walked in the same scope |
//! | EXEC(string) AT server | skipped with a diagnostic |
//! | anything else | children are walked |
//!
//! Nothing in the SQL text can make a walk fail. Unknown names, writes to
//! non-tables and unusable dynamic SQL become diagnostics and the walk moves
//! on.

mod dml;
mod dynamic;

pub use dml::DmlTargetTracker;

use tracing::{debug, trace, warn};
use tsql_syntax::{
    Cte, Execute, Expr, ObjectName, ParseError, Query, QueryBody, Script, Select, Statement,
    TableFactor, TableWithJoins,
};

use crate::catalog::ObjectCatalog;
use crate::config::AnalysisConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{Error, Result};
use crate::graph::{DependencyGraph, EdgeOutcome};
use crate::parser::SqlParser;
use crate::resolver::{CanonicalKey, NameDefaults, key_for_object, resolve_reference};
use crate::types::{ObjectKind, SqlObject};

/// Context for walking one object's SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectScope {
    key: CanonicalKey,
    catalog: String,
    schema: String,
    ctes: Vec<String>,
    dynamic_depth: usize,
}

impl ObjectScope {
    fn for_object(object: &SqlObject) -> Self {
        Self {
            key: key_for_object(object),
            catalog: object.catalog.clone(),
            schema: object.schema.clone(),
            ctes: Vec::new(),
            dynamic_depth: 0,
        }
    }

    /// Key of the object edges are attributed to.
    #[must_use]
    pub fn key(&self) -> &CanonicalKey {
        &self.key
    }

    /// How many dynamic SQL strings enclose the current position.
    #[must_use]
    pub fn dynamic_depth(&self) -> usize {
        self.dynamic_depth
    }

    fn defaults(&self) -> NameDefaults<'_> {
        NameDefaults::new(&self.catalog, &self.schema)
    }

    fn with_ctes(&self, ctes: &[Cte]) -> Self {
        let mut scope = self.clone();
        scope.ctes.extend(ctes.iter().map(|cte| cte.name.to_lowercase()));
        scope
    }

    fn is_cte(&self, name: &ObjectName) -> bool {
        name.is_unqualified()
            && name
                .base_name()
                .is_some_and(|base| self.ctes.contains(&base.to_lowercase()))
    }
}

/// Counts kept while walking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalCounters {
    /// Objects whose definition was walked
    pub objects_traversed: usize,
    /// Objects whose definition did not parse
    pub parse_failures: usize,
    /// Dynamic SQL strings parsed and walked
    pub dynamic_sql_fragments: usize,
}

/// Builds a dependency graph by walking object definitions.
///
/// The graph is seeded with a node for every cataloged object when the
/// traversal is created, so an object that fails to parse still appears.
pub struct Traversal<'a, S: DiagnosticSink = Vec<Diagnostic>> {
    catalog: &'a ObjectCatalog,
    config: &'a AnalysisConfig,
    parser: &'a dyn SqlParser,
    graph: DependencyGraph,
    sink: S,
    current: Option<ObjectScope>,
    targets: DmlTargetTracker,
    counters: TraversalCounters,
}

impl<'a> Traversal<'a> {
    /// Create a traversal that collects diagnostics in a `Vec`.
    #[must_use]
    pub fn new(
        catalog: &'a ObjectCatalog,
        config: &'a AnalysisConfig,
        parser: &'a dyn SqlParser,
    ) -> Self {
        Self::with_sink(catalog, config, parser, Vec::new())
    }
}

impl<'a, S: DiagnosticSink> Traversal<'a, S> {
    /// Create a traversal that reports diagnostics to `sink`.
    pub fn with_sink(
        catalog: &'a ObjectCatalog,
        config: &'a AnalysisConfig,
        parser: &'a dyn SqlParser,
        sink: S,
    ) -> Self {
        Self {
            catalog,
            config,
            parser,
            graph: DependencyGraph::from_catalog(catalog),
            sink,
            current: None,
            targets: DmlTargetTracker::default(),
            counters: TraversalCounters::default(),
        }
    }

    /// Make `object` the object that subsequent edges are attributed to.
    pub fn set_current_object(&mut self, object: &SqlObject) {
        self.current = Some(ObjectScope::for_object(object));
    }

    /// Key of the current object, if one is set.
    #[must_use]
    pub fn current_object(&self) -> Option<&CanonicalKey> {
        self.current.as_ref().map(ObjectScope::key)
    }

    /// Walk `script` as the body of the current object.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoCurrentObject` if [`Self::set_current_object`] has
    /// not been called.
    pub fn traverse(&mut self, script: &Script) -> Result<()> {
        let scope = self.current.clone().ok_or(Error::NoCurrentObject)?;
        self.visit_statements(&script.statements, &scope);
        debug_assert_eq!(self.targets.depth(), 0, "unbalanced DML target context");
        Ok(())
    }

    /// Parse and walk the definition of the cataloged object `key`.
    ///
    /// Tables have no definition and are only made current. A definition
    /// that is empty or does not parse is reported and contributes no edges.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidObject` if `key` is not in the catalog.
    pub fn analyze_object(&mut self, key: &CanonicalKey) -> Result<()> {
        let catalog = self.catalog;
        let object = catalog
            .get(key)
            .ok_or_else(|| Error::InvalidObject(format!("{key} is not in the catalog")))?;
        self.set_current_object(object);
        if !object.kind.has_body() {
            return Ok(());
        }

        if object.definition.trim().is_empty() {
            self.counters.parse_failures += 1;
            self.report(
                DiagnosticKind::ParseFailed,
                key,
                format!("{} has no definition", object.kind),
            );
            return Ok(());
        }

        trace!(object = %key, kind = %object.kind, "Parsing definition");
        let output = self.parser.parse(&object.definition);
        if !output.is_clean() {
            self.counters.parse_failures += 1;
            self.report(DiagnosticKind::ParseFailed, key, describe_errors(&output.errors));
            return Ok(());
        }

        self.traverse(&output.script)?;
        self.counters.objects_traversed += 1;
        Ok(())
    }

    /// Analyze every cataloged object in input order.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::analyze_object`].
    pub fn analyze_all(&mut self) -> Result<()> {
        let catalog = self.catalog;
        for (key, _) in catalog.iter() {
            self.analyze_object(key)?;
        }
        Ok(())
    }

    /// The graph built so far.
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Counts so far.
    #[must_use]
    pub fn counters(&self) -> TraversalCounters {
        self.counters
    }

    /// Finish, returning the graph, the sink and the counts.
    pub fn into_parts(self) -> (DependencyGraph, S, TraversalCounters) {
        (self.graph, self.sink, self.counters)
    }

    // === Diagnostics and edges ===

    fn report(&mut self, kind: DiagnosticKind, object: &CanonicalKey, message: impl Into<String>) {
        let message = message.into();
        match kind {
            DiagnosticKind::ParseFailed
            | DiagnosticKind::DuplicateObject
            | DiagnosticKind::RecursionLimit => {
                warn!(object = %object, %kind, "{message}");
            }
            _ => debug!(object = %object, %kind, "{message}"),
        }
        self.sink
            .report(Diagnostic::new(kind, object.as_str(), message));
    }

    fn record_outcome(&mut self, outcome: EdgeOutcome, scope: &ObjectScope) {
        match outcome {
            EdgeOutcome::Added | EdgeOutcome::AlreadyPresent | EdgeOutcome::SelfLoop => {}
            EdgeOutcome::MissingEndpoint(missing) => self.report(
                DiagnosticKind::MissingEndpoint,
                &scope.key,
                format!("edge dropped: {missing} has no node"),
            ),
            EdgeOutcome::NotATable(kind) => self.report(
                DiagnosticKind::NonTableWriteTarget,
                &scope.key,
                format!("write edge dropped: target is a {kind}"),
            ),
        }
    }

    fn record_data_flow(&mut self, source: &CanonicalKey, scope: &ObjectScope) {
        let outcome = self.graph.add_data_flow_edge(source, &scope.key);
        self.record_outcome(outcome, scope);
    }

    fn record_call(&mut self, callee: &CanonicalKey, scope: &ObjectScope) {
        let outcome = self.graph.add_call_edge(&scope.key, callee);
        self.record_outcome(outcome, scope);
    }

    // === Name resolution ===

    /// Find the cataloged object `name` denotes, without reporting misses.
    ///
    /// An unqualified name that misses under the current schema is retried
    /// under the configured default schema when fallback is enabled.
    fn lookup(&self, name: &ObjectName, scope: &ObjectScope) -> Option<(CanonicalKey, ObjectKind)> {
        if name.server_name().is_some() {
            return None;
        }
        let key = resolve_reference(name, scope.defaults());
        if key.is_invalid() {
            return None;
        }
        if let Some((cataloged, kind)) = self.catalog.resolve(&key) {
            return Some((cataloged.clone(), kind));
        }

        let default_schema = self.config.default_schema.as_str();
        if self.config.fallback_to_default_schema
            && name.schema_name().is_none()
            && !same_identifier(&scope.schema, default_schema)
        {
            let fallback = resolve_reference(name, NameDefaults::new(&scope.catalog, default_schema));
            if let Some((cataloged, kind)) = self.catalog.resolve(&fallback) {
                trace!(reference = %name, resolved = %cataloged, "Resolved through default schema");
                return Some((cataloged.clone(), kind));
            }
        }
        None
    }

    /// Find the cataloged object `name` denotes, reporting misses.
    ///
    /// Table variables, temporary tables and CTE names are never cataloged
    /// and are skipped without a diagnostic.
    fn resolve_or_report(
        &mut self,
        name: &ObjectName,
        scope: &ObjectScope,
    ) -> Option<(CanonicalKey, ObjectKind)> {
        if name.is_variable() || name.is_temporary() || scope.is_cte(name) {
            return None;
        }
        if let Some(resolved) = self.lookup(name, scope) {
            return Some(resolved);
        }

        let message = if name.server_name().is_some() {
            format!("{name} is on a linked server outside the analyzed catalogs")
        } else if resolve_reference(name, scope.defaults()).is_invalid() {
            format!("reference '{name}' has no object name")
        } else {
            format!("{name} matches no cataloged object")
        };
        self.report(DiagnosticKind::UnresolvedReference, &scope.key, message);
        None
    }

    /// Resolve a function name. Unqualified names that miss are taken to be
    /// built-ins (`COUNT`, `OPENJSON`) and are not reported.
    fn resolve_function(
        &mut self,
        name: &ObjectName,
        scope: &ObjectScope,
    ) -> Option<(CanonicalKey, ObjectKind)> {
        if name.is_unqualified() {
            self.lookup(name, scope)
        } else {
            self.resolve_or_report(name, scope)
        }
    }

    // === Statements ===

    fn visit_statements(&mut self, statements: &[Statement], scope: &ObjectScope) {
        for statement in statements {
            self.visit_statement(statement, scope);
        }
    }

    fn visit_statement(&mut self, statement: &Statement, scope: &ObjectScope) {
        match statement {
            Statement::Query(query) => self.visit_query(query, scope),
            Statement::Insert(insert) => self.visit_insert(insert, scope),
            Statement::Update(update) => self.visit_update(update, scope),
            Statement::Delete(delete) => self.visit_delete(delete, scope),
            Statement::Merge(merge) => self.visit_merge(merge, scope),
            Statement::Execute(execute) => self.visit_execute(execute, scope),
            Statement::Truncate(target) | Statement::BulkInsert(target) => {
                self.record_write_target(target, &[], scope);
            }
            Statement::WithCtes { ctes, statement } => {
                let inner = scope.with_ctes(ctes);
                for cte in ctes {
                    self.visit_query(&cte.query, &inner);
                }
                self.visit_statement(statement, &inner);
            }
            Statement::CreateRoutine(routine) => self.visit_statements(&routine.body, scope),
            Statement::Block(body) => self.visit_statements(body, scope),
            Statement::If {
                branches,
                else_branch,
            } => {
                for branch in branches {
                    self.visit_expr(&branch.condition, scope);
                    self.visit_statement(&branch.body, scope);
                }
                if let Some(else_branch) = else_branch {
                    self.visit_statement(else_branch, scope);
                }
            }
            Statement::While { condition, body } => {
                self.visit_expr(condition, scope);
                self.visit_statement(body, scope);
            }
            Statement::Declare(exprs) | Statement::Other { arguments: exprs, .. } => {
                self.visit_exprs(exprs, scope);
            }
            Statement::Set { value, .. } => self.visit_expr(value, scope),
            Statement::Return(value) => {
                if let Some(value) = value {
                    self.visit_expr(value, scope);
                }
            }
        }
    }

    fn visit_execute(&mut self, execute: &Execute, scope: &ObjectScope) {
        match execute {
            Execute::Procedure { name, args, .. } => {
                if dynamic::is_sp_executesql(name) {
                    let statement = args
                        .iter()
                        .find(|arg| {
                            arg.name
                                .as_deref()
                                .is_some_and(|n| same_identifier(n, "@stmt"))
                        })
                        .or_else(|| args.first());
                    match statement {
                        Some(arg) => self.visit_dynamic_sql(&arg.value, scope),
                        None => self.report(
                            DiagnosticKind::DynamicSqlSkipped,
                            &scope.key,
                            "sp_executesql called without a statement",
                        ),
                    }
                }
                self.visit_call(name, scope);
                for arg in args {
                    self.visit_expr(&arg.value, scope);
                }
            }
            Execute::Dynamic {
                linked_server: Some(server),
                ..
            } => self.report(
                DiagnosticKind::DynamicSqlSkipped,
                &scope.key,
                format!("dynamic SQL runs on linked server {server}, outside the analyzed catalogs"),
            ),
            Execute::Dynamic { sql, .. } => self.visit_dynamic_sql(sql, scope),
        }
    }

    fn visit_call(&mut self, name: &ObjectName, scope: &ObjectScope) {
        if name.is_variable() {
            debug!(object = %scope.key, procedure = %name, "EXEC target held in a variable");
            return;
        }
        let resolved = if is_system_procedure(name) {
            self.lookup(name, scope)
        } else {
            self.resolve_or_report(name, scope)
        };
        match resolved {
            Some((key, kind)) if kind.is_callable() => self.record_call(&key, scope),
            Some((key, kind)) => {
                debug!(object = %scope.key, target = %key, %kind, "EXEC target is not callable");
            }
            None => {}
        }
    }

    // === Queries ===

    fn visit_query(&mut self, query: &Query, scope: &ObjectScope) {
        let extended;
        let scope = if query.ctes.is_empty() {
            scope
        } else {
            extended = scope.with_ctes(&query.ctes);
            &extended
        };
        for cte in &query.ctes {
            self.visit_query(&cte.query, scope);
        }
        self.visit_query_body(&query.body, scope);
        self.visit_exprs(&query.order_by, scope);
    }

    fn visit_query_body(&mut self, body: &QueryBody, scope: &ObjectScope) {
        match body {
            QueryBody::Select(select) => self.visit_select(select, scope),
            QueryBody::Nested(query) => self.visit_query(query, scope),
            QueryBody::SetOperation { left, right, .. } => {
                self.visit_query_body(left, scope);
                self.visit_query_body(right, scope);
            }
            QueryBody::Values(rows) => {
                for row in rows {
                    self.visit_exprs(row, scope);
                }
            }
        }
    }

    fn visit_select(&mut self, select: &Select, scope: &ObjectScope) {
        if let Some(top) = &select.top {
            self.visit_expr(top, scope);
        }
        self.visit_exprs(&select.projection, scope);
        if let Some(into) = &select.into {
            self.record_write_target(into, &[], scope);
        }
        self.visit_from(&select.from, scope);
        if let Some(selection) = &select.selection {
            self.visit_expr(selection, scope);
        }
        self.visit_exprs(&select.group_by, scope);
        if let Some(having) = &select.having {
            self.visit_expr(having, scope);
        }
    }

    fn visit_from(&mut self, from: &[TableWithJoins], scope: &ObjectScope) {
        for table in from {
            self.visit_table_with_joins(table, scope);
        }
    }

    fn visit_table_with_joins(&mut self, table: &TableWithJoins, scope: &ObjectScope) {
        self.visit_table_factor(&table.relation, scope);
        for join in &table.joins {
            self.visit_table_factor(&join.relation, scope);
            if let Some(constraint) = &join.constraint {
                self.visit_expr(constraint, scope);
            }
        }
    }

    fn visit_table_factor(&mut self, factor: &TableFactor, scope: &ObjectScope) {
        match factor {
            TableFactor::Table { name, .. } => self.visit_table_reference(name, scope),
            TableFactor::Function { name, args, .. } => {
                self.visit_function_reference(name, scope);
                self.visit_exprs(args, scope);
            }
            TableFactor::Derived { subquery, .. } => self.visit_query(subquery, scope),
            TableFactor::NestedJoin { table, .. } => self.visit_table_with_joins(table, scope),
        }
    }

    fn visit_table_reference(&mut self, name: &ObjectName, scope: &ObjectScope) {
        let Some((key, kind)) = self.resolve_or_report(name, scope) else {
            return;
        };
        match kind {
            ObjectKind::Table | ObjectKind::View if self.targets.is_current(&key) => {
                trace!(object = %scope.key, table = %key, "Reference is the statement's write target");
            }
            ObjectKind::Table | ObjectKind::View | ObjectKind::Function => {
                self.record_data_flow(&key, scope);
            }
            ObjectKind::Procedure => {
                debug!(object = %scope.key, procedure = %key, "Procedure named as a table source");
            }
        }
    }

    fn visit_function_reference(&mut self, name: &ObjectName, scope: &ObjectScope) {
        match self.resolve_function(name, scope) {
            Some((key, ObjectKind::Function)) => self.record_data_flow(&key, scope),
            Some((key, kind)) => {
                trace!(object = %scope.key, target = %key, %kind, "Call syntax names a non-function");
            }
            None => {}
        }
    }

    // === Expressions ===

    fn visit_exprs(&mut self, exprs: &[Expr], scope: &ObjectScope) {
        for expr in exprs {
            self.visit_expr(expr, scope);
        }
    }

    fn visit_expr(&mut self, expr: &Expr, scope: &ObjectScope) {
        match expr {
            Expr::Function { name, args } => {
                self.visit_function_reference(name, scope);
                self.visit_exprs(args, scope);
            }
            Expr::Subquery(query) | Expr::Exists(query) => self.visit_query(query, scope),
            Expr::Binary { left, right, .. } => {
                self.visit_expr(left, scope);
                self.visit_expr(right, scope);
            }
            Expr::Unary { expr, .. } | Expr::Cast { expr, .. } => self.visit_expr(expr, scope),
            Expr::Nested(items) => self.visit_exprs(items, scope),
            Expr::Case {
                operand,
                branches,
                else_result,
            } => {
                if let Some(operand) = operand {
                    self.visit_expr(operand, scope);
                }
                for (condition, result) in branches {
                    self.visit_expr(condition, scope);
                    self.visit_expr(result, scope);
                }
                if let Some(else_result) = else_result {
                    self.visit_expr(else_result, scope);
                }
            }
            Expr::Identifier(_)
            | Expr::Variable(_)
            | Expr::Literal(_)
            | Expr::Wildcard
            | Expr::Keyword(_) => {}
        }
    }
}

/// Identifier equality under SQL Server's default case-insensitive collation.
fn same_identifier(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// `sp_` and `xp_` procedures ship with SQL Server and are rarely cataloged.
fn is_system_procedure(name: &ObjectName) -> bool {
    name.base_name().is_some_and(|base| {
        let base = base.to_lowercase();
        base.starts_with("sp_") || base.starts_with("xp_")
    })
}

fn describe_errors(errors: &[ParseError]) -> String {
    const SHOWN: usize = 3;
    let text = errors
        .iter()
        .take(SHOWN)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    match errors.len().checked_sub(SHOWN) {
        Some(more) if more > 0 => format!("{text} (and {more} more)"),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeKind;
    use tsql_syntax::TsqlParser;

    fn catalog(objects: Vec<SqlObject>) -> ObjectCatalog {
        let mut sink: Vec<Diagnostic> = Vec::new();
        ObjectCatalog::build(objects, &mut sink).expect("valid objects")
    }

    fn key(schema: &str, name: &str) -> CanonicalKey {
        CanonicalKey::new("Cat", schema, name)
    }

    #[test]
    fn traverse_without_current_object_fails() {
        let catalog = catalog(vec![]);
        let config = AnalysisConfig::default();
        let mut traversal = Traversal::new(&catalog, &config, &TsqlParser);
        let err = traversal.traverse(&Script::default()).unwrap_err();
        assert!(matches!(err, Error::NoCurrentObject));
    }

    #[test]
    fn set_current_object_attributes_edges() {
        let catalog = catalog(vec![
            SqlObject::table("Cat", "dbo", "Orders"),
            SqlObject::procedure("Cat", "dbo", "Report", ""),
        ]);
        let config = AnalysisConfig::default();
        let mut traversal = Traversal::new(&catalog, &config, &TsqlParser);
        let report = catalog.get(&key("dbo", "Report")).expect("cataloged").clone();

        traversal.set_current_object(&report);
        assert_eq!(traversal.current_object(), Some(&key("dbo", "Report")));
        let output = tsql_syntax::parse("SELECT * FROM Orders");
        traversal.traverse(&output.script).expect("current object set");

        assert!(traversal.graph().contains_edge_of_kind(
            &key("dbo", "Orders"),
            &key("dbo", "Report"),
            EdgeKind::DataFlow
        ));
    }

    #[test]
    fn unqualified_name_falls_back_to_default_schema() {
        let catalog = catalog(vec![
            SqlObject::table("Cat", "dbo", "Lookup"),
            SqlObject::procedure("Cat", "Sales", "p", "SELECT * FROM Lookup"),
        ]);
        let config = AnalysisConfig::default();
        let mut traversal = Traversal::new(&catalog, &config, &TsqlParser);
        traversal.analyze_object(&key("Sales", "p")).expect("cataloged");
        assert!(traversal.graph().contains_edge(&key("dbo", "Lookup"), &key("Sales", "p")));
    }

    #[test]
    fn fallback_can_be_disabled() {
        let catalog = catalog(vec![
            SqlObject::table("Cat", "dbo", "Lookup"),
            SqlObject::procedure("Cat", "Sales", "p", "SELECT * FROM Lookup"),
        ]);
        let config = AnalysisConfig {
            fallback_to_default_schema: false,
            ..AnalysisConfig::default()
        };
        let mut traversal = Traversal::new(&catalog, &config, &TsqlParser);
        traversal.analyze_object(&key("Sales", "p")).expect("cataloged");
        let (graph, diagnostics, _) = traversal.into_parts();
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnresolvedReference);
    }

    #[test]
    fn own_schema_wins_over_default_schema() {
        let catalog = catalog(vec![
            SqlObject::table("Cat", "dbo", "Lookup"),
            SqlObject::table("Cat", "Sales", "Lookup"),
            SqlObject::procedure("Cat", "Sales", "p", "SELECT * FROM Lookup"),
        ]);
        let config = AnalysisConfig::default();
        let mut traversal = Traversal::new(&catalog, &config, &TsqlParser);
        traversal.analyze_object(&key("Sales", "p")).expect("cataloged");
        assert!(traversal.graph().contains_edge(&key("Sales", "Lookup"), &key("Sales", "p")));
        assert!(!traversal.graph().contains_edge(&key("dbo", "Lookup"), &key("Sales", "p")));
    }

    #[test]
    fn temp_tables_variables_and_ctes_are_silent() {
        let catalog = catalog(vec![SqlObject::procedure(
            "Cat",
            "dbo",
            "p",
            "WITH recent AS (SELECT 1 AS id)
             SELECT * FROM recent r JOIN #work w ON w.id = r.id JOIN @ids i ON i.id = r.id",
        )]);
        let config = AnalysisConfig::default();
        let mut traversal = Traversal::new(&catalog, &config, &TsqlParser);
        traversal.analyze_object(&key("dbo", "p")).expect("cataloged");
        let (_, diagnostics, counters) = traversal.into_parts();
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
        assert_eq!(counters.objects_traversed, 1);
    }

    #[test]
    fn builtin_functions_are_not_reported() {
        let catalog = catalog(vec![SqlObject::procedure(
            "Cat",
            "dbo",
            "p",
            "SELECT COUNT(*), ISNULL(MAX(x), 0), GETDATE() FROM OPENJSON(@doc)",
        )]);
        let config = AnalysisConfig::default();
        let mut traversal = Traversal::new(&catalog, &config, &TsqlParser);
        traversal.analyze_object(&key("dbo", "p")).expect("cataloged");
        let (_, diagnostics, _) = traversal.into_parts();
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
    }

    #[test]
    fn linked_server_reference_is_reported() {
        let catalog = catalog(vec![
            SqlObject::table("Remote", "dbo", "t"),
            SqlObject::procedure("Cat", "dbo", "p", "SELECT * FROM srv.Remote.dbo.t"),
        ]);
        let config = AnalysisConfig::default();
        let mut traversal = Traversal::new(&catalog, &config, &TsqlParser);
        traversal.analyze_object(&key("dbo", "p")).expect("cataloged");
        let (graph, diagnostics, _) = traversal.into_parts();
        assert_eq!(graph.edge_count(), 0);
        assert!(diagnostics[0].message.contains("linked server"));
    }

    #[test]
    fn unknown_key_is_an_error() {
        let catalog = catalog(vec![]);
        let config = AnalysisConfig::default();
        let mut traversal = Traversal::new(&catalog, &config, &TsqlParser);
        let err = traversal.analyze_object(&key("dbo", "ghost")).unwrap_err();
        assert!(matches!(err, Error::InvalidObject(_)));
    }

    #[test]
    fn system_procedures_are_not_reported() {
        let catalog = catalog(vec![SqlObject::procedure(
            "Cat",
            "dbo",
            "p",
            "EXEC sp_rename 'a', 'b'; EXEC master.dbo.xp_cmdshell 'dir'",
        )]);
        let config = AnalysisConfig::default();
        let mut traversal = Traversal::new(&catalog, &config, &TsqlParser);
        traversal.analyze_object(&key("dbo", "p")).expect("cataloged");
        let (_, diagnostics, _) = traversal.into_parts();
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
    }
}
