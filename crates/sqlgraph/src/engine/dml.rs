//! Write statements and the DML target context.
//!
//! Entering INSERT, UPDATE, DELETE or MERGE resolves the statement's target,
//! records the write edge, and pushes the target onto the
//! [`DmlTargetTracker`] while the statement's own clauses are walked. A table
//! reference inside those clauses that resolves to the pushed key is the
//! target itself, not a read, and gets no data-flow edge.
//!
//! The push happens for every DML statement, including ones whose target does
//! not resolve (pushed as `None`), so nested statements see their own target
//! and the enclosing one comes back on exit.

use tsql_syntax::{
    Delete, Insert, InsertSource, Merge, MergeAction, ObjectName, OutputClause, TableFactor,
    TableWithJoins, Update,
};

use super::{ObjectScope, Traversal, same_identifier};
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::resolver::CanonicalKey;
use crate::types::ObjectKind;

/// Write targets of the enclosing DML statements, innermost last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DmlTargetTracker {
    stack: Vec<Option<CanonicalKey>>,
}

impl DmlTargetTracker {
    /// Enter a DML statement writing to `target` (`None` if unresolved).
    pub fn enter(&mut self, target: Option<CanonicalKey>) {
        self.stack.push(target);
    }

    /// Leave the innermost DML statement, restoring the enclosing target.
    pub fn exit(&mut self) {
        self.stack.pop();
    }

    /// Target of the innermost enclosing DML statement.
    #[must_use]
    pub fn current(&self) -> Option<&CanonicalKey> {
        self.stack.last().and_then(Option::as_ref)
    }

    /// Returns `true` if `key` is the innermost statement's target.
    #[must_use]
    pub fn is_current(&self, key: &CanonicalKey) -> bool {
        self.current() == Some(key)
    }

    /// Number of enclosing DML statements.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Find the table an UPDATE/DELETE alias stands for.
///
/// Searches the FROM clause depth-first, left to right, through joins and
/// parenthesized joins, and returns the first table whose alias matches.
/// Derived tables and functions are not writable and are not matched.
pub(crate) fn find_alias_target<'q>(
    alias: &str,
    from: &'q [TableWithJoins],
) -> Option<&'q ObjectName> {
    from.iter()
        .find_map(|table| alias_in_table_with_joins(alias, table))
}

fn alias_in_table_with_joins<'q>(alias: &str, table: &'q TableWithJoins) -> Option<&'q ObjectName> {
    alias_in_factor(alias, &table.relation).or_else(|| {
        table
            .joins
            .iter()
            .find_map(|join| alias_in_factor(alias, &join.relation))
    })
}

fn alias_in_factor<'q>(alias: &str, factor: &'q TableFactor) -> Option<&'q ObjectName> {
    match factor {
        TableFactor::Table {
            name,
            alias: Some(candidate),
        } if same_identifier(candidate, alias) => Some(name),
        TableFactor::NestedJoin { table, .. } => alias_in_table_with_joins(alias, table),
        _ => None,
    }
}

impl<S: DiagnosticSink> Traversal<'_, S> {
    /// Run `visit` with `target` as the innermost DML target.
    fn with_dml_target(&mut self, target: Option<CanonicalKey>, visit: impl FnOnce(&mut Self)) {
        self.targets.enter(target);
        visit(self);
        self.targets.exit();
    }

    /// Resolve a write target and record the write edge.
    ///
    /// An unqualified target is first looked up as an alias in `from`; if no
    /// alias matches, the name itself is used. Returns the target's key when
    /// it is a cataloged table.
    pub(super) fn record_write_target(
        &mut self,
        target: &ObjectName,
        from: &[TableWithJoins],
        scope: &ObjectScope,
    ) -> Option<CanonicalKey> {
        let name = target
            .is_unqualified()
            .then(|| target.base_name().and_then(|alias| find_alias_target(alias, from)))
            .flatten()
            .unwrap_or(target);

        let (key, kind) = self.resolve_or_report(name, scope)?;
        if kind != ObjectKind::Table {
            self.report(
                DiagnosticKind::NonTableWriteTarget,
                &scope.key,
                format!("write to {kind} {key} is not modeled"),
            );
            return None;
        }
        let outcome = self.graph.add_write_edge(&scope.key, &key);
        self.record_outcome(outcome, scope);
        Some(key)
    }

    pub(super) fn visit_insert(&mut self, insert: &Insert, scope: &ObjectScope) {
        let target = self.record_write_target(&insert.target, &[], scope);
        self.with_dml_target(target, |this| {
            match &insert.source {
                InsertSource::Values(rows) => {
                    for row in rows {
                        this.visit_exprs(row, scope);
                    }
                }
                InsertSource::Query(query) => this.visit_query(query, scope),
                InsertSource::Execute(execute) => this.visit_execute(execute, scope),
                InsertSource::DefaultValues => {}
            }
            this.visit_output(insert.output.as_ref(), scope);
        });
    }

    pub(super) fn visit_update(&mut self, update: &Update, scope: &ObjectScope) {
        let target = self.record_write_target(&update.target, &update.from, scope);
        self.with_dml_target(target, |this| {
            for assignment in &update.assignments {
                this.visit_expr(&assignment.value, scope);
            }
            this.visit_from(&update.from, scope);
            if let Some(selection) = &update.selection {
                this.visit_expr(selection, scope);
            }
            this.visit_output(update.output.as_ref(), scope);
        });
    }

    pub(super) fn visit_delete(&mut self, delete: &Delete, scope: &ObjectScope) {
        let target = self.record_write_target(&delete.target, &delete.from, scope);
        self.with_dml_target(target, |this| {
            this.visit_from(&delete.from, scope);
            if let Some(selection) = &delete.selection {
                this.visit_expr(selection, scope);
            }
            this.visit_output(delete.output.as_ref(), scope);
        });
    }

    pub(super) fn visit_merge(&mut self, merge: &Merge, scope: &ObjectScope) {
        let target = self.record_write_target(&merge.target, &[], scope);
        self.with_dml_target(target, |this| {
            this.visit_table_factor(&merge.source, scope);
            this.visit_expr(&merge.on, scope);
            for clause in &merge.clauses {
                if let Some(predicate) = &clause.predicate {
                    this.visit_expr(predicate, scope);
                }
                match &clause.action {
                    MergeAction::Update(assignments) => {
                        for assignment in assignments {
                            this.visit_expr(&assignment.value, scope);
                        }
                    }
                    MergeAction::Insert { values, .. } => this.visit_exprs(values, scope),
                    MergeAction::Delete => {}
                }
            }
            this.visit_output(merge.output.as_ref(), scope);
        });
    }

    fn visit_output(&mut self, output: Option<&OutputClause>, scope: &ObjectScope) {
        let Some(output) = output else {
            return;
        };
        self.visit_exprs(&output.expressions, scope);
        if let Some(into) = &output.into {
            self.record_write_target(into, &[], scope);
        }
    }
}
