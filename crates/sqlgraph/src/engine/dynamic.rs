//! Dynamic SQL re-entry.
//!
//! `EXEC('...')`, `EXEC(N'...' + '...')` and `EXEC sp_executesql N'...'` carry
//! SQL as a string. When the string is built only from literals, its text is
//! reconstructed, parsed with the same parser, and walked by the same
//! traversal in a scope one level deeper. Edges found inside are attributed
//! to the enclosing object and the DML target context carries over.
//!
//! Anything else (variables, function calls, empty strings, text that does
//! not parse, nesting past the configured depth) is reported and skipped.

use tracing::debug;
use tsql_syntax::{BinaryOperator, Expr, Literal, ObjectName};

use super::{ObjectScope, Traversal, describe_errors};
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};

/// Returns `true` for `sp_executesql`, however qualified.
pub(crate) fn is_sp_executesql(name: &ObjectName) -> bool {
    name.base_name()
        .is_some_and(|base| base.eq_ignore_ascii_case("sp_executesql"))
}

/// The text of a string built from literals joined with `+`.
///
/// Parentheses and casts around the string are looked through. Returns `None`
/// if any part is not a string literal.
pub(crate) fn literal_text(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Literal(Literal::String { value, .. }) => Some(value.clone()),
        Expr::Binary {
            left,
            op: BinaryOperator::Plus,
            right,
        } => {
            let mut text = literal_text(left)?;
            text.push_str(&literal_text(right)?);
            Some(text)
        }
        Expr::Nested(items) if items.len() == 1 => literal_text(&items[0]),
        Expr::Cast { expr, .. } => literal_text(expr),
        _ => None,
    }
}

impl ObjectScope {
    fn enter_dynamic_sql(&self) -> Self {
        Self {
            ctes: Vec::new(),
            dynamic_depth: self.dynamic_depth + 1,
            ..self.clone()
        }
    }
}

impl<S: DiagnosticSink> Traversal<'_, S> {
    pub(super) fn visit_dynamic_sql(&mut self, sql: &Expr, scope: &ObjectScope) {
        let Some(text) = literal_text(sql) else {
            self.report(
                DiagnosticKind::DynamicSqlSkipped,
                &scope.key,
                "dynamic SQL is not built from string literals",
            );
            return;
        };
        if text.trim().is_empty() {
            self.report(
                DiagnosticKind::DynamicSqlSkipped,
                &scope.key,
                "dynamic SQL string is empty",
            );
            return;
        }
        let limit = self.config.max_dynamic_sql_depth;
        if scope.dynamic_depth >= limit {
            self.report(
                DiagnosticKind::RecursionLimit,
                &scope.key,
                format!("dynamic SQL nested more than {limit} levels deep"),
            );
            return;
        }

        let output = self.parser.parse(&text);
        if !output.is_clean() {
            self.report(
                DiagnosticKind::DynamicSqlSkipped,
                &scope.key,
                format!("dynamic SQL did not parse: {}", describe_errors(&output.errors)),
            );
            return;
        }

        debug!(
            object = %scope.key,
            depth = scope.dynamic_depth + 1,
            statements = output.script.statements.len(),
            "Traversing dynamic SQL"
        );
        self.counters.dynamic_sql_fragments += 1;
        let nested = scope.enter_dynamic_sql();
        self.visit_statements(&output.script.statements, &nested);
    }
}
