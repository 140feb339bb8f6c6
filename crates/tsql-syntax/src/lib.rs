//! # tsql-syntax: lenient T-SQL parsing for dependency analysis
//!
//! Parses stored procedure, function, view and trigger definitions into a
//! syntax tree that keeps every place a database object can be named. It is
//! built on the `sqlparser` crate's `MsSqlDialect` tokenizer with a
//! hand-written recursive-descent parser on top, since dependency analysis
//! needs to get through procedural T-SQL (`IF`, `BEGIN TRY`, `EXEC`, cursors)
//! that a strict ANSI parser rejects.
//!
//! ## Quick Start
//!
//! ```
//! use tsql_syntax::{Statement, parse};
//!
//! let output = parse("SELECT * FROM dbo.Orders; EXEC dbo.Archive;");
//! assert!(output.errors.is_empty());
//! assert!(matches!(output.script.statements[1], Statement::Execute(_)));
//! ```
//!
//! Errors never abort parsing. Each one carries a line and column and the
//! parser resumes at the next statement, so [`ParseOutput::errors`] lists
//! every problem in the text.

pub mod ast;
mod cursor;
mod error;
mod parser;

pub use ast::{
    Assignment, BinaryOperator, Cte, Delete, ExecArgument, Execute, Expr, IfBranch, Insert,
    InsertSource, Join, JoinKind, Literal, Merge, MergeAction, MergeClause, ObjectName,
    OutputClause, Query, QueryBody, RoutineDefinition, RoutineKind, Script, Select, SetOperator,
    Statement, TableFactor, TableWithJoins, UnaryOperator, Update,
};
pub use error::ParseError;

use tracing::trace;

use cursor::Cursor;
use parser::Parser;

/// Result of parsing one text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutput {
    /// Statements that parsed successfully.
    pub script: Script,
    /// Every syntax error found, in source order.
    pub errors: Vec<ParseError>,
}

impl ParseOutput {
    /// Returns `true` if the text parsed without errors.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse a T-SQL batch or module definition.
#[must_use]
pub fn parse(sql: &str) -> ParseOutput {
    let output = match Cursor::new(sql) {
        Ok(cursor) => {
            let (script, errors) = Parser::new(cursor).parse_script();
            ParseOutput { script, errors }
        }
        Err(err) => ParseOutput {
            script: Script::default(),
            errors: vec![err],
        },
    };
    trace!(
        statements = output.script.statements.len(),
        errors = output.errors.len(),
        "Parsed T-SQL text"
    );
    output
}

/// Parse a user-typed object name such as `Cat.dbo.Orders` or
/// `[Cat].[dbo].[Order Lines]`.
///
/// Returns `None` unless the whole text is one 1..4 part name.
#[must_use]
pub fn parse_object_name(text: &str) -> Option<ObjectName> {
    let cursor = Cursor::new(text).ok()?;
    let name = Parser::new(cursor).parse_standalone_name().ok()?;
    (name.parts().len() <= 4 && name.base_name().is_some()).then_some(name)
}

/// The T-SQL parser as a value, for callers that hold a parser behind a trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct TsqlParser;

impl TsqlParser {
    /// Parse `sql`; same as [`parse`].
    #[must_use]
    pub fn parse(&self, sql: &str) -> ParseOutput {
        parse(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_error_is_reported_as_parse_error() {
        let output = parse("SELECT 'unterminated");
        assert_eq!(output.errors.len(), 1);
        assert!(output.script.statements.is_empty());
    }

    #[test]
    fn object_name_helper_accepts_bracketed_parts() {
        let name = parse_object_name("[Cat].[dbo].[Order Lines]").unwrap();
        assert_eq!(name.parts(), ["Cat", "dbo", "Order Lines"]);
    }

    #[test]
    fn object_name_helper_rejects_trailing_text() {
        assert!(parse_object_name("dbo.Orders extra").is_none());
        assert!(parse_object_name("").is_none());
    }
}
