//! The seam between the engine and the SQL parser.
//!
//! The engine only needs "text in, statements and errors out". Keeping that
//! behind [`SqlParser`] lets tests count or fail parses, and lets the parallel
//! build share one parser across rayon workers.

use tsql_syntax::{ParseOutput, TsqlParser};

/// Turns object definitions and dynamic SQL strings into syntax trees.
///
/// Implementations must report problems through [`ParseOutput::errors`]
/// rather than panicking; any error makes the engine skip the text.
pub trait SqlParser: Send + Sync {
    /// Parse `text`.
    fn parse(&self, text: &str) -> ParseOutput;
}

impl SqlParser for TsqlParser {
    fn parse(&self, text: &str) -> ParseOutput {
        tsql_syntax::parse(text)
    }
}

impl<P: SqlParser + ?Sized> SqlParser for &P {
    fn parse(&self, text: &str) -> ParseOutput {
        (**self).parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_with(parser: &dyn SqlParser, text: &str) -> ParseOutput {
        parser.parse(text)
    }

    #[test]
    fn tsql_parser_implements_seam() {
        let output = parse_with(&TsqlParser, "SELECT * FROM dbo.t");
        assert!(output.is_clean());
        assert_eq!(output.script.statements.len(), 1);
    }

    #[test]
    fn errors_come_back_in_output() {
        let output = parse_with(&TsqlParser, "SELECT * FROM");
        assert!(!output.is_clean());
    }
}
