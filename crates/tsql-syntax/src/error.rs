//! Parse errors.
//!
//! The parser never stops at the first problem. Every error is recorded with
//! its source location and parsing resumes at the next statement boundary, so
//! a caller sees all problems of a text at once.

use serde::Serialize;
use thiserror::Error;

/// A syntax error at a 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    /// Human-readable description.
    pub message: String,
    /// 1-based line of the offending token.
    pub line: u64,
    /// 1-based column of the offending token.
    pub column: u64,
}

impl ParseError {
    /// Create an error at the given location.
    pub fn new(message: impl Into<String>, line: u64, column: u64) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

impl From<sqlparser::tokenizer::TokenizerError> for ParseError {
    fn from(err: sqlparser::tokenizer::TokenizerError) -> Self {
        Self::new(err.message, err.location.line, err.location.column)
    }
}
