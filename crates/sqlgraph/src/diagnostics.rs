//! Recoverable problems found while building a graph.
//!
//! A [`Diagnostic`] names the object it concerns and says what went wrong.
//! Diagnostics never stop a build; they are handed to a [`DiagnosticSink`] at
//! the point of detection and returned next to the graph.
//!
//! `DiagnosticKind` splits problems the same way the indexer's error kinds do:
//! - Input problems: the SQL or the object list is wrong and can be fixed
//! - Scope limitations: the SQL is fine but names something the run cannot see

use serde::Serialize;

/// A recoverable problem tied to one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Category of the problem
    pub kind: DiagnosticKind,
    /// Canonical key (or display name) of the object being analyzed
    pub object: String,
    /// Human-readable detail
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.object, self.message, self.kind)
    }
}

impl std::error::Error for Diagnostic {}

impl Diagnostic {
    /// Create a new diagnostic.
    #[must_use]
    pub fn new(kind: DiagnosticKind, object: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            object: object.into(),
            message: message.into(),
        }
    }
}

/// Categorization of diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    // === Input Problems ===
    /// The object's definition did not parse; its body contributes no edges
    ParseFailed,

    /// A second object with an already-seen canonical key was dropped
    DuplicateObject,

    /// A dynamic SQL string could not be reconstructed or did not parse
    DynamicSqlSkipped,

    /// Dynamic SQL nested deeper than the configured limit
    RecursionLimit,

    // === Scope Limitations ===
    /// A referenced name matches no cataloged object
    UnresolvedReference,

    /// An edge named a key that has no node
    MissingEndpoint,

    /// A write targets something that is not a table
    NonTableWriteTarget,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseFailed => write!(f, "parse failed"),
            Self::DuplicateObject => write!(f, "duplicate object"),
            Self::DynamicSqlSkipped => write!(f, "dynamic SQL skipped"),
            Self::RecursionLimit => write!(f, "recursion limit"),
            Self::UnresolvedReference => write!(f, "unresolved reference"),
            Self::MissingEndpoint => write!(f, "missing endpoint"),
            Self::NonTableWriteTarget => write!(f, "non-table write target"),
        }
    }
}

impl DiagnosticKind {
    /// Returns `true` if the problem lies in the supplied SQL or object list.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::ParseFailed | Self::DuplicateObject | Self::DynamicSqlSkipped | Self::RecursionLimit
        )
    }

    /// Returns `true` if the problem is a reference outside what the run models.
    #[must_use]
    pub fn is_scope_limitation(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedReference | Self::MissingEndpoint | Self::NonTableWriteTarget
        )
    }
}

/// Receiver for diagnostics produced during a build.
pub trait DiagnosticSink {
    /// Accept one diagnostic.
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::parse(DiagnosticKind::ParseFailed, true)]
    #[case::duplicate(DiagnosticKind::DuplicateObject, true)]
    #[case::dynamic(DiagnosticKind::DynamicSqlSkipped, true)]
    #[case::recursion(DiagnosticKind::RecursionLimit, true)]
    #[case::unresolved(DiagnosticKind::UnresolvedReference, false)]
    #[case::missing(DiagnosticKind::MissingEndpoint, false)]
    #[case::non_table(DiagnosticKind::NonTableWriteTarget, false)]
    fn kinds_fall_in_exactly_one_category(#[case] kind: DiagnosticKind, #[case] input: bool) {
        assert_eq!(kind.is_input_error(), input);
        assert_eq!(kind.is_scope_limitation(), !input);
    }

    #[test]
    fn display_names_object_message_and_kind() {
        let diagnostic = Diagnostic::new(
            DiagnosticKind::ParseFailed,
            "[Cat].[dbo].[Broken]",
            "unexpected end of input",
        );
        assert_eq!(
            diagnostic.to_string(),
            "[Cat].[dbo].[Broken]: unexpected end of input (parse failed)"
        );
    }

    #[test]
    fn vec_sink_collects_in_order() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        sink.report(Diagnostic::new(DiagnosticKind::DuplicateObject, "a", "first"));
        sink.report(Diagnostic::new(DiagnosticKind::UnresolvedReference, "b", "second"));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1].object, "b");
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&DiagnosticKind::NonTableWriteTarget)
            .expect("serialize kind");
        assert_eq!(json, "\"non_table_write_target\"");
    }
}
