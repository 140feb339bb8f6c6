//! Domain types for dependency analysis.
//!
//! - **Input**: `SqlObject` (one analyzable object), `ObjectRecord` (its
//!   serialized form, with optional schema and catalog)
//! - **Edges**: `EdgeKind`
//! - **Results**: `BuildStats`, `Impact`, `Cycle`, `TableUsage`, `RoutineUsage`

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AnalysisConfig;
use crate::resolver::CanonicalKey;

// ============================================================================
// Objects
// ============================================================================

/// Kinds of database object the graph models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ObjectKind {
    /// Base table; has no definition
    Table,
    /// View; its definition is traversed and it is read like a table
    View,
    /// Scalar or table-valued function
    Function,
    /// Stored procedure
    Procedure,
}

impl ObjectKind {
    /// Parse a kind name, accepting `sys.objects` type codes.
    ///
    /// # Returns
    ///
    /// `None` if the name is not recognized.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "table" | "u" | "user_table" => Some(Self::Table),
            "view" | "v" => Some(Self::View),
            "function" | "fn" | "if" | "tf" | "sql_scalar_function"
            | "sql_inline_table_valued_function" | "sql_table_valued_function" => {
                Some(Self::Function)
            }
            "procedure" | "proc" | "p" | "stored_procedure" | "sql_stored_procedure" => {
                Some(Self::Procedure)
            }
            _ => None,
        }
    }

    /// Lowercase display name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::View => "view",
            Self::Function => "function",
            Self::Procedure => "procedure",
        }
    }

    /// Returns `true` for kinds whose definition is parsed and traversed.
    #[must_use]
    pub fn has_body(&self) -> bool {
        !matches!(self, Self::Table)
    }

    /// Returns `true` for kinds that yield rows when named in a FROM clause.
    #[must_use]
    pub fn is_relation(&self) -> bool {
        matches!(self, Self::Table | Self::View)
    }

    /// Returns `true` for kinds that can be the target of `EXEC`.
    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Procedure | Self::Function)
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ObjectKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_name(&value).ok_or_else(|| format!("unknown object kind '{value}'"))
    }
}

/// One analyzable database object.
///
/// `(catalog, schema, name)` identifies the object; the catalog rejects a
/// second object with the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlObject {
    /// Object name without schema or catalog
    pub name: String,
    /// Owning schema
    pub schema: String,
    /// Owning catalog (database)
    pub catalog: String,
    /// What the object is
    pub kind: ObjectKind,
    /// Source text; empty for tables
    pub definition: String,
}

impl SqlObject {
    /// Create an object.
    #[must_use]
    pub fn new(
        kind: ObjectKind,
        catalog: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            catalog: catalog.into(),
            kind,
            definition: definition.into(),
        }
    }

    /// Create a table.
    #[must_use]
    pub fn table(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::new(ObjectKind::Table, catalog, schema, name, String::new())
    }

    /// Create a view.
    #[must_use]
    pub fn view(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self::new(ObjectKind::View, catalog, schema, name, definition)
    }

    /// Create a function.
    #[must_use]
    pub fn function(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self::new(ObjectKind::Function, catalog, schema, name, definition)
    }

    /// Create a stored procedure.
    #[must_use]
    pub fn procedure(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self::new(ObjectKind::Procedure, catalog, schema, name, definition)
    }
}

/// Serialized form of a [`SqlObject`] as supplied by a metadata export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectRecord {
    /// Object name
    pub name: String,
    /// Schema, if the export carries one
    #[serde(default)]
    pub schema: Option<String>,
    /// Catalog, if the export carries one
    #[serde(default, alias = "database")]
    pub catalog: Option<String>,
    /// Object kind
    #[serde(alias = "type")]
    pub kind: ObjectKind,
    /// Source text
    #[serde(default)]
    pub definition: Option<String>,
}

impl ObjectRecord {
    /// Fill missing or blank schema and catalog from `config`.
    #[must_use]
    pub fn into_object(self, config: &AnalysisConfig) -> SqlObject {
        let or_default = |value: Option<String>, default: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        SqlObject {
            schema: or_default(self.schema, &config.default_schema),
            catalog: or_default(self.catalog, &config.default_catalog),
            name: self.name,
            kind: self.kind,
            definition: self.definition.unwrap_or_default(),
        }
    }
}

// ============================================================================
// Edges
// ============================================================================

/// Why an edge exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Source's data is read by the consumer
    DataFlow,
    /// Modifier writes to a table
    Write,
    /// Caller executes the callee
    Call,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataFlow => write!(f, "reads"),
            Self::Write => write!(f, "writes"),
            Self::Call => write!(f, "calls"),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Statistics from one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Nodes seeded from the object catalog
    pub objects_seeded: usize,
    /// Objects whose definition was parsed and walked
    pub objects_traversed: usize,
    /// Objects whose definition did not parse
    pub parse_failures: usize,
    /// Distinct edges in the finished graph
    pub edges_recorded: usize,
    /// Dynamic SQL strings that were parsed and walked
    pub dynamic_sql_fragments: usize,
    /// Wall-clock time of the build
    pub duration: Duration,
}

/// Objects downstream of a changed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Impact {
    /// The object being analyzed
    pub target: CanonicalKey,
    /// Objects one edge away
    pub direct: Vec<ImpactEntry>,
    /// Objects further away, nearest first
    pub transitive: Vec<ImpactEntry>,
}

/// One object reached by an impact search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactEntry {
    /// The affected object
    pub key: CanonicalKey,
    /// Its kind
    pub kind: ObjectKind,
    /// Number of edges from the target
    pub depth: usize,
}

/// A strongly connected group of objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    /// Members of the cycle, sorted by key
    pub members: Vec<CanonicalKey>,
}

/// Who reads and who writes one table or view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUsage {
    /// The table or view
    pub table: CanonicalKey,
    /// Objects that read it
    pub readers: Vec<CanonicalKey>,
    /// Objects that write to it
    pub writers: Vec<CanonicalKey>,
}

/// How one procedure, function or view relates to the rest of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineUsage {
    /// The routine
    pub routine: CanonicalKey,
    /// Routines it executes
    pub calls: Vec<CanonicalKey>,
    /// Routines that execute it
    pub called_by: Vec<CanonicalKey>,
    /// Tables, views and functions it reads
    pub reads: Vec<CanonicalKey>,
    /// Tables it writes
    pub writes: Vec<CanonicalKey>,
    /// Objects that read its output (functions and views)
    pub read_by: Vec<CanonicalKey>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::table("table", ObjectKind::Table)]
    #[case::table_code("U", ObjectKind::Table)]
    #[case::view("View", ObjectKind::View)]
    #[case::scalar_code("FN", ObjectKind::Function)]
    #[case::tvf_code("TF", ObjectKind::Function)]
    #[case::proc("proc", ObjectKind::Procedure)]
    #[case::sys_type("SQL_STORED_PROCEDURE", ObjectKind::Procedure)]
    fn kind_names_are_recognized(#[case] name: &str, #[case] expected: ObjectKind) {
        assert_eq!(ObjectKind::from_name(name), Some(expected));
    }

    #[test]
    fn unknown_kind_is_none() {
        assert_eq!(ObjectKind::from_name("synonym"), None);
    }

    #[test]
    fn record_fills_missing_schema_and_catalog() {
        let record: ObjectRecord = serde_json::from_str(
            r#"{"name": "Orders", "kind": "table", "schema": ""}"#,
        )
        .expect("valid record");
        let object = record.into_object(&AnalysisConfig::default());
        assert_eq!(object.schema, "dbo");
        assert_eq!(object.catalog, "Unknown");
        assert!(object.definition.is_empty());
    }

    #[test]
    fn record_accepts_type_code_and_database_alias() {
        let record: ObjectRecord = serde_json::from_str(
            r#"{"name": "p", "type": "P", "database": "Sales", "definition": "CREATE PROC p AS SELECT 1"}"#,
        )
        .expect("valid record");
        assert_eq!(record.kind, ObjectKind::Procedure);
        assert_eq!(record.catalog.as_deref(), Some("Sales"));
    }

    #[test]
    fn record_with_unknown_kind_fails() {
        let result: Result<ObjectRecord, _> =
            serde_json::from_str(r#"{"name": "s", "kind": "synonym"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn only_tables_have_no_body() {
        assert!(!ObjectKind::Table.has_body());
        assert!(ObjectKind::View.has_body());
        assert!(ObjectKind::Procedure.has_body());
    }
}
