//! Reading object exports.
//!
//! Two layouts are accepted:
//!
//! - a JSON array of object records (detected by a leading `[`)
//! - JSON Lines, one record per line
//!
//! A record is `{ "name", "kind", "schema"?, "catalog"?, "definition"? }`;
//! missing schema and catalog take the configured defaults.
//!
//! A JSON array is all-or-nothing. JSON Lines input is read resiliently: a
//! line that is not a valid record becomes an [`InputWarning`] carrying its
//! line number and the rest of the file is still loaded.

use std::path::Path;

use tracing::warn;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::types::{ObjectRecord, SqlObject};

/// A non-fatal problem found while reading JSON Lines input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputWarning {
    /// The line is not valid JSON or not a valid object record
    MalformedRecord {
        /// 1-based line number
        line_number: usize,
        /// Decoder message
        error: String,
    },
}

impl InputWarning {
    /// Line the warning refers to.
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            Self::MalformedRecord { line_number, .. } => *line_number,
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::MalformedRecord { line_number, error } => {
                format!("line {line_number}: malformed object record: {error}")
            }
        }
    }
}

impl std::fmt::Display for InputWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

/// Objects read from an export, plus any skipped lines.
#[derive(Debug, Clone, Default)]
pub struct LoadedObjects {
    /// Objects in file order
    pub objects: Vec<SqlObject>,
    /// Lines that could not be read
    pub warnings: Vec<InputWarning>,
}

/// Read objects from a file.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read and `Error::Json` if a JSON
/// array does not decode.
pub fn load_objects(path: &Path, config: &AnalysisConfig) -> Result<LoadedObjects> {
    let content = std::fs::read_to_string(path)?;
    parse_objects(&content, config)
}

/// Read objects from export text.
///
/// # Errors
///
/// Returns `Error::Json` if a JSON array does not decode.
pub fn parse_objects(content: &str, config: &AnalysisConfig) -> Result<LoadedObjects> {
    if content.trim_start().starts_with('[') {
        let records: Vec<ObjectRecord> = serde_json::from_str(content)?;
        return Ok(LoadedObjects {
            objects: records
                .into_iter()
                .map(|record| record.into_object(config))
                .collect(),
            warnings: Vec::new(),
        });
    }
    Ok(parse_json_lines(content, config))
}

fn parse_json_lines(content: &str, config: &AnalysisConfig) -> LoadedObjects {
    let mut loaded = LoadedObjects::default();
    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<ObjectRecord>(trimmed) {
            Ok(record) => loaded.objects.push(record.into_object(config)),
            Err(e) => {
                warn!(line = line_number, error = %e, "Skipping malformed object record");
                loaded.warnings.push(InputWarning::MalformedRecord {
                    line_number,
                    error: e.to_string(),
                });
            }
        }
    }
    loaded
}
