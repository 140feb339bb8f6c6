//! Analysis configuration.
//!
//! Configuration is optional. Every field has a default, so an empty YAML
//! document (or no file at all) yields [`AnalysisConfig::default`].
//!
//! ```yaml
//! default-catalog: Warehouse
//! default-schema: dbo
//! fallback-to-default-schema: true
//! max-dynamic-sql-depth: 16
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Catalog assigned to objects supplied without one
pub const DEFAULT_CATALOG: &str = "Unknown";

/// Schema assigned to objects and references supplied without one
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Deepest nesting of dynamic SQL inside dynamic SQL that is analyzed
pub const DEFAULT_MAX_DYNAMIC_SQL_DEPTH: usize = 16;

/// Settings for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Catalog for objects with no catalog of their own
    pub default_catalog: String,

    /// Schema for objects with no schema, and the fallback schema for
    /// unqualified references
    pub default_schema: String,

    /// Retry an unqualified reference under `default_schema` when it misses
    /// under the referencing object's own schema
    pub fallback_to_default_schema: bool,

    /// Maximum dynamic SQL nesting depth
    pub max_dynamic_sql_depth: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_catalog: DEFAULT_CATALOG.to_string(),
            default_schema: DEFAULT_SCHEMA.to_string(),
            fallback_to_default_schema: true,
            max_dynamic_sql_depth: DEFAULT_MAX_DYNAMIC_SQL_DEPTH,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text and validate it.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the defaults can form canonical keys.
    pub fn validate(&self) -> Result<()> {
        if self.default_catalog.trim().is_empty() {
            return Err(Error::Config("default-catalog cannot be empty".to_string()));
        }
        if self.default_schema.trim().is_empty() {
            return Err(Error::Config("default-schema cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_named_constants() {
        let config = AnalysisConfig::default();
        assert_eq!(config.default_catalog, DEFAULT_CATALOG);
        assert_eq!(config.default_schema, DEFAULT_SCHEMA);
        assert!(config.fallback_to_default_schema);
        assert_eq!(config.max_dynamic_sql_depth, DEFAULT_MAX_DYNAMIC_SQL_DEPTH);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = AnalysisConfig::from_yaml_str("default-catalog: Warehouse\n")
            .expect("valid config");
        assert_eq!(config.default_catalog, "Warehouse");
        assert_eq!(config.default_schema, DEFAULT_SCHEMA);
    }

    #[test]
    fn empty_document_is_default() {
        let config = AnalysisConfig::from_yaml_str("   \n").expect("valid config");
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AnalysisConfig::from_yaml_str("default-scheme: dbo\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_schema_is_rejected() {
        let err = AnalysisConfig::from_yaml_str("default-schema: ''\n").unwrap_err();
        assert!(err.to_string().contains("default-schema"));
    }

    #[test]
    fn load_reads_file() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "fallback-to-default-schema: false").expect("write config");
        writeln!(file, "max-dynamic-sql-depth: 2").expect("write config");

        let config = AnalysisConfig::load(file.path()).expect("load config");
        assert!(!config.fallback_to_default_schema);
        assert_eq!(config.max_dynamic_sql_depth, 2);
    }
}
