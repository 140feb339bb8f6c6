//! Canonical identities for database objects.
//!
//! Every node and edge endpoint in the graph is a [`CanonicalKey`], the
//! `[catalog].[schema].[name]` rendering of an object's three-part name.
//! Keys compare case-insensitively, matching SQL Server's default collation
//! for identifiers, but keep the spelling they were created with for display.
//!
//! Two resolution paths exist:
//!
//! - [`key_for_object`]: a cataloged object's own key, no defaulting
//! - [`resolve_reference`]: a name as written in SQL, with missing parts taken
//!   from the referencing object's catalog and schema
//!
//! Resolution never fails. A name with no base part resolves to a key whose
//! name is [`INVALID_NAME`], which matches nothing and is reported by the
//! engine.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};
use tsql_syntax::ObjectName;

use crate::types::SqlObject;

/// Base name used when a reference has none.
pub const INVALID_NAME: &str = "<invalid name>";

/// Catalog and schema used to complete partially qualified names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameDefaults<'a> {
    /// Catalog for names without one
    pub catalog: &'a str,
    /// Schema for names without one
    pub schema: &'a str,
}

impl<'a> NameDefaults<'a> {
    /// Create defaults from a catalog and schema.
    #[must_use]
    pub fn new(catalog: &'a str, schema: &'a str) -> Self {
        Self { catalog, schema }
    }
}

/// Case-insensitive `[catalog].[schema].[name]` identity.
#[derive(Debug, Clone)]
pub struct CanonicalKey {
    display: String,
    folded: String,
    invalid: bool,
}

impl CanonicalKey {
    /// Build a key from its three parts.
    #[must_use]
    pub fn new(catalog: &str, schema: &str, name: &str) -> Self {
        let display = format!(
            "[{}].[{}].[{}]",
            escape(catalog),
            escape(schema),
            escape(name)
        );
        Self::from_display(&display)
    }

    /// The sentinel key for a reference with no base name.
    #[must_use]
    pub fn invalid(catalog: &str, schema: &str) -> Self {
        Self {
            invalid: true,
            ..Self::new(catalog, schema, INVALID_NAME)
        }
    }

    /// Wrap an already-rendered key such as `[Cat].[dbo].[Orders]`.
    ///
    /// Used to look up nodes by the keys printed in graph output.
    #[must_use]
    pub fn from_display(display: &str) -> Self {
        Self {
            display: display.to_string(),
            folded: display.to_lowercase(),
            invalid: false,
        }
    }

    /// The key as first spelled.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Lowercased form used for comparison.
    #[must_use]
    pub fn folded(&self) -> &str {
        &self.folded
    }

    /// Returns `true` for the sentinel produced by a nameless reference.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }
}

fn escape(part: &str) -> String {
    part.replace(']', "]]")
}

impl PartialEq for CanonicalKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for CanonicalKey {}

impl Hash for CanonicalKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl PartialOrd for CanonicalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CanonicalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl std::fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}

impl Serialize for CanonicalKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}

/// Key of a cataloged object, from its own catalog and schema.
#[must_use]
pub fn key_for_object(object: &SqlObject) -> CanonicalKey {
    CanonicalKey::new(&object.catalog, &object.schema, &object.name)
}

/// Key for a name written in SQL.
///
/// Missing (or empty, as in `Cat..Obj`) catalog and schema parts come from
/// `defaults`. A linked-server part is not part of the identity.
#[must_use]
pub fn resolve_reference(name: &ObjectName, defaults: NameDefaults<'_>) -> CanonicalKey {
    let catalog = name.catalog_name().unwrap_or(defaults.catalog);
    let schema = name.schema_name().unwrap_or(defaults.schema);
    match name.base_name() {
        Some(base) => CanonicalKey::new(catalog, schema, base),
        None => CanonicalKey::invalid(catalog, schema),
    }
}
