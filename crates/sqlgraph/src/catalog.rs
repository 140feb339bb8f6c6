//! The set of objects one run analyzes.
//!
//! The catalog is built once from the input objects and is read-only after
//! that. It answers "which object, if any, does this key denote" for the
//! traversal and keeps objects in input order so builds are deterministic.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{Error, Result};
use crate::resolver::{CanonicalKey, key_for_object};
use crate::types::{ObjectKind, SqlObject};

/// Immutable index of analyzable objects by canonical key.
#[derive(Debug, Clone, Default)]
pub struct ObjectCatalog {
    entries: Vec<(CanonicalKey, SqlObject)>,
    index: HashMap<CanonicalKey, usize>,
}

impl ObjectCatalog {
    /// Index `objects`, keeping the first of any duplicate keys.
    ///
    /// Duplicates are reported to `sink`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidObject` if an object has an empty name, catalog
    /// or schema, since no key can be formed for it.
    pub fn build<I, S>(objects: I, sink: &mut S) -> Result<Self>
    where
        I: IntoIterator<Item = SqlObject>,
        S: DiagnosticSink + ?Sized,
    {
        let mut catalog = Self::default();
        for object in objects {
            validate(&object)?;
            let key = key_for_object(&object);
            if catalog.index.contains_key(&key) {
                warn!(object = %key, "Duplicate object, keeping the first occurrence");
                sink.report(Diagnostic::new(
                    DiagnosticKind::DuplicateObject,
                    key.as_str(),
                    format!("duplicate {} ignored; first occurrence kept", object.kind),
                ));
                continue;
            }
            catalog.index.insert(key.clone(), catalog.entries.len());
            catalog.entries.push((key, object));
        }
        Ok(catalog)
    }

    /// The object with this key.
    #[must_use]
    pub fn get(&self, key: &CanonicalKey) -> Option<&SqlObject> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// The cataloged spelling of `key` and the kind of its object.
    ///
    /// Lookups fold case, so `[cat].[DBO].[orders]` finds
    /// `[Cat].[dbo].[Orders]`; edges should use the returned key.
    #[must_use]
    pub fn resolve(&self, key: &CanonicalKey) -> Option<(&CanonicalKey, ObjectKind)> {
        self.index.get(key).map(|&i| {
            let (key, object) = &self.entries[i];
            (key, object.kind)
        })
    }

    /// The kind of the object with this key.
    #[must_use]
    pub fn kind_of(&self, key: &CanonicalKey) -> Option<ObjectKind> {
        self.get(key).map(|object| object.kind)
    }

    /// Returns `true` if an object has this key.
    #[must_use]
    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.index.contains_key(key)
    }

    /// Objects in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalKey, &SqlObject)> {
        self.entries.iter().map(|(key, object)| (key, object))
    }

    /// Distinct catalog names, compared case-insensitively, sorted.
    #[must_use]
    pub fn catalog_names(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .map(|(_, object)| object.catalog.to_lowercase())
            .collect()
    }

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate(object: &SqlObject) -> Result<()> {
    let missing = [
        ("name", &object.name),
        ("schema", &object.schema),
        ("catalog", &object.catalog),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());

    match missing {
        Some((field, _)) => Err(Error::InvalidObject(format!(
            "{} object has an empty {field}",
            object.kind
        ))),
        None => Ok(()),
    }
}
