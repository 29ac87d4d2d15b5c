//! In-process view of one remote schema document.

use crate::codec;
use crate::types::SchemaProperty;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Snapshot of the schema document for one scope.
///
/// Holds the decoded properties keyed by index alongside the raw wire
/// document, so re-encoding passes untouched entries through unchanged.
/// There is no version token: a snapshot may already be stale by the time
/// it is written back, which is why writers hold the scope's lock.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    pub(crate) properties: BTreeMap<String, SchemaProperty>,
    pub(crate) raw: Value,
    pub(crate) touched: BTreeSet<String>,
}

impl SchemaDocument {
    /// Look up a property by index.
    pub fn get(&self, index: &str) -> Option<&SchemaProperty> {
        self.properties.get(index)
    }

    /// Whether a property with this index exists.
    pub fn contains(&self, index: &str) -> bool {
        self.properties.contains_key(index)
    }

    /// Number of decoded properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the document has no decoded properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Whether the wire document has an attribute for this index, even one
    /// that could not be decoded.
    pub fn has_entry(&self, index: &str) -> bool {
        codec::base_properties(&self.raw).is_some_and(|attributes| attributes.contains_key(index))
    }

    /// Insert or overwrite one property, returning the previous entry.
    ///
    /// Only upserted indices are rewritten when the document is encoded.
    pub fn upsert(&mut self, property: SchemaProperty) -> Option<SchemaProperty> {
        self.touched.insert(property.index.clone());
        self.properties.insert(property.index.clone(), property)
    }
}
