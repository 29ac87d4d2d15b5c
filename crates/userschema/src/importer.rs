//! Lookup and import of observed property state.

use crate::backend::{self, RemoteSchemaClient};
use crate::error::{Error, Result};
use crate::types::{ReconcileOptions, SchemaProperty, SchemaScope};
use std::fmt;
use std::str::FromStr;

/// Identifier accepted by [`PropertyImporter::import`].
///
/// Written as `<index>` for the default user type or `<typeId>.<index>`
/// for a custom one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    pub scope: SchemaScope,
    pub index: String,
}

impl ImportId {
    pub fn new(scope: SchemaScope, index: impl Into<String>) -> Self {
        Self {
            scope,
            index: index.into(),
        }
    }
}

impl FromStr for ImportId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (scope, index) = match s.split_once('.') {
            Some((type_id, index)) => (SchemaScope::custom(type_id), index),
            None => (SchemaScope::Default, s),
        };

        if index.is_empty() || index.contains('.') {
            return Err(Error::InvalidImportId(s.to_string()));
        }
        Ok(Self::new(scope, index))
    }
}

impl fmt::Display for ImportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope.is_default() {
            write!(f, "{}", self.index)
        } else {
            write!(f, "{}.{}", self.scope.type_id(), self.index)
        }
    }
}

/// Reads single properties out of the remote schema.
///
/// Reads take no lock: a lookup racing a writer may see the document from
/// just before the write.
pub struct PropertyImporter<'a> {
    client: &'a dyn RemoteSchemaClient,
    options: &'a ReconcileOptions,
}

impl<'a> PropertyImporter<'a> {
    pub fn new(client: &'a dyn RemoteSchemaClient, options: &'a ReconcileOptions) -> Self {
        Self { client, options }
    }

    /// Fetch the observed state of `index` in `scope`.
    ///
    /// An absent index is `Ok(None)`, not an error.
    pub fn lookup(&self, index: &str, scope: &SchemaScope) -> Result<Option<SchemaProperty>> {
        let document = backend::fetch_document(
            self.client,
            scope,
            Some(index),
            &self.options.fetch_retry,
            self.options.deadline(),
        )?;

        let found = document.get(index).cloned();
        if found.is_none() {
            log::debug!("Property '{index}' not present in {scope}");
        }
        Ok(found)
    }

    /// Import a property by id, requiring that it exists.
    pub fn import(&self, id: &ImportId) -> Result<SchemaProperty> {
        log::info!("Importing property '{}' from {}", id.index, id.scope);
        self.lookup(&id.index, &id.scope)?
            .ok_or_else(|| Error::NotFound {
                scope: id.scope.clone(),
                index: id.index.clone(),
            })
    }
}
