//! Backend abstraction for the remote schema service.
//!
//! The [`RemoteSchemaClient`] trait is the only way the core talks to the
//! directory service. It deals in whole documents: there is no partial
//! update and no version token.

pub mod http;
pub mod memory;

use crate::codec;
use crate::document::SchemaDocument;
use crate::error::{Error, RemoteError, Result};
use crate::retry::{self, LogCallback};
use crate::types::{RetryConfig, SchemaScope};
use serde_json::Value;
use std::time::Instant;

pub use http::HttpBackend;
pub use memory::MemoryBackend;

/// Result type for raw backend calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Fetch and replace whole user schema documents.
///
/// Implementations must be safe to call from many threads at once; the
/// core serialises writers itself.
pub trait RemoteSchemaClient: Send + Sync {
    /// Fetch the current schema document for a scope.
    fn fetch_document(&self, scope: &SchemaScope) -> RemoteResult<Value>;

    /// Replace the schema document for a scope.
    fn replace_document(&self, scope: &SchemaScope, document: &Value) -> RemoteResult<()>;
}

/// Fetch and decode a document, retrying transient failures.
pub(crate) fn fetch_document(
    client: &dyn RemoteSchemaClient,
    scope: &SchemaScope,
    index: Option<&str>,
    config: &RetryConfig,
    deadline: Option<Instant>,
) -> Result<SchemaDocument> {
    let raw = retry::with_retry(config, deadline, Some(&LogCallback), || {
        client
            .fetch_document(scope)
            .map_err(|source| Error::remote("fetch", scope, index, source))
    })?;
    codec::decode(scope, raw)
}
