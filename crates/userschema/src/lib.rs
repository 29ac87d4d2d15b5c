//! # userschema
//!
//! Concurrency-safe reconciliation of user schema base properties.
//!
//! The directory service keeps every base property of a user type (`login`,
//! `firstName`, `email`, ...) in one schema document that can only be read
//! and replaced as a whole. This crate lets many callers manage those
//! properties as independent resources:
//! - writers to the same user type are serialised by a per-scope lock
//! - each write merges one property and passes siblings through untouched
//! - every write is confirmed by polling until a fresh read shows it
//!
//! ## Example
//!
//! ```no_run
//! use userschema::{Client, HttpBackend, Permission, SchemaProperty, SchemaScope};
//!
//! let backend = HttpBackend::new("https://example.okta.com", Some("token".into()));
//! let client = Client::new(backend);
//!
//! let login = SchemaProperty::new("login", "Username", Permission::ReadOnly)
//!     .with_required(true)
//!     .with_pattern("[a-z]+");
//! let result = client.apply(&login, &SchemaScope::Default).unwrap();
//! println!("login {}", result.outcome);
//!
//! let email = client.lookup("email", &SchemaScope::Default).unwrap();
//! assert!(email.is_some());
//! ```
//!
//! ## Deletion
//!
//! The service treats base properties as permanent. [`Client::forget`]
//! succeeds without touching the remote document; callers drop their own
//! record of the property and nothing else changes.

pub mod backend;
pub mod codec;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod importer;
pub mod reconciler;
pub mod retry;
pub mod types;

pub use backend::{HttpBackend, MemoryBackend, RemoteSchemaClient};
pub use coordinator::MutationCoordinator;
pub use document::SchemaDocument;
pub use error::{Error, ErrorCategory, RemoteError, Result};
pub use importer::{ImportId, PropertyImporter};
pub use reconciler::{Outcome, PropertyReconciler, Reconciled};
pub use types::{
    Permission, PropertySpec, PropertyType, ReconcileOptions, RetryConfig, SchemaProperty,
    SchemaScope,
};

/// High-level client for schema property operations.
///
/// Owns a backend and the lock registry for it. Share one client (for
/// example behind an `Arc`) between all threads writing to the same
/// service.
pub struct Client {
    backend: Box<dyn RemoteSchemaClient>,
    coordinator: MutationCoordinator,
    options: ReconcileOptions,
}

impl Client {
    /// Create a client with default retry, polling and timeout settings.
    pub fn new(backend: impl RemoteSchemaClient + 'static) -> Self {
        Self::with_options(backend, ReconcileOptions::default())
    }

    /// Create a client with custom settings.
    pub fn with_options(
        backend: impl RemoteSchemaClient + 'static,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            backend: Box::new(backend),
            coordinator: MutationCoordinator::new(),
            options,
        }
    }

    /// Settings used for every call.
    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Lock registry shared by every `apply` on this client.
    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    /// Create or update a property and wait until it is visible.
    pub fn apply(&self, desired: &SchemaProperty, scope: &SchemaScope) -> Result<Reconciled> {
        PropertyReconciler::new(self.backend.as_ref(), &self.coordinator, &self.options)
            .apply(desired, scope)
    }

    /// Observed state of a property, `None` if the index is absent.
    pub fn lookup(&self, index: &str, scope: &SchemaScope) -> Result<Option<SchemaProperty>> {
        self.importer().lookup(index, scope)
    }

    /// Observed state of a property that must exist.
    pub fn import(&self, id: &ImportId) -> Result<SchemaProperty> {
        self.importer().import(id)
    }

    /// Delete a property, which for base properties means doing nothing.
    ///
    /// Always succeeds and never calls the service. The remote entry keeps
    /// its current state; only the caller's own record should be dropped.
    pub fn forget(&self, index: &str, scope: &SchemaScope) -> Result<()> {
        log::info!("Forgetting property '{index}' in {scope}; the remote schema is left unchanged");
        Ok(())
    }

    fn importer(&self) -> PropertyImporter<'_> {
        PropertyImporter::new(self.backend.as_ref(), &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn fast_client(backend: MemoryBackend) -> Client {
        Client::with_options(
            backend,
            ReconcileOptions {
                fetch_retry: RetryConfig::fixed(3, Duration::from_millis(1)),
                poll: RetryConfig::fixed(5, Duration::from_millis(1)),
                timeout: Some(Duration::from_secs(10)),
            },
        )
    }

    #[test]
    fn test_forget_leaves_remote_unchanged() {
        let backend = MemoryBackend::with_default_schema();
        let client = fast_client(backend.clone());
        let before = backend.document(&SchemaScope::Default).unwrap();

        client.forget("login", &SchemaScope::Default).unwrap();

        assert_eq!(backend.document(&SchemaScope::Default).unwrap(), before);
        assert_eq!(backend.fetch_count(), 0);
        assert_eq!(backend.replace_count(), 0);
        assert!(client.lookup("login", &SchemaScope::Default).unwrap().is_some());
    }

    #[test]
    fn test_apply_then_lookup() {
        let client = fast_client(MemoryBackend::with_default_schema());
        let desired = SchemaProperty::new("mobilePhone", "Mobile", Permission::Hide);

        let applied = client.apply(&desired, &SchemaScope::Default).unwrap();
        let observed = client
            .lookup("mobilePhone", &SchemaScope::Default)
            .unwrap()
            .unwrap();

        assert_eq!(applied.property, observed);
        assert_eq!(client.coordinator().scope_count(), 1);
    }

    #[test]
    fn test_import_by_id() {
        let client = fast_client(MemoryBackend::with_default_schema());
        let id: ImportId = "lastName".parse().unwrap();
        assert_eq!(client.import(&id).unwrap().title, "Last name");
    }

    #[test]
    fn test_different_scopes_write_in_parallel() {
        let backend = MemoryBackend::with_default_schema();
        let scopes: Vec<_> = (0..4)
            .map(|i| SchemaScope::custom(format!("oty{i}")))
            .collect();
        for scope in &scopes {
            backend.seed(scope);
        }
        backend.set_latency(Duration::from_millis(40));
        let client = Arc::new(fast_client(backend));

        let started = Instant::now();
        thread::scope(|s| {
            for scope in &scopes {
                let client = Arc::clone(&client);
                s.spawn(move || {
                    let desired = SchemaProperty::new("title", "Job title", Permission::ReadOnly);
                    client.apply(&desired, scope).unwrap();
                });
            }
        });

        // each apply is three round trips; serialised that would be 480ms
        assert!(
            started.elapsed() < Duration::from_millis(400),
            "scopes were serialised: {:?}",
            started.elapsed()
        );
        assert_eq!(client.coordinator().scope_count(), 4);
    }
}
