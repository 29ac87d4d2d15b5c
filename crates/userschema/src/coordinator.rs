//! Per-scope mutual exclusion for schema writers.
//!
//! The service does not merge concurrent whole-document replacements: the
//! last writer silently wins. Every fetch-merge-replace cycle therefore runs
//! under the lock of its scope. Scopes are independent, so writers to
//! different user types still run in parallel.

use crate::error::{Error, Result};
use crate::types::SchemaScope;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Keyed registry of scope locks.
///
/// Locks are created on first use and kept for the life of the registry.
/// There is exactly one lock object per scope.
#[derive(Debug, Default)]
pub struct MutationCoordinator {
    locks: Mutex<HashMap<SchemaScope, Arc<Mutex<()>>>>,
}

impl MutationCoordinator {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `scope`.
    ///
    /// Blocks until the lock is free, or until `deadline` passes, in which
    /// case `f` is not run and a timeout is returned. The lock is released
    /// on every exit path, including errors and panics inside `f`, and
    /// `f`'s result is returned unchanged.
    pub fn with_lock<T, F>(&self, scope: &SchemaScope, deadline: Option<Instant>, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock = self.lock_for(scope);

        let _guard = match deadline {
            None => lock.lock(),
            Some(deadline) => lock.try_lock_until(deadline).ok_or_else(|| {
                log::warn!("Gave up waiting for the schema lock of {scope}");
                Error::Timeout {
                    scope: scope.clone(),
                    index: None,
                    stage: "lock",
                }
            })?,
        };
        log::debug!("Acquired schema lock for {scope}");

        f()
    }

    /// Number of scopes that have a lock.
    pub fn scope_count(&self) -> usize {
        self.locks.lock().len()
    }

    fn lock_for(&self, scope: &SchemaScope) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(scope.clone()).or_insert_with(|| {
            log::debug!("Creating schema lock for {scope}");
            Arc::new(Mutex::new(()))
        }))
    }
}
