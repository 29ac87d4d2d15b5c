//! Read-merge-replace of one property, then poll until the service agrees.

use crate::backend::{self, RemoteSchemaClient};
use crate::codec;
use crate::coordinator::MutationCoordinator;
use crate::error::{Error, Result};
use crate::retry;
use crate::types::{ReconcileOptions, SchemaProperty, SchemaScope};
use std::fmt;
use std::time::Instant;

/// What `apply` did to the remote document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The index was absent and has been inserted.
    Created,
    /// An existing entry was overwritten.
    Updated,
    /// The entry already matched; nothing was written.
    Unchanged,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Result of a successful `apply`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// The property as the service returned it after convergence.
    pub property: SchemaProperty,
    /// What happened.
    pub outcome: Outcome,
}

/// Applies desired property state to the shared schema document.
pub struct PropertyReconciler<'a> {
    client: &'a dyn RemoteSchemaClient,
    coordinator: &'a MutationCoordinator,
    options: &'a ReconcileOptions,
}

impl<'a> PropertyReconciler<'a> {
    /// Create a reconciler over a backend and a shared coordinator.
    ///
    /// Every reconciler writing to the same service must share one
    /// coordinator, or the per-scope exclusion does not hold.
    pub fn new(
        client: &'a dyn RemoteSchemaClient,
        coordinator: &'a MutationCoordinator,
        options: &'a ReconcileOptions,
    ) -> Self {
        Self {
            client,
            coordinator,
            options,
        }
    }

    /// Make `desired` the state of its index in `scope`.
    ///
    /// Sibling properties are left as fetched. Returns once a fresh read
    /// shows the desired state; if it never does within the polling budget
    /// the write may still have landed and [`Error::ConsistencyTimeout`] is
    /// returned.
    pub fn apply(&self, desired: &SchemaProperty, scope: &SchemaScope) -> Result<Reconciled> {
        desired.validate()?;
        let deadline = self.options.deadline();
        let index = desired.index.as_str();

        self.coordinator
            .with_lock(scope, deadline, || self.apply_locked(desired, scope, deadline))
            .map_err(|e| e.with_index(index))
    }

    fn apply_locked(
        &self,
        desired: &SchemaProperty,
        scope: &SchemaScope,
        deadline: Option<Instant>,
    ) -> Result<Reconciled> {
        let index = desired.index.as_str();
        let mut document = backend::fetch_document(
            self.client,
            scope,
            Some(index),
            &self.options.fetch_retry,
            deadline,
        )?;

        let outcome = match document.get(index) {
            Some(current) if desired.is_satisfied_by(current) => {
                log::debug!("Property '{index}' in {scope} is already up to date");
                return Ok(Reconciled {
                    property: current.clone(),
                    outcome: Outcome::Unchanged,
                });
            }
            Some(_) => Outcome::Updated,
            None if document.has_entry(index) => {
                log::warn!("Overwriting undecodable attribute '{index}' in {scope}");
                Outcome::Updated
            }
            None => Outcome::Created,
        };

        document.upsert(desired.clone());
        let encoded = codec::encode(&document);

        log::info!("Replacing schema for {scope} ({outcome} '{index}')");
        self.client
            .replace_document(scope, &encoded)
            .map_err(|source| Error::remote("replace", scope, Some(index), source))?;

        let property = self.await_convergence(desired, scope, deadline)?;
        Ok(Reconciled { property, outcome })
    }

    fn await_convergence(
        &self,
        desired: &SchemaProperty,
        scope: &SchemaScope,
        deadline: Option<Instant>,
    ) -> Result<SchemaProperty> {
        let index = desired.index.as_str();
        let attempts = self.options.poll.attempts();

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.options.poll.delay_for_attempt(attempt - 1);
                if !retry::sleep_within(deadline, delay) {
                    return Err(Error::Timeout {
                        scope: scope.clone(),
                        index: Some(index.to_string()),
                        stage: "poll",
                    });
                }
            }

            let raw = match self.client.fetch_document(scope) {
                Ok(raw) => raw,
                Err(err) if err.is_transient() => {
                    log::debug!("Poll read {} for '{index}' failed: {err}", attempt + 1);
                    continue;
                }
                Err(source) => return Err(Error::remote("poll", scope, Some(index), source)),
            };

            let document = codec::decode(scope, raw)?;
            match document.get(index) {
                Some(observed) if desired.is_satisfied_by(observed) => {
                    log::info!("Property '{index}' in {scope} converged after {} read(s)", attempt + 1);
                    return Ok(observed.clone());
                }
                _ => log::debug!("Property '{index}' in {scope} not yet visible"),
            }
        }

        Err(Error::ConsistencyTimeout {
            scope: scope.clone(),
            index: index.to_string(),
            attempts,
        })
    }
}
