//! Schema property resource

use anyhow::{Context, Result};
use std::fmt;
use std::sync::{Arc, Mutex};
use userschema::{Client, ImportId, Outcome, SchemaProperty, SchemaScope};

use super::{ApplyContext, ApplyResult, Resource, ResourceState};
use crate::commands::lock_state;
use crate::state::StateStore;
use crate::ui::property_lines;

/// One base property of one user type
pub struct SchemaPropertyResource {
    scope: SchemaScope,
    desired: SchemaProperty,
    client: Arc<Client>,
    state: Arc<Mutex<StateStore>>,
}

impl SchemaPropertyResource {
    pub fn new(
        scope: SchemaScope,
        desired: SchemaProperty,
        client: Arc<Client>,
        state: Arc<Mutex<StateStore>>,
    ) -> Self {
        Self {
            scope,
            desired,
            client,
            state,
        }
    }

    fn index(&self) -> &str {
        &self.desired.index
    }
}

impl fmt::Debug for SchemaPropertyResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaPropertyResource")
            .field("scope", &self.scope)
            .field("desired", &self.desired)
            .finish_non_exhaustive()
    }
}

impl Resource for SchemaPropertyResource {
    fn id(&self) -> String {
        ImportId::new(self.scope.clone(), self.desired.index.clone()).to_string()
    }

    fn description(&self) -> String {
        format!("{} ({})", self.desired.summary(), self.scope)
    }

    fn resource_type(&self) -> &'static str {
        "schema_property"
    }

    fn current_state(&self) -> Result<ResourceState> {
        let observed = self
            .client
            .lookup(self.index(), &self.scope)
            .with_context(|| format!("Failed to read property '{}'", self.id()))?;

        Ok(match observed {
            None => ResourceState::Absent,
            Some(observed) if self.desired.is_satisfied_by(&observed) => self.desired_state(),
            Some(observed) => ResourceState::Modified {
                from: property_lines(&observed),
                to: property_lines(&self.desired),
            },
        })
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some(property_lines(&self.desired)),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        let reconciled = self
            .client
            .apply(&self.desired, &self.scope)
            .with_context(|| format!("Failed to apply property '{}'", self.id()))?;

        lock_state(&self.state).record(&self.scope, &reconciled.property);

        if ctx.verbose {
            log::info!("{}: {}", self.id(), reconciled.outcome);
        }

        Ok(match reconciled.outcome {
            Outcome::Created => ApplyResult::Created,
            Outcome::Updated => ApplyResult::Modified,
            Outcome::Unchanged => ApplyResult::NoChange,
        })
    }

    fn destroy(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        self.client.forget(self.index(), &self.scope)?;

        if lock_state(&self.state).forget(&self.scope, self.index()) {
            Ok(ApplyResult::Removed)
        } else {
            Ok(ApplyResult::NoChange)
        }
    }
}
