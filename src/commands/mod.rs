//! Command implementations
//!
//! - `plan` / `apply` - declarative reconciliation of the config file
//! - `import` / `show` - read properties from the service
//! - `forget` - drop a property from local state

pub mod declarative;
pub mod forget;
pub mod import;

use anyhow::Result;
use std::sync::{Arc, Mutex, MutexGuard};
use userschema::{Client, HttpBackend};

use crate::Context;
use crate::config::SchemaConfig;
use crate::paths;
use crate::state::StateStore;

/// Load the config file selected by `--file` or the default location
pub fn load_config(ctx: &Context) -> Result<SchemaConfig> {
    let path = paths::config_file(ctx.config_file.as_deref())?;
    SchemaConfig::load(&path)
}

/// Build a client for the configured service
pub fn build_client(config: &SchemaConfig) -> Arc<Client> {
    let backend = HttpBackend::new(config.service.org_url.clone(), config.api_token());
    Arc::new(Client::with_options(
        backend,
        config.retry.reconcile_options(),
    ))
}

/// Open the local state store for sharing between resources
pub fn open_state() -> Result<Arc<Mutex<StateStore>>> {
    Ok(Arc::new(Mutex::new(StateStore::load_default()?)))
}

/// Lock shared state, recovering from a poisoned mutex
pub fn lock_state(state: &Mutex<StateStore>) -> MutexGuard<'_, StateStore> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Write shared state back to disk
pub fn save_state(state: &Mutex<StateStore>) -> Result<()> {
    lock_state(state).save()
}
