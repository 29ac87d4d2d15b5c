//! `forget` - stop managing a property
//!
//! Base properties cannot be deleted from the service, so forgetting only
//! drops the local record. The remote schema is never written.

use anyhow::Result;
use declarative::{ApplyContext, ApplyResult, Resource};
use std::sync::{Arc, Mutex};
use userschema::{Client, SchemaScope};

use super::{build_client, load_config, lock_state, open_state, save_state};
use crate::Context;
use crate::resource::SchemaPropertyResource;
use crate::state::StateStore;
use crate::ui;

pub fn forget(ctx: &Context, index: &str, user_type: Option<&str>) -> Result<()> {
    let config = load_config(ctx)?;
    let client = build_client(&config);
    let state = open_state()?;
    let scope = SchemaScope::from_user_type(user_type);

    match forget_in(&client, &state, &scope, index)? {
        ApplyResult::Removed => {
            save_state(&state)?;
            ui::success(&format!("Forgot {index} ({scope})"));
            if !ctx.quiet {
                ui::dim("The service keeps the property unchanged");
            }
        }
        _ => ui::info(&format!("{index} ({scope}) is not tracked")),
    }
    Ok(())
}

/// Drop the local record of a property, if any
pub fn forget_in(
    client: &Arc<Client>,
    state: &Arc<Mutex<StateStore>>,
    scope: &SchemaScope,
    index: &str,
) -> Result<ApplyResult> {
    let tracked = lock_state(state)
        .get(scope, index)
        .map(|record| record.property.clone());

    let Some(property) = tracked else {
        client.forget(index, scope)?;
        return Ok(ApplyResult::NoChange);
    };

    let resource = SchemaPropertyResource::new(
        scope.clone(),
        property,
        Arc::clone(client),
        Arc::clone(state),
    );
    resource.destroy(&mut ApplyContext::new(false, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use userschema::{ImportId, MemoryBackend};

    #[test]
    fn test_forget_tracked_property() {
        let temp = tempfile::tempdir().unwrap();
        let backend = MemoryBackend::with_default_schema();
        let client = Arc::new(Client::new(backend.clone()));
        let state = Arc::new(Mutex::new(
            StateStore::load(&temp.path().join("state.toml")).unwrap(),
        ));
        let login = client
            .import(&ImportId::new(SchemaScope::Default, "login"))
            .unwrap();
        lock_state(&state).record(&SchemaScope::Default, &login);
        let document = backend.document(&SchemaScope::Default).unwrap();

        let result = forget_in(&client, &state, &SchemaScope::Default, "login").unwrap();

        assert!(matches!(result, ApplyResult::Removed));
        assert_eq!(lock_state(&state).len(), 0);
        assert_eq!(backend.document(&SchemaScope::Default).unwrap(), document);
        assert_eq!(backend.replace_count(), 0);
    }

    #[test]
    fn test_forget_untracked_property() {
        let temp = tempfile::tempdir().unwrap();
        let backend = MemoryBackend::with_default_schema();
        let client = Arc::new(Client::new(backend.clone()));
        let state = Arc::new(Mutex::new(
            StateStore::load(&temp.path().join("state.toml")).unwrap(),
        ));

        let result = forget_in(&client, &state, &SchemaScope::Default, "email").unwrap();

        assert!(matches!(result, ApplyResult::NoChange));
        assert_eq!(backend.fetch_count(), 0);
        assert_eq!(backend.replace_count(), 0);
    }
}
