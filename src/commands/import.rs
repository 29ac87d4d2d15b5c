//! Reading properties from the service: `import` and `show`

use anyhow::{Context as _, Result};
use userschema::{Client, ImportId, SchemaProperty, SchemaScope};

use super::{build_client, load_config, open_state, save_state};
use crate::Context;
use crate::progress;
use crate::state::StateStore;
use crate::ui;

/// Look up an existing property and start tracking it
pub fn import(ctx: &Context, id: &str) -> Result<()> {
    let id: ImportId = id.parse()?;
    let config = load_config(ctx)?;
    let client = build_client(&config);
    let state = open_state()?;

    let spinner = progress::spinner(&format!("Reading {id}"));
    let result = import_into(&client, &mut super::lock_state(&state), &id);
    spinner.finish_and_clear();
    let property = result?;

    save_state(&state)?;

    ui::success(&format!("Imported {id}"));
    if !ctx.quiet {
        ui::property(&property);
    }
    Ok(())
}

/// Print a property as JSON
pub fn show(ctx: &Context, index: &str, user_type: Option<&str>) -> Result<()> {
    let config = load_config(ctx)?;
    let client = build_client(&config);
    let id = ImportId::new(SchemaScope::from_user_type(user_type), index);

    let property = client.import(&id)?;
    println!("{}", render_json(&property)?);
    Ok(())
}

/// Fetch a property that must exist and record it in `store`
pub fn import_into(client: &Client, store: &mut StateStore, id: &ImportId) -> Result<SchemaProperty> {
    let property = client
        .import(id)
        .with_context(|| format!("Failed to import {id}"))?;
    store.record(&id.scope, &property);
    Ok(property)
}

fn render_json(property: &SchemaProperty) -> Result<String> {
    serde_json::to_string_pretty(property).context("Failed to render property as JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use userschema::{MemoryBackend, Permission};

    #[test]
    fn test_import_records_property() {
        let temp = tempfile::tempdir().unwrap();
        let client = Client::new(MemoryBackend::with_default_schema());
        let mut store = StateStore::load(&temp.path().join("state.toml")).unwrap();

        let id: ImportId = "email".parse().unwrap();
        let property = import_into(&client, &mut store, &id).unwrap();

        assert_eq!(property.title, "Primary email");
        let record = store.get(&SchemaScope::Default, "email").unwrap();
        assert_eq!(record.property.permissions, Permission::ReadWrite);
    }

    #[test]
    fn test_import_missing_property_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let client = Client::new(MemoryBackend::with_default_schema());
        let mut store = StateStore::load(&temp.path().join("state.toml")).unwrap();

        let id: ImportId = "nickName".parse().unwrap();
        let err = import_into(&client, &mut store, &id).unwrap_err();

        assert!(format!("{err:#}").contains("nickName"));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_render_json_keeps_unmanaged_fields() {
        let client = Client::new(MemoryBackend::with_default_schema());
        let login = client
            .import(&ImportId::new(SchemaScope::Default, "login"))
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&render_json(&login).unwrap()).unwrap();
        assert_eq!(json["index"], "login");
        assert_eq!(json["permissions"], "READ_WRITE");
        assert_eq!(json["extra"]["minLength"], 5);
    }
}
