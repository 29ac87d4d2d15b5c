//! Execution planner - turns the config into resources

use anyhow::Result;
use declarative::ExecutionPlan;
use std::sync::{Arc, Mutex};
use userschema::Client;

use crate::config::SchemaConfig;
use crate::resource::SchemaPropertyResource;
use crate::state::StateStore;

/// Build a plan with one resource per declared property
///
/// Every resource shares `client`, so writes to one user type are
/// serialised by its lock registry while other user types proceed.
pub fn build_plan(
    config: &SchemaConfig,
    client: &Arc<Client>,
    state: &Arc<Mutex<StateStore>>,
    target: Option<&str>,
) -> Result<ExecutionPlan> {
    let mut plan = ExecutionPlan::new();

    for (scope, desired) in config.desired_properties()? {
        plan.add_resource(Box::new(SchemaPropertyResource::new(
            scope,
            desired,
            Arc::clone(client),
            Arc::clone(state),
        )));
    }

    let plan = plan.filter_by_target(target);
    log::debug!("Planned {} schema properties", plan.total_resources());
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Resource;
    use userschema::MemoryBackend;

    const CONFIG: &str = r#"
[service]
org_url = "https://example.okta.com"

[[property]]
index = "login"
title = "Username"
required = true
permissions = "READ_ONLY"

[[property]]
index = "email"
title = "Primary email"
required = true
permissions = "READ_ONLY"

[[property]]
index = "login"
title = "Username"
permissions = "HIDE"
user_type = "oty1contractor"
"#;

    fn fixture() -> (SchemaConfig, Arc<Client>, Arc<Mutex<StateStore>>, tempfile::TempDir) {
        let temp = tempfile::tempdir().unwrap();
        let config = SchemaConfig::parse(CONFIG).unwrap();
        let client = Arc::new(Client::new(MemoryBackend::with_default_schema()));
        let state = StateStore::load(&temp.path().join("state.toml")).unwrap();
        (config, client, Arc::new(Mutex::new(state)), temp)
    }

    #[test]
    fn test_one_resource_per_property() {
        let (config, client, state, _temp) = fixture();
        let plan = build_plan(&config, &client, &state, None).unwrap();

        let ids: Vec<_> = plan.resources().map(|r| r.id()).collect();
        assert_eq!(ids, ["login", "email", "oty1contractor.login"]);
        assert!(plan.sequential.is_empty());
    }

    #[test]
    fn test_target_filter() {
        let (config, client, state, _temp) = fixture();

        let plan = build_plan(&config, &client, &state, Some("schema.login")).unwrap();
        assert_eq!(plan.total_resources(), 2);

        let plan = build_plan(&config, &client, &state, Some("schema.oty1contractor.login")).unwrap();
        assert_eq!(plan.total_resources(), 1);
    }

    #[test]
    fn test_invalid_config_fails_planning() {
        let (_, client, state, _temp) = fixture();
        let config = SchemaConfig::parse(
            "[service]\norg_url = \"https://example.okta.com\"\n\n[[property]]\nindex = \"email\"\n",
        )
        .unwrap();

        assert!(build_plan(&config, &client, &state, None).is_err());
    }
}
