//! Execution engine - schemactl-specific executor with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{ConfirmCallback, ExecutionPlan, ExecuteSummary, compute_diffs};

use super::differ::display_diff;
use crate::progress::BarProgress;

/// Options for execution (schemactl-specific, includes `yes` for confirmation skip)
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            yes: false,
            verbose: false,
        }
    }
}

/// Asks on the terminal unless `--yes` was given
struct PromptConfirm {
    assume_yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }

        let confirmed = dialoguer::Confirm::new()
            .with_prompt(message)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

/// Show the diff, confirm, and apply the plan
pub fn execute(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<ExecuteSummary> {
    let mut diffs = compute_diffs(&plan.parallel);
    diffs.extend(compute_diffs(&plan.sequential));

    display_diff(&diffs);

    if diffs.is_empty() {
        return Ok(ExecuteSummary::default());
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(ExecuteSummary::default());
    }

    println!();
    println!(
        "  {} Applying {} schema properties...",
        "→".cyan(),
        plan.total_resources()
    );

    let mut progress = BarProgress::new();
    let mut confirm = PromptConfirm {
        assume_yes: opts.yes,
    };
    let summary = declarative::execute(
        plan,
        declarative::ExecuteOptions {
            dry_run: false,
            jobs: opts.jobs.max(1),
            verbose: opts.verbose,
        },
        &mut progress,
        &mut confirm,
    )?;

    if summary.total() == summary.skipped && summary.skipped > 0 {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(summary);
    }

    print_summary(&summary);
    Ok(summary)
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Schema applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Schema applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} properties created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} properties updated", summary.modified);
    }
    if summary.no_change > 0 {
        println!("    • {} properties already up to date", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} properties skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "properties".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;
    use crate::engine::build_plan;
    use crate::state::StateStore;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use userschema::{
        Client, MemoryBackend, Permission, ReconcileOptions, RetryConfig, SchemaScope,
    };

    const CONFIG: &str = r#"
[service]
org_url = "https://example.okta.com"

[[property]]
index = "login"
title = "Username"
required = true
permissions = "READ_ONLY"
pattern = ".+"

[[property]]
index = "firstName"
title = "First name"
required = true
permissions = "HIDE"

[[property]]
index = "lastName"
title = "Last name"
required = true
permissions = "READ_ONLY"

[[property]]
index = "email"
title = "Primary email"
required = true
permissions = "READ_ONLY"

[[property]]
index = "mobilePhone"
title = "Mobile phone"
permissions = "HIDE"
"#;

    fn client(backend: &MemoryBackend) -> Arc<Client> {
        Arc::new(Client::with_options(
            backend.clone(),
            ReconcileOptions {
                fetch_retry: RetryConfig::fixed(3, Duration::from_millis(1)),
                poll: RetryConfig::fixed(5, Duration::from_millis(1)),
                timeout: Some(Duration::from_secs(10)),
            },
        ))
    }

    #[test]
    fn test_apply_many_properties_of_one_user_type() {
        let temp = tempfile::tempdir().unwrap();
        let backend = MemoryBackend::with_default_schema();
        backend.set_latency(Duration::from_millis(2));
        let client = client(&backend);
        let state = Arc::new(Mutex::new(
            StateStore::load(&temp.path().join("state.toml")).unwrap(),
        ));
        let config = SchemaConfig::parse(CONFIG).unwrap();

        let plan = build_plan(&config, &client, &state, None).unwrap();
        let summary = execute(
            plan,
            ExecuteOptions {
                yes: true,
                jobs: 5,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(summary.modified, 5);
        assert!(summary.is_success());
        assert_eq!(state.lock().unwrap().len(), 5);

        for (scope, desired) in config.desired_properties().unwrap() {
            let observed = client.lookup(&desired.index, &scope).unwrap().unwrap();
            assert!(desired.is_satisfied_by(&observed), "{} lost", desired.index);
        }

        // second run has nothing to do
        let replaces = backend.replace_count();
        let plan = build_plan(&config, &client, &state, None).unwrap();
        let summary = execute(
            plan,
            ExecuteOptions {
                yes: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(summary.total(), 0);
        assert_eq!(backend.replace_count(), replaces);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let backend = MemoryBackend::with_default_schema();
        let client = client(&backend);
        let state = Arc::new(Mutex::new(
            StateStore::load(&temp.path().join("state.toml")).unwrap(),
        ));
        let config = SchemaConfig::parse(CONFIG).unwrap();

        let plan = build_plan(&config, &client, &state, None).unwrap();
        let summary = execute(
            plan,
            ExecuteOptions {
                dry_run: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(summary.total(), 0);
        assert_eq!(backend.replace_count(), 0);
        let login = client.lookup("login", &SchemaScope::Default).unwrap().unwrap();
        assert_eq!(login.permissions, Permission::ReadWrite);
    }
}
