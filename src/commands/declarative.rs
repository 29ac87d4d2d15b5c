//! Declarative commands
//!
//! - `plan` - Preview what apply would change
//! - `apply` - Make the service's schema match the config

use anyhow::Result;
use colored::Colorize;
use declarative::{DiffSummary, compute_diffs};

use super::{build_client, load_config, lock_state, open_state, save_state};
use crate::Context;
use crate::engine::{self, ExecuteOptions, differ};
use crate::ui;

/// Show the difference between the config and the service
pub fn plan(ctx: &Context, target: Option<&str>) -> Result<()> {
    let config = load_config(ctx)?;
    let client = build_client(&config);
    let state = open_state()?;
    let plan = engine::build_plan(&config, &client, &state, target)?;

    if plan.is_empty() {
        ui::warn("No properties match");
        return Ok(());
    }

    if !ctx.quiet {
        ui::header(&format!(
            "Planning {} schema properties",
            plan.total_resources()
        ));
    }

    let mut diffs = compute_diffs(&plan.parallel);
    diffs.extend(compute_diffs(&plan.sequential));
    differ::display_diff(&diffs);

    let summary = DiffSummary::from_diffs(&diffs);
    if summary.has_changes() {
        println!();
        println!(
            "  {} Run {} to make these changes",
            "→".cyan(),
            "schemactl apply".bold()
        );
    }

    if summary.unknown > 0 {
        anyhow::bail!("{} properties could not be read", summary.unknown);
    }
    Ok(())
}

/// Reconcile every declared property with the service
pub fn apply(
    ctx: &Context,
    target: Option<&str>,
    dry_run: bool,
    jobs: usize,
    yes: bool,
) -> Result<()> {
    let config = load_config(ctx)?;
    let client = build_client(&config);
    let state = open_state()?;
    let plan = engine::build_plan(&config, &client, &state, target)?;

    if plan.is_empty() {
        ui::warn("No properties match");
        return Ok(());
    }

    if !ctx.quiet {
        ui::header(&format!("Applying {}", config.service.org_url));
    }

    let summary = engine::execute(
        plan,
        ExecuteOptions {
            dry_run,
            jobs,
            yes,
            verbose: ctx.verbose > 0,
        },
    )?;

    if summary.total_changes() + summary.no_change > 0 {
        save_state(&state)?;
        let store = lock_state(&state);
        log::debug!(
            "Tracking {} properties in {}",
            store.len(),
            store.path().display()
        );
    }

    if !summary.is_success() {
        anyhow::bail!("{} properties failed to apply", summary.failed);
    }
    Ok(())
}
