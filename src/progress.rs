//! Progress indicators for the schemactl CLI.

use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a progress bar with the standard style
pub fn bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Create a spinner for a single remote call
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Symbol for a finished resource
pub fn result_symbol(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::NoChange => "○",
        ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓",
        ApplyResult::Failed { .. } => "✗",
        ApplyResult::Skipped { .. } => "⊘",
    }
}

/// Drives an indicatif bar from executor callbacks
///
/// Failures are collected and printed once the bar is cleared.
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
    failures: Vec<(String, String)>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize, parallel: bool) {
        let label = if parallel { "Applying" } else { "Applying sequentially" };
        self.bar = Some(bar(count as u64, label));
    }

    fn on_resource_start(&mut self, id: &str, _description: &str) {
        if let Some(pb) = &self.bar {
            pb.set_message(id.to_string());
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        if let ApplyResult::Failed { error } = result {
            self.failures.push((id.to_string(), error.clone()));
        }
        if let Some(pb) = &self.bar {
            pb.set_message(format!("{} {}", result_symbol(result), id));
            pb.inc(1);
        }
    }

    fn on_batch_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
        for (id, error) in &self.failures {
            eprintln!("  {} {}: {}", "✗".red(), id, error);
        }
    }
}
