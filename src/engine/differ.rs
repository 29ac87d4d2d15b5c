//! Diff display - schemactl-specific UI

use colored::Colorize;
use declarative::{DiffSummary, ResourceDiff, ResourceState, group_by_type};
use similar::{ChangeTag, TextDiff};

/// Changed lines between two property renderings
pub fn field_changes(from: &str, to: &str) -> Vec<(ChangeTag, String)> {
    TextDiff::from_lines(from, to)
        .iter_all_changes()
        .filter(|change| change.tag() != ChangeTag::Equal)
        .map(|change| (change.tag(), change.to_string().trim_end().to_string()))
        .collect()
}

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} Schema is up to date", "✓".green());
        return;
    }

    let mut by_type: Vec<_> = group_by_type(diffs).into_iter().collect();
    by_type.sort_by(|a, b| a.0.cmp(&b.0));

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Schema Diff".bold()
    );
    println!("│");

    for (resource_type, type_diffs) in &by_type {
        let type_name = match resource_type.as_str() {
            "schema_property" => "Base properties",
            other => other,
        };
        println!("│ {}", type_name.bold());

        for diff in type_diffs {
            display_entry(diff);
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to create, {} to update, {} unreadable)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.unknown.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn display_entry(diff: &ResourceDiff) {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, ResourceState::Present { details }) => {
            println!("│   {} {}", "+".green(), diff.resource_id);
            for line in details.as_deref().unwrap_or_default().lines() {
                println!("│       {}", line.green());
            }
        }
        (ResourceState::Modified { from, to }, _) => {
            println!("│   {} {}", "~".yellow(), diff.resource_id);
            for (tag, line) in field_changes(from, to) {
                match tag {
                    ChangeTag::Delete => println!("│       {}", format!("- {line}").red()),
                    ChangeTag::Insert => println!("│       {}", format!("+ {line}").green()),
                    ChangeTag::Equal => {}
                }
            }
        }
        (ResourceState::Unknown, _) => {
            println!(
                "│   {} {:<30} {}",
                "?".red(),
                diff.resource_id,
                "(current state could not be read)".dimmed()
            );
        }
        _ => {
            println!("│   {} {}", "?".dimmed(), diff.resource_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_changes_only_reports_changed_lines() {
        let from = "title: Username\nrequired: true\npermissions: READ_WRITE\n";
        let to = "title: Username\nrequired: true\npermissions: READ_ONLY\n";

        let changes = field_changes(from, to);
        assert_eq!(
            changes,
            vec![
                (ChangeTag::Delete, "permissions: READ_WRITE".to_string()),
                (ChangeTag::Insert, "permissions: READ_ONLY".to_string()),
            ]
        );
    }

    #[test]
    fn test_field_changes_identical() {
        assert!(field_changes("title: A\n", "title: A\n").is_empty());
    }
}
