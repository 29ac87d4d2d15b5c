use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "schemactl")]
#[command(version)]
#[command(about = "Declaratively manage user schema base properties", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: <config dir>/schema.toml)
    #[arg(short, long, global = true, env = "SCHEMACTL_CONFIG")]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show which properties would be created or updated
    Plan(PlanArgs),

    /// Make the service's schema match the config
    Apply(ApplyArgs),

    /// Record an existing property in local state
    Import {
        /// Property id: `<index>` or `<userTypeId>.<index>`
        id: String,
    },

    /// Print a property as the service reports it
    Show {
        /// Property index, e.g. `login`
        index: String,

        /// User type id (default user type if omitted)
        #[arg(short, long)]
        user_type: Option<String>,
    },

    /// Stop tracking a property; the service keeps it unchanged
    Forget {
        /// Property index, e.g. `login`
        index: String,

        /// User type id (default user type if omitted)
        #[arg(short, long)]
        user_type: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Only plan matching properties, e.g. `schema.login`
    pub target: Option<String>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only apply matching properties, e.g. `schema.login`
    pub target: Option<String>,

    /// Dry run - show what would be changed
    #[arg(short, long)]
    pub dry_run: bool,

    /// Number of parallel jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
