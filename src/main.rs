mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod progress;
mod resource;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_file: cli.file,
    };

    let result = match cli.command {
        Command::Plan(args) => commands::declarative::plan(&ctx, args.target.as_deref()),
        Command::Apply(args) => commands::declarative::apply(
            &ctx,
            args.target.as_deref(),
            args.dry_run,
            args.jobs,
            args.yes,
        ),
        Command::Import { id } => commands::import::import(&ctx, &id),
        Command::Show { index, user_type } => {
            commands::import::show(&ctx, &index, user_type.as_deref())
        }
        Command::Forget { index, user_type } => {
            commands::forget::forget(&ctx, &index, user_type.as_deref())
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "schemactl", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = &result
        && let Some(category) = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<userschema::Error>())
            .map(userschema::Error::category)
        && !ctx.quiet
    {
        ui::error(category.description());
        ui::dim(category.advice());
        if category.is_reinvocable() {
            ui::dim("Re-running the command is safe");
        }
    }

    result
}
