mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod progress;
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
    pub config: Option<PathBuf>,
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
        config: cli.config,
    };

    let result = match cli.command {
        Command::Status => commands::declarative::status(&ctx),
        Command::Diff(args) => commands::declarative::diff(&ctx, &args),
        Command::Apply(args) => commands::declarative::apply(&ctx, &args),
        Command::File(cmd) => commands::file::run(&ctx, cmd),
        Command::Render(args) => commands::render::run(&args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "hvfiles", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(err) = &result
        && let Some(hv) = err.downcast_ref::<hvkit::Error>()
        && !ctx.quiet
    {
        ui::error(hv.category().name());
        ui::dim(hv.category().advice());
        if ctx.verbose > 0 {
            ui::dim(hv.category().description());
        }
    }

    result
}
