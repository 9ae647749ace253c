//! Declarative commands for hvfiles
//!
//! - `status` - Show declared and recorded resources with their host state
//! - `diff` - Preview what apply would change
//! - `apply` - Make the host match the config

use anyhow::{Result, bail};
use colored::Colorize;

use crate::Context;
use crate::cli::{ApplyArgs, PlanArgs};
use crate::engine::{self, Action, ExecuteOptions, ExecutionPlan};
use crate::state::FilesState;
use crate::ui;

const STATUS_JOBS: usize = 4;

pub fn status(ctx: &Context) -> Result<()> {
    let config = super::load_config(ctx)?;
    let client = super::connect(&config)?;
    let state = FilesState::load()?;

    if config.files.is_empty() && state.files.is_empty() {
        ui::info("No file resources declared");
        return Ok(());
    }

    let plan = engine::plan(&client, &config, &state, STATUS_JOBS)?;

    ui::header("File Resources");
    for line in status_lines(&plan) {
        println!("  {line}");
    }
    println!();
    ui::dim(&format!(
        "State updated {}",
        state.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    Ok(())
}

/// One line per resource: symbol, key, path and what the host reported.
fn status_lines(plan: &ExecutionPlan) -> Vec<String> {
    plan.changes
        .iter()
        .map(|change| {
            let (symbol, detail) = match (&change.action, &change.observed) {
                (Action::Create, _) => ("+".green(), "not applied".to_string()),
                (Action::Delete, _) => ("-".red(), "no longer declared".to_string()),
                (_, Some(file)) if file.exists => {
                    let symbol = if change.action.is_change() {
                        "~".yellow()
                    } else {
                        "✓".green()
                    };
                    let mut detail = ui::format_size(file.size);
                    if change.drifted() {
                        detail.push_str(", changed on host");
                    }
                    (symbol, detail)
                }
                _ => ("✗".red(), "missing on host".to_string()),
            };
            format!(
                "{} {:<20} {} {}",
                symbol,
                change.key,
                ui::truncate_path(change.path(), 48),
                format!("({detail})").dimmed()
            )
        })
        .collect()
}

pub fn diff(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let config = super::load_config(ctx)?;
    let client = super::connect(&config)?;
    let state = FilesState::load()?;

    let plan = engine::plan(&client, &config, &state, usize::from(args.jobs))?;
    engine::differ::display_diff(&plan);

    Ok(())
}

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let config = super::load_config(ctx)?;
    let client = super::connect(&config)?;
    let mut state = FilesState::load()?;

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: usize::from(args.jobs),
        yes: args.yes,
        quiet: ctx.quiet,
    };

    let plan = engine::plan(&client, &config, &state, opts.jobs)?;
    let summary = engine::execute(&client, &plan, &mut state, &opts)?;

    if !opts.dry_run {
        state.save()?;
    }

    if !summary.is_success() {
        bail!("{} file resources failed to apply", summary.failed);
    }

    Ok(())
}
