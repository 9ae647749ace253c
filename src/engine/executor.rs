//! Execution engine: apply a plan with parallelism and UI integration

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use hvkit::{Client, FileResource};
use rayon::prelude::*;

use crate::progress;
use crate::state::{FileRecord, FilesState};
use crate::ui;

use super::differ::display_diff;
use super::planner::{Action, ExecutionPlan, PlannedChange};

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Hide progress output
    pub quiet: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            yes: false,
            quiet: false,
        }
    }
}

/// Outcome of applying one change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    NoChange,
    Created,
    Modified,
    Removed,
    Skipped { reason: String },
    Failed { error: String },
}

/// Summary of execution results
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// What to write back to state after a change
#[derive(Debug)]
enum StateUpdate {
    Keep,
    Record(FileRecord),
    Forget,
}

/// Execute the plan, updating `state` with what the host reports back.
///
/// The caller persists `state` afterwards.
pub fn execute(
    client: &Client,
    plan: &ExecutionPlan,
    state: &mut FilesState,
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary> {
    display_diff(plan);

    // refreshed reads of unchanged resources still go back into state
    record_unchanged(plan, state);

    if plan.is_empty() {
        return Ok(ExecuteSummary {
            no_change: plan.changes.len(),
            ..Default::default()
        });
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(ExecuteSummary::default());
    }

    if !opts.yes && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(ExecuteSummary {
            skipped: plan.pending_count(),
            ..Default::default()
        });
    }

    println!();
    println!(
        "  {} Applying {} file resources on {}...",
        "→".cyan(),
        plan.pending_count(),
        client.executor_name()
    );

    let pending: Vec<&PlannedChange> = plan.pending().collect();
    let results = execute_parallel(client, &pending, opts)?;

    let mut summary = ExecuteSummary {
        no_change: plan.changes.len() - pending.len(),
        ..Default::default()
    };

    for (change, (result, update)) in pending.iter().zip(results) {
        match update {
            StateUpdate::Keep => {}
            StateUpdate::Record(record) => state.record(&change.key, record),
            StateUpdate::Forget => {
                state.forget(&change.key);
            }
        }
        match &result {
            ApplyResult::Failed { error } => ui::error(&format!("files.{}: {error}", change.key)),
            ApplyResult::Skipped { reason } => ui::warn(&format!("files.{}: {reason}", change.key)),
            _ => {}
        }
        merge_summary(&mut summary, &result);
    }

    print_summary(&summary);

    Ok(summary)
}

/// Apply changes on a pool of `opts.jobs` threads, keeping input order.
fn execute_parallel(
    client: &Client,
    changes: &[&PlannedChange],
    opts: &ExecuteOptions,
) -> Result<Vec<(ApplyResult, StateUpdate)>> {
    let pb = progress::bar(changes.len() as u64, "Applying", opts.quiet);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .context("Failed to create apply thread pool")?;

    let results = pool.install(|| {
        changes
            .par_iter()
            .map(|change| {
                let outcome = apply_change(client, change);

                let symbol = match &outcome.0 {
                    ApplyResult::NoChange => "○",
                    ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓",
                    ApplyResult::Failed { .. } => "✗",
                    ApplyResult::Skipped { .. } => "⊘",
                };
                pb.set_message(format!("{symbol} {}", change.key));
                pb.inc(1);

                outcome
            })
            .collect()
    });

    pb.finish_and_clear();
    Ok(results)
}

/// Apply one change through the reconciler.
fn apply_change(client: &Client, change: &PlannedChange) -> (ApplyResult, StateUpdate) {
    let outcome = match (change.action, &change.desired) {
        (Action::NoChange, _) => return (ApplyResult::NoChange, StateUpdate::Keep),
        (Action::Create, Some(spec)) => client
            .create(&spec.path, &spec.source)
            .map(|file| (ApplyResult::Created, applied(&spec.path, &spec.source, &file))),
        (Action::Update(file_change), Some(spec)) => client
            .update(&spec.path, &spec.source, file_change)
            .map(|file| (ApplyResult::Modified, applied(&spec.path, &spec.source, &file))),
        (Action::Delete, _) => client
            .delete(change.path())
            .map(|()| (ApplyResult::Removed, StateUpdate::Forget)),
        (Action::Create | Action::Update(_), None) => {
            return (
                ApplyResult::Skipped {
                    reason: "no declared state".to_string(),
                },
                StateUpdate::Keep,
            );
        }
    };

    match outcome {
        Ok(done) => done,
        Err(err) => {
            log::warn!("files.{} failed: {err}", change.key);
            (
                ApplyResult::Failed {
                    error: format!("{err} ({})", err.category().advice()),
                },
                StateUpdate::Keep,
            )
        }
    }
}

fn applied(path: &str, source: &str, file: &FileResource) -> StateUpdate {
    if !file.exists {
        log::warn!("{path} is still absent after apply");
    }
    StateUpdate::Record(FileRecord::observed(path, source, file).applied_now())
}

/// Write refreshed attributes of unchanged resources back to state
fn record_unchanged(plan: &ExecutionPlan, state: &mut FilesState) {
    for change in &plan.changes {
        if change.action != Action::NoChange {
            continue;
        }
        if let (Some(record), Some(observed)) = (&change.record, &change.observed) {
            let mut refreshed = FileRecord::observed(&record.path, &record.source, observed);
            refreshed.last_applied = record.last_applied;
            state.record(&change.key, refreshed);
        }
    }
}

/// Merge one result into the summary
fn merge_summary(summary: &mut ExecuteSummary, result: &ApplyResult) {
    match result {
        ApplyResult::NoChange => summary.no_change += 1,
        ApplyResult::Created => summary.created += 1,
        ApplyResult::Modified => summary.modified += 1,
        ApplyResult::Removed => summary.removed += 1,
        ApplyResult::Failed { .. } => summary.failed += 1,
        ApplyResult::Skipped { .. } => summary.skipped += 1,
    }
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

fn print_summary(summary: &ExecuteSummary) {
    println!();
    println!(
        "  {} {} created, {} updated, {} removed, {} unchanged",
        if summary.is_success() {
            "✓".green()
        } else {
            "✗".red()
        },
        summary.created,
        summary.modified,
        summary.removed,
        summary.no_change
    );
    if summary.failed > 0 {
        println!("  {} {} failed", "✗".red(), summary.failed);
    }
    if summary.skipped > 0 {
        println!("  {} {} skipped", "⊘".dimmed(), summary.skipped);
    }
}
