//! `hvfiles file` - single reconciler operations against the host

use anyhow::{Context as AnyhowContext, Result};
use hvkit::{Client, FileChange, FileResource};

use crate::Context;
use crate::cli::FileCommand;
use crate::engine::differ::collateral_pattern;
use crate::ui;

pub fn run(ctx: &Context, cmd: FileCommand) -> Result<()> {
    let config = super::load_config(ctx)?;
    let client = super::connect(&config)?;

    match cmd {
        FileCommand::Create { path, source } => {
            let file = client.create(&path, &source)?;
            print_resource(ctx, &file);
        }
        FileCommand::Read { path, json } => {
            let file = client.read(&path)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&file).context("Failed to serialize resource")?
                );
            } else {
                print_resource(ctx, &file);
            }
        }
        FileCommand::Update {
            path,
            source,
            previous_path,
            previous_source,
        } => {
            let change = detect_change(
                &client,
                &path,
                &source,
                previous_path.as_deref(),
                previous_source.as_deref(),
            )?;
            let file = client.update(&path, &source, change)?;
            print_resource(ctx, &file);
        }
        FileCommand::Delete { path, yes } => {
            if let Some(pattern) = collateral_pattern(&path)
                && !ctx.quiet
            {
                ui::warn(&format!("This removes every file matching {pattern}"));
            }
            if !yes && !confirm(&format!("Delete {path}?"))? {
                ui::info("Aborted");
                return Ok(());
            }
            client.delete(&path)?;
            if !ctx.quiet {
                ui::success(&format!("Deleted {path}"));
            }
        }
    }

    Ok(())
}

/// Work out what changed since the previous apply.
///
/// Prior existence is read from the host at the previous path.
pub fn detect_change(
    client: &Client,
    path: &str,
    source: &str,
    previous_path: Option<&str>,
    previous_source: Option<&str>,
) -> Result<FileChange> {
    let prior_path = previous_path.unwrap_or(path);
    let prior = client
        .read(prior_path)
        .with_context(|| format!("Failed to read {prior_path}"))?;

    Ok(FileChange {
        prior_exists: prior.exists,
        path_changed: previous_path.is_some_and(|p| p != path),
        source_changed: previous_source.is_some_and(|s| s != source),
    })
}

fn print_resource(ctx: &Context, file: &FileResource) {
    if ctx.quiet {
        return;
    }

    ui::header(&file.path);
    if !file.exists {
        ui::dim("not found");
        return;
    }

    ui::kv("name", &file.name);
    ui::kv("size", &ui::format_size(file.size));
    ui::kv("directory", &file.directory_name);
    if !file.source.is_empty() {
        ui::kv("source", &file.source);
    }
    ui::kv("created", &file.creation_time);
    ui::kv("modified", &file.last_write_time);
}

fn confirm(prompt: &str) -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hvkit::backend::memory::MemoryHost;
    use std::sync::Arc;

    fn client(host: &Arc<MemoryHost>) -> Client {
        Client::new(Box::new(Arc::clone(host))).unwrap()
    }

    #[test]
    fn test_detect_change_without_history() {
        let host = Arc::new(MemoryHost::new().with_file(r"C:\vm\a.iso", 1));
        let change = detect_change(&client(&host), r"C:\vm\a.iso", "https://e/a.iso", None, None)
            .unwrap();
        assert_eq!(
            change,
            FileChange {
                prior_exists: true,
                path_changed: false,
                source_changed: false,
            }
        );
        assert!(!change.requires_recreate());
    }

    #[test]
    fn test_detect_change_reads_previous_path() {
        let host = Arc::new(MemoryHost::new().with_file(r"C:\vm\old.iso", 1));
        let change = detect_change(
            &client(&host),
            r"C:\vm\new.iso",
            "https://e/a.iso",
            Some(r"C:\vm\old.iso"),
            Some("https://e/a.iso"),
        )
        .unwrap();
        assert!(change.prior_exists);
        assert!(change.path_changed);
        assert!(!change.source_changed);
    }

    #[test]
    fn test_detect_change_missing_file() {
        let host = Arc::new(MemoryHost::new());
        let change = detect_change(
            &client(&host),
            r"C:\vm\a.iso",
            "https://e/v2.iso",
            None,
            Some("https://e/v1.iso"),
        )
        .unwrap();
        assert!(!change.prior_exists);
        assert!(change.source_changed);
        assert!(change.requires_recreate());
    }
}
