//! Plan display

use colored::Colorize;

use super::planner::{Action, ExecutionPlan, PlannedChange};

/// Print the pending changes of a plan
pub fn display_diff(plan: &ExecutionPlan) {
    if plan.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "File Diff".bold()
    );
    println!("│");

    for change in plan.pending() {
        let symbol = match change.action {
            Action::Create => "+".green(),
            Action::Update(_) => "~".yellow(),
            Action::Delete => "-".red(),
            Action::NoChange => "○".dimmed(),
        };

        println!(
            "│   {} {:<24} {}",
            symbol,
            change.key,
            describe(change).dimmed()
        );
        for note in notes(change) {
            println!("│       {} {}", "⚠".yellow(), note);
        }
    }

    let count = |wanted: fn(&Action) -> bool| plan.pending().filter(|c| wanted(&c.action)).count();
    let creates = count(|a| matches!(a, Action::Create));
    let updates = count(|a| matches!(a, Action::Update(_)));
    let deletes = count(|a| matches!(a, Action::Delete));

    println!("│");
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} to create, {} to update, {} to delete",
        creates.to_string().green(),
        updates.to_string().yellow(),
        deletes.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// One-line description of a change
pub fn describe(change: &PlannedChange) -> String {
    match change.action {
        Action::Create => format!(
            "(not applied) → {}",
            change.desired.as_ref().map_or("", |d| d.path.as_str())
        ),
        Action::Update(file_change) => {
            let mut reasons = Vec::new();
            if !file_change.prior_exists {
                reasons.push("missing on host".to_string());
            }
            if file_change.path_changed {
                let from = change.record.as_ref().map_or("", |r| r.path.as_str());
                reasons.push(format!("path {from} → {}", change.path()));
            }
            if file_change.source_changed {
                reasons.push("source changed".to_string());
            }
            reasons.join(", ")
        }
        Action::Delete => format!("(will remove) {}", change.path()),
        Action::NoChange => "up to date".to_string(),
    }
}

/// Warnings about side effects a change has on the host
pub fn notes(change: &PlannedChange) -> Vec<String> {
    let mut notes = Vec::new();

    match change.action {
        Action::Delete => {
            if let Some(pattern) = collateral_pattern(change.path()) {
                notes.push(format!("also removes every file matching {pattern}"));
            }
        }
        Action::Update(file_change) => {
            if file_change.source_changed && file_change.prior_exists && !file_change.path_changed
            {
                notes.push("source changed; remote copy kept while the path exists".to_string());
            }
            if file_change.path_changed {
                notes.push("the file at the previous path is left in place".to_string());
            }
        }
        Action::Create | Action::NoChange => {}
    }

    notes
}

/// Files a delete of `path` reaches: every sibling whose base name starts
/// with the target's base name.
pub fn collateral_pattern(path: &str) -> Option<String> {
    let split = path.rfind(['\\', '/'])?;
    let (dir, name) = (&path[..split], &path[split + 1..]);
    let stem = name.rfind('.').map_or(name, |i| &name[..i]);
    if stem.is_empty() {
        return None;
    }
    Some(format!("{dir}\\{stem}*"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileSpec;
    use crate::state::FileRecord;
    use hvkit::FileChange;

    fn change(action: Action, desired: Option<&str>, recorded: Option<&str>) -> PlannedChange {
        PlannedChange {
            key: "disk".to_string(),
            action,
            desired: desired.map(|path| FileSpec {
                path: path.to_string(),
                source: "https://e/disk.vhdx".to_string(),
            }),
            record: recorded.map(|path| FileRecord {
                path: path.to_string(),
                ..FileRecord::default()
            }),
            observed: None,
        }
    }

    #[test]
    fn test_collateral_pattern() {
        assert_eq!(
            collateral_pattern(r"C:\vm\disk.vhdx").as_deref(),
            Some(r"C:\vm\disk*")
        );
        assert_eq!(collateral_pattern(r"C:\vm\.hidden"), None);
        assert_eq!(collateral_pattern("disk.vhdx"), None);
    }

    #[test]
    fn test_delete_warns_about_collateral() {
        let c = change(Action::Delete, None, Some(r"C:\vm\disk.vhdx"));
        assert_eq!(describe(&c), r"(will remove) C:\vm\disk.vhdx");
        assert_eq!(notes(&c), vec![r"also removes every file matching C:\vm\disk*"]);
    }

    #[test]
    fn test_source_only_update_is_flagged() {
        let c = change(
            Action::Update(FileChange {
                prior_exists: true,
                path_changed: false,
                source_changed: true,
            }),
            Some(r"C:\vm\disk.vhdx"),
            Some(r"C:\vm\disk.vhdx"),
        );
        assert_eq!(describe(&c), "source changed");
        assert_eq!(
            notes(&c),
            vec!["source changed; remote copy kept while the path exists"]
        );
    }

    #[test]
    fn test_path_change_description() {
        let c = change(
            Action::Update(FileChange {
                prior_exists: true,
                path_changed: true,
                source_changed: false,
            }),
            Some(r"C:\vm\new.vhdx"),
            Some(r"C:\vm\old.vhdx"),
        );
        assert_eq!(describe(&c), r"path C:\vm\old.vhdx → C:\vm\new.vhdx");
        assert_eq!(notes(&c).len(), 1);
    }

    #[test]
    fn test_missing_file_update() {
        let c = change(
            Action::Update(FileChange::default()),
            Some(r"C:\vm\disk.vhdx"),
            Some(r"C:\vm\disk.vhdx"),
        );
        assert_eq!(describe(&c), "missing on host");
        assert!(notes(&c).is_empty());
    }
}
