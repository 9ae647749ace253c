//! Execution planner: refresh recorded resources and classify changes.

use anyhow::{Context, Result};
use hvkit::{Client, FileChange, FileResource};
use rayon::prelude::*;

use crate::config::{Config, FileSpec};
use crate::state::{FileRecord, FilesState};

/// What apply will do for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Declared but never applied
    Create,
    /// Declared and applied, and something changed
    Update(FileChange),
    /// Declared and applied, nothing to do
    NoChange,
    /// Applied but no longer declared
    Delete,
}

impl Action {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// One resource in the plan
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub key: String,
    pub action: Action,
    /// Declared state, absent for deletes
    pub desired: Option<FileSpec>,
    /// Last applied state, absent for creates
    pub record: Option<FileRecord>,
    /// What the host reported during refresh
    pub observed: Option<FileResource>,
}

impl PlannedChange {
    /// Path the change acts on
    pub fn path(&self) -> &str {
        match (&self.desired, &self.record) {
            (Some(spec), _) => &spec.path,
            (None, Some(record)) => &record.path,
            (None, None) => "",
        }
    }

    /// Whether the host copy drifted from the record since the last apply
    pub fn drifted(&self) -> bool {
        match (&self.record, &self.observed) {
            (Some(record), Some(observed)) => record.drifted_from(observed),
            _ => false,
        }
    }
}

/// Every declared or recorded resource, sorted by key
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    pub changes: Vec<PlannedChange>,
}

impl ExecutionPlan {
    /// Only the entries apply has to act on
    pub fn pending(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(|c| c.action.is_change())
    }

    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }
}

/// Build a plan from declared config and recorded state.
///
/// Recorded resources that are still declared are refreshed from the host
/// on a pool of `jobs` threads.
pub fn plan(
    client: &Client,
    config: &Config,
    state: &FilesState,
    jobs: usize,
) -> Result<ExecutionPlan> {
    let to_refresh: Vec<(&String, &FileRecord)> = state
        .files
        .iter()
        .filter(|(key, _)| config.files.contains_key(*key))
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("Failed to create refresh thread pool")?;

    let refreshed: Vec<(String, FileResource)> = pool.install(|| {
        to_refresh
            .par_iter()
            .map(|(key, record)| {
                client
                    .read(&record.path)
                    .map(|file| ((*key).clone(), file))
                    .with_context(|| format!("Failed to refresh files.{key}"))
            })
            .collect::<Result<_>>()
    })?;
    let mut observed: std::collections::HashMap<String, FileResource> =
        refreshed.into_iter().collect();

    let mut changes = Vec::new();

    for (key, spec) in &config.files {
        let change = match state.get(key) {
            None => PlannedChange {
                key: key.clone(),
                action: Action::Create,
                desired: Some(spec.clone()),
                record: None,
                observed: None,
            },
            Some(record) => {
                let current = observed.remove(key).unwrap_or_else(FileResource::absent);
                PlannedChange {
                    key: key.clone(),
                    action: classify(spec, record, &current),
                    desired: Some(spec.clone()),
                    record: Some(record.clone()),
                    observed: Some(current),
                }
            }
        };
        changes.push(change);
    }

    for (key, record) in &state.files {
        if !config.files.contains_key(key) {
            changes.push(PlannedChange {
                key: key.clone(),
                action: Action::Delete,
                desired: None,
                record: Some(record.clone()),
                observed: None,
            });
        }
    }

    changes.sort_by(|a, b| a.key.cmp(&b.key));
    log::debug!(
        "Planned {} resources, {} pending",
        changes.len(),
        changes.iter().filter(|c| c.action.is_change()).count()
    );

    Ok(ExecutionPlan { changes })
}

/// Classify a declared resource against its record and refreshed state.
pub fn classify(spec: &FileSpec, record: &FileRecord, observed: &FileResource) -> Action {
    let change = FileChange {
        prior_exists: observed.exists,
        path_changed: spec.path != record.path,
        source_changed: spec.source != record.source,
    };

    if change.requires_recreate() {
        Action::Update(change)
    } else {
        Action::NoChange
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hvkit::backend::memory::MemoryHost;
    use std::sync::Arc;

    fn spec(path: &str, source: &str) -> FileSpec {
        FileSpec {
            path: path.to_string(),
            source: source.to_string(),
        }
    }

    fn record(path: &str, source: &str) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            source: source.to_string(),
            exists: true,
            ..FileRecord::default()
        }
    }

    fn present() -> FileResource {
        FileResource {
            exists: true,
            ..FileResource::default()
        }
    }

    #[test]
    fn test_classify() {
        let s = spec(r"C:\a.iso", "https://e/a.iso");

        assert_eq!(
            classify(&s, &record(r"C:\a.iso", "https://e/a.iso"), &present()),
            Action::NoChange
        );

        let Action::Update(change) =
            classify(&s, &record(r"C:\a.iso", "https://e/a.iso"), &FileResource::absent())
        else {
            panic!("missing file should be recreated");
        };
        assert!(!change.prior_exists);

        let Action::Update(change) = classify(&s, &record(r"C:\old.iso", "https://e/a.iso"), &present())
        else {
            panic!("path change should be recreated");
        };
        assert!(change.path_changed && !change.source_changed);

        let Action::Update(change) = classify(&s, &record(r"C:\a.iso", "https://e/v1.iso"), &present())
        else {
            panic!("source change should be recreated");
        };
        assert!(change.source_changed && !change.path_changed);
    }

    #[test]
    fn test_plan_classifies_each_key() {
        let host = Arc::new(
            MemoryHost::new()
                .with_file(r"C:\vm\kept.iso", 1)
                .with_file(r"C:\vm\gone.iso", 2),
        );
        let client = Client::new(Box::new(Arc::clone(&host))).unwrap();

        let mut config = Config::default();
        config.files.insert("new".into(), spec(r"C:\vm\new.iso", "https://e/new.iso"));
        config.files.insert("kept".into(), spec(r"C:\vm\kept.iso", "https://e/kept.iso"));
        config.files.insert("drifted".into(), spec(r"C:\vm\drifted.iso", "https://e/d.iso"));

        let mut state = FilesState::default();
        state.record("kept", record(r"C:\vm\kept.iso", "https://e/kept.iso"));
        state.record("drifted", record(r"C:\vm\drifted.iso", "https://e/d.iso"));
        state.record("removed", record(r"C:\vm\gone.iso", "https://e/gone.iso"));

        let plan = plan(&client, &config, &state, 2).unwrap();
        let actions: Vec<_> = plan.changes.iter().map(|c| (c.key.as_str(), c.action)).collect();

        assert_eq!(
            actions,
            vec![
                ("drifted", Action::Update(FileChange::default())),
                ("kept", Action::NoChange),
                ("new", Action::Create),
                ("removed", Action::Delete),
            ]
        );
        assert_eq!(plan.pending_count(), 3);
        assert!(plan.changes[0].drifted());
        assert_eq!(plan.changes[3].path(), r"C:\vm\gone.iso");
    }

    #[test]
    fn test_plan_refreshes_only_declared_records() {
        let host = Arc::new(MemoryHost::new());
        let client = Client::new(Box::new(Arc::clone(&host))).unwrap();

        let mut state = FilesState::default();
        state.record("removed", record(r"C:\vm\gone.iso", "https://e/gone.iso"));

        let plan = plan(&client, &Config::default(), &state, 4).unwrap();
        assert_eq!(plan.pending_count(), 1);
        assert!(host.invocations().is_empty());
    }

    #[test]
    fn test_plan_fails_when_host_unreachable() {
        let host = Arc::new(MemoryHost::new());
        host.set_unreachable(true);
        let client = Client::new(Box::new(Arc::clone(&host))).unwrap();

        let mut config = Config::default();
        config.files.insert("a".into(), spec(r"C:\a.iso", "https://e/a.iso"));
        let mut state = FilesState::default();
        state.record("a", record(r"C:\a.iso", "https://e/a.iso"));

        let err = plan(&client, &config, &state, 1).unwrap_err();
        assert!(err.to_string().contains("files.a"));
    }
}
