//! In-memory Hyper-V host for testing.
//!
//! [`MemoryHost`] interprets rendered scripts the way the PowerShell
//! templates behave on a real host, against a simulated file system:
//! paths compare case-insensitively, names keep their case, and downloads
//! succeed only for URLs registered with [`MemoryHost::with_download`].
//! Every call is recorded so tests can count remote round-trips.

use crate::backend::Executor;
use crate::error::{Error, Result};
use crate::types::ExecutionMode;
use psscript::{Script, TemplateId};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One recorded executor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    /// Template of the script that was run
    pub template: TemplateId,
    /// How it was run
    pub mode: ExecutionMode,
}

#[derive(Debug, Clone)]
struct MemFile {
    path: String,
    size: u64,
    created: String,
    modified: String,
}

#[derive(Debug, Default)]
struct HostState {
    files: BTreeMap<String, MemFile>,
    downloads: HashMap<String, u64>,
    invocations: Vec<Invocation>,
    unreachable: bool,
    clock: u32,
}

impl HostState {
    fn timestamp(&mut self) -> String {
        self.clock += 1;
        format!(
            "10/18/2026 09:{:02}:{:02}",
            (self.clock / 60) % 60,
            self.clock % 60
        )
    }

    fn insert(&mut self, path: &str, size: u64) {
        let stamp = self.timestamp();
        self.files.insert(
            key(path),
            MemFile {
                path: path.to_string(),
                size,
                created: stamp.clone(),
                modified: stamp,
            },
        );
    }
}

/// A simulated host.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<HostState>,
}

impl MemoryHost {
    /// An empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: a file already present on the host.
    pub fn with_file(self, path: &str, size: u64) -> Self {
        self.add_file(path, size);
        self
    }

    /// Builder: a URL the host can download.
    pub fn with_download(self, url: &str, size: u64) -> Self {
        self.state().downloads.insert(url.to_string(), size);
        self
    }

    /// Place a file on the host, as if created out of band.
    pub fn add_file(&self, path: &str, size: u64) {
        self.state().insert(path, size);
    }

    /// Remove a file out of band. Returns whether it existed.
    pub fn remove_file(&self, path: &str) -> bool {
        self.state().files.remove(&key(path)).is_some()
    }

    /// Whether a file exists on the host.
    pub fn file_exists(&self, path: &str) -> bool {
        self.state().files.contains_key(&key(path))
    }

    /// Size of a file on the host.
    pub fn file_size(&self, path: &str) -> Option<u64> {
        self.state().files.get(&key(path)).map(|f| f.size)
    }

    /// Paths of every file on the host, in key order.
    pub fn files(&self) -> Vec<String> {
        self.state().files.values().map(|f| f.path.clone()).collect()
    }

    /// Make every following call fail as if the host were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Calls recorded so far.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.state().invocations.clone()
    }

    /// Number of recorded calls running a state-changing template.
    pub fn mutating_calls(&self) -> usize {
        self.state()
            .invocations
            .iter()
            .filter(|i| i.template.is_mutating())
            .count()
    }

    /// Forget recorded calls.
    pub fn clear_invocations(&self) {
        self.state().invocations.clear();
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn execute(&self, script: &Script, mode: ExecutionMode) -> Result<String> {
        let mut state = self.state();
        if state.unreachable {
            return Err(Error::transport("memory host is unreachable"));
        }

        let template = script.template();
        state.invocations.push(Invocation { template, mode });

        let path = argument(script, "path")?;
        match template {
            TemplateId::CreateOrUpdateFile => {
                let source = argument(script, "source")?;
                create_or_update(&mut state, &path, &source)?;
                Ok(String::new())
            }
            TemplateId::GetFile => Ok(get_file(&state, &path)),
            TemplateId::DeleteFile => {
                delete_file(&mut state, &path);
                Ok(String::new())
            }
        }
    }
}

impl Executor for MemoryHost {
    fn name(&self) -> &str {
        "memory"
    }

    fn run_fire_and_forget(&self, script: &Script) -> Result<()> {
        self.execute(script, ExecutionMode::FireAndForget).map(drop)
    }

    fn run_with_result(&self, script: &Script) -> Result<String> {
        self.execute(script, ExecutionMode::WithResult)
    }
}

fn argument(script: &Script, name: &str) -> Result<String> {
    script.variable(name).ok_or_else(|| Error::RemoteScript {
        message: format!("{} script does not assign ${name}", script.template()),
        exit_code: Some(1),
        stderr: String::new(),
    })
}

fn create_or_update(state: &mut HostState, path: &str, source: &str) -> Result<()> {
    if state.files.contains_key(&key(path)) {
        return Ok(());
    }

    let size = if psscript::is_http_uri(source) {
        state.downloads.get(source).copied().ok_or_else(|| {
            script_error(format!(
                "Exception calling \"DownloadFile\": The remote server returned an error: (404) Not Found. {source}"
            ))
        })?
    } else {
        state.files.get(&key(source)).map(|f| f.size).ok_or_else(|| {
            script_error(format!(
                "Cannot find path '{source}' because it does not exist."
            ))
        })?
    };

    state.insert(path, size);
    Ok(())
}

fn get_file(state: &HostState, path: &str) -> String {
    if let Some(file) = state.files.get(&key(path)) {
        return item(file).to_string();
    }

    // Get-ChildItem on a directory lists its children
    let children: Vec<_> = state
        .files
        .values()
        .filter(|f| split(&f.path).0.is_some_and(|dir| dir.eq_ignore_ascii_case(path)))
        .map(item)
        .collect();

    match children.len() {
        0 => r#"{"Exists": false}"#.to_string(),
        1 => children[0].to_string(),
        _ => serde_json::Value::Array(children).to_string(),
    }
}

fn item(file: &MemFile) -> serde_json::Value {
    let (dir, name) = split(&file.path);
    json!({
        "Path": file.path,
        "Name": name,
        "Size": file.size,
        "DirName": dir.unwrap_or_default(),
        "Exists": true,
        "CreationTime": file.created,
        "LastWriteTime": file.modified,
    })
}

fn delete_file(state: &mut HostState, path: &str) {
    let (Some(dir), name) = split(path) else {
        return;
    };
    let target = base_name(name);
    if target.is_empty() {
        return;
    }

    state.files.retain(|_, file| {
        let (file_dir, file_name) = split(&file.path);
        let same_dir = file_dir.is_some_and(|d| d.eq_ignore_ascii_case(dir));
        !(same_dir && base_name(file_name).starts_with(target))
    });
}

fn script_error(message: String) -> Error {
    Error::RemoteScript {
        message: format!("script terminated with an error: {message}"),
        exit_code: Some(1),
        stderr: message,
    }
}

fn key(path: &str) -> String {
    path.to_lowercase()
}

/// Split a Windows path into parent directory and leaf name.
fn split(path: &str) -> (Option<&str>, &str) {
    match path.rfind(['\\', '/']) {
        Some(i) => (Some(&path[..i]), &path[i + 1..]),
        None => (None, path),
    }
}

/// File name without its final extension, as PowerShell's `BaseName`.
fn base_name(name: &str) -> &str {
    name.rfind('.').map_or(name, |i| &name[..i])
}
