//! # hvkit
//!
//! Keep file artifacts on a Hyper-V host in line with their declared state.
//!
//! Each operation renders a PowerShell script from a typed template
//! ([`psscript`]), runs it through an [`Executor`], and, where a result is
//! expected, decodes the printed JSON into a [`FileResource`].
//!
//! No state is cached between calls. Create and Update always finish with
//! a fresh Read, so a file removed by hand on the host shows up as absent
//! on the next Read.
//!
//! ## Example
//!
//! ```
//! use hvkit::Client;
//! use hvkit::backend::memory::MemoryHost;
//!
//! let host = MemoryHost::new().with_download("https://example.com/disk.vhdx", 1024);
//! let client = Client::new(Box::new(host)).unwrap();
//!
//! let file = client
//!     .create(r"C:\vm\disk.vhdx", "https://example.com/disk.vhdx")
//!     .unwrap();
//! assert!(file.exists);
//! assert_eq!(file.name, "disk.vhdx");
//!
//! client.delete(r"C:\vm\disk.vhdx").unwrap();
//! assert!(!client.read(r"C:\vm\disk.vhdx").unwrap().exists);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod decode;
pub mod error;
pub mod types;

pub use backend::Executor;
pub use error::{Error, ErrorCategory, Result};
pub use types::{ExecutionMode, ExecutionOutcome, FileChange, FileResource, ScriptInvocation};

use psscript::{Registry, TemplateArgs};

/// Reconciles file resources on one host.
///
/// A client holds no per-resource state, so one client can serve many
/// resources from several threads as long as their paths differ.
pub struct Client {
    executor: Box<dyn Executor>,
    registry: Registry,
}

impl Client {
    /// Create a client over an executor.
    pub fn new(executor: Box<dyn Executor>) -> Result<Self> {
        Ok(Self::with_registry(executor, Registry::new()?))
    }

    /// Create a client with an existing template registry.
    pub fn with_registry(executor: Box<dyn Executor>, registry: Registry) -> Self {
        Self { executor, registry }
    }

    /// Name of the underlying executor.
    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }

    /// Render and run one invocation.
    ///
    /// Rendering errors are returned before the executor is called.
    pub fn invoke(&self, invocation: &ScriptInvocation) -> Result<ExecutionOutcome> {
        let script = self.registry.render(&invocation.args)?;
        log::debug!(
            "Invoking {} ({:?}) on {}",
            script.template(),
            invocation.mode,
            self.executor.name()
        );

        match invocation.mode {
            ExecutionMode::FireAndForget => {
                self.executor.run_fire_and_forget(&script)?;
                Ok(ExecutionOutcome::default())
            }
            ExecutionMode::WithResult => Ok(ExecutionOutcome {
                output: Some(self.executor.run_with_result(&script)?),
            }),
        }
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Materialize `path` from `source`, then read it back.
    ///
    /// The script does nothing when `path` already exists, so repeating a
    /// create is harmless. Success of the write itself is not confirmed
    /// beyond the remote call succeeding; the following read reports what
    /// is actually there.
    pub fn create(&self, path: &str, source: &str) -> Result<FileResource> {
        require("create", "path", path)?;
        require("create", "source", source)?;

        log::info!("Creating {path} from {source}");
        self.invoke(&ScriptInvocation::fire_and_forget(
            TemplateArgs::create_or_update(path, source),
        ))?;

        let mut file = self.read(path)?;
        file.source = source.to_string();
        Ok(file)
    }

    /// Read the observed state of `path`.
    ///
    /// An absent file is a normal result (`exists == false`), not an error.
    pub fn read(&self, path: &str) -> Result<FileResource> {
        require("read", "path", path)?;

        let outcome = self.invoke(&ScriptInvocation::with_result(TemplateArgs::get(path)))?;
        let mut file = decode::decode(outcome.output.as_deref().unwrap_or_default())?;

        if file.exists {
            if !file.path.is_empty() && file.path != path {
                log::debug!("Host reports {path} as {}", file.path);
            }
            log::info!("Read {path}: {} bytes", file.size);
        } else {
            log::info!("Read {path}: not found");
        }

        file.path = path.to_string();
        Ok(file)
    }

    /// Bring `path` in line with `source` given what changed.
    ///
    /// Runs a full create when the file was missing or either argument
    /// changed; otherwise only reads. Never patches a file in place.
    pub fn update(&self, path: &str, source: &str, change: FileChange) -> Result<FileResource> {
        require("update", "path", path)?;
        require("update", "source", source)?;

        if change.requires_recreate() {
            log::info!("Updating {path} ({change:?})");
            self.invoke(&ScriptInvocation::fire_and_forget(
                TemplateArgs::create_or_update(path, source),
            ))?;
        } else {
            log::debug!("No change for {path}");
        }

        let mut file = self.read(path)?;
        file.source = source.to_string();
        Ok(file)
    }

    /// Remove `path` and every sibling file sharing its base name.
    ///
    /// Deleting `C:\vm\disk.vhdx` also removes `C:\vm\disk.vhdx.bak` and
    /// `C:\vm\disk-old.iso`. Succeeds whether or not anything was there.
    pub fn delete(&self, path: &str) -> Result<()> {
        require("delete", "path", path)?;

        log::info!("Deleting {path}");
        self.invoke(&ScriptInvocation::fire_and_forget(TemplateArgs::delete(path)))?;
        Ok(())
    }
}

fn require(operation: &'static str, field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation { operation, field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{Invocation, MemoryHost};
    use psscript::TemplateId;
    use std::sync::Arc;

    const DISK: &str = r"C:\vm\disk.vhdx";
    const DISK_URL: &str = "https://example.com/disk.vhdx";

    fn client(host: &Arc<MemoryHost>) -> Client {
        Client::new(Box::new(Arc::clone(host))).unwrap()
    }

    fn host() -> Arc<MemoryHost> {
        Arc::new(MemoryHost::new().with_download(DISK_URL, 1024))
    }

    fn unchanged() -> FileChange {
        FileChange {
            prior_exists: true,
            path_changed: false,
            source_changed: false,
        }
    }

    #[test]
    fn test_create_then_read_round_trip() {
        let host = host();
        let client = client(&host);

        let created = client.create(DISK, DISK_URL).unwrap();
        assert!(created.exists);
        assert_eq!(created.path, DISK);
        assert_eq!(created.name, "disk.vhdx");
        assert_eq!(created.size, 1024);
        assert_eq!(created.directory_name, r"C:\vm");
        assert_eq!(created.source, DISK_URL);

        let read = client.read(DISK).unwrap();
        assert!(read.exists);
        assert_eq!(read.path, DISK);
        assert_eq!(read.name, "disk.vhdx");
    }

    #[test]
    fn test_create_runs_one_mutation_then_one_read() {
        let host = host();
        client(&host).create(DISK, DISK_URL).unwrap();

        assert_eq!(
            host.invocations(),
            vec![
                Invocation {
                    template: TemplateId::CreateOrUpdateFile,
                    mode: ExecutionMode::FireAndForget,
                },
                Invocation {
                    template: TemplateId::GetFile,
                    mode: ExecutionMode::WithResult,
                },
            ]
        );
    }

    #[test]
    fn test_create_from_copy_source() {
        let host = Arc::new(MemoryHost::new().with_file(r"D:\golden\base.vhdx", 2048));
        let file = client(&host)
            .create(r"C:\vm\new\base.vhdx", r"D:\golden\base.vhdx")
            .unwrap();
        assert!(file.exists);
        assert_eq!(file.size, 2048);
    }

    #[test]
    fn test_create_is_idempotent() {
        let host = host();
        let client = client(&host);

        let first = client.create(DISK, DISK_URL).unwrap();
        let files_after_first = host.files();
        let second = client.create(DISK, DISK_URL).unwrap();

        assert_eq!(first, second);
        assert_eq!(host.files(), files_after_first);
    }

    #[test]
    fn test_read_absent_is_not_an_error() {
        let host = host();
        let file = client(&host).read(r"C:\vm\missing.iso").unwrap();
        assert!(!file.exists);
        assert_eq!(file.path, r"C:\vm\missing.iso");
        assert_eq!(file.size, 0);
        assert!(file.name.is_empty());
    }

    #[test]
    fn test_read_detects_drift() {
        let host = host();
        let client = client(&host);
        client.create(DISK, DISK_URL).unwrap();

        host.remove_file(DISK);
        assert!(!client.read(DISK).unwrap().exists);
    }

    #[test]
    fn test_update_without_change_is_read_only() {
        let host = host();
        let client = client(&host);
        client.create(DISK, DISK_URL).unwrap();
        host.clear_invocations();

        let file = client.update(DISK, DISK_URL, unchanged()).unwrap();
        assert!(file.exists);
        assert_eq!(host.mutating_calls(), 0);
        assert_eq!(host.invocations().len(), 1);
    }

    #[test]
    fn test_update_with_change_mutates_exactly_once() {
        let changes = [
            FileChange {
                prior_exists: false,
                ..unchanged()
            },
            FileChange {
                path_changed: true,
                ..unchanged()
            },
            FileChange {
                source_changed: true,
                ..unchanged()
            },
        ];

        for change in changes {
            let host = host();
            let client = client(&host);
            client.update(DISK, DISK_URL, change).unwrap();
            assert_eq!(host.mutating_calls(), 1, "{change:?}");
        }
    }

    #[test]
    fn test_update_recreates_missing_file() {
        let host = host();
        let client = client(&host);
        client.create(DISK, DISK_URL).unwrap();
        host.remove_file(DISK);

        let file = client
            .update(
                DISK,
                DISK_URL,
                FileChange {
                    prior_exists: false,
                    ..unchanged()
                },
            )
            .unwrap();
        assert!(file.exists);
    }

    #[test]
    fn test_update_source_change_keeps_existing_file() {
        let host = Arc::new(
            MemoryHost::new()
                .with_download(DISK_URL, 1024)
                .with_download("https://example.com/disk-v2.vhdx", 4096),
        );
        let client = client(&host);
        client.create(DISK, DISK_URL).unwrap();

        let file = client
            .update(
                DISK,
                "https://example.com/disk-v2.vhdx",
                FileChange {
                    source_changed: true,
                    ..unchanged()
                },
            )
            .unwrap();

        // the create script is a no-op while the path exists
        assert_eq!(file.size, 1024);
        assert_eq!(file.source, "https://example.com/disk-v2.vhdx");
    }

    #[test]
    fn test_delete_absent_target_succeeds() {
        let host = host();
        client(&host).delete(r"C:\vm\never-created.vhdx").unwrap();
        client(&host).delete(r"C:\missing-dir\a.vhdx").unwrap();
    }

    #[test]
    fn test_delete_removes_files_sharing_base_name() {
        let host = Arc::new(
            MemoryHost::new()
                .with_file(r"C:\vm\disk.vhdx", 1)
                .with_file(r"C:\vm\disk.vhdx.bak", 2)
                .with_file(r"C:\vm\diskette.iso", 3)
                .with_file(r"C:\vm\other.vhdx", 4)
                .with_file(r"C:\vm\nested\disk.vhdx", 5),
        );

        client(&host).delete(DISK).unwrap();

        assert!(!host.file_exists(r"C:\vm\disk.vhdx"));
        assert!(!host.file_exists(r"C:\vm\disk.vhdx.bak"));
        // prefix match on the base name reaches unrelated siblings too
        assert!(!host.file_exists(r"C:\vm\diskette.iso"));
        assert!(host.file_exists(r"C:\vm\other.vhdx"));
        assert!(host.file_exists(r"C:\vm\nested\disk.vhdx"));
    }

    #[test]
    fn test_delete_issues_no_confirmation_read() {
        let host = host();
        client(&host).delete(DISK).unwrap();
        assert_eq!(
            host.invocations(),
            vec![Invocation {
                template: TemplateId::DeleteFile,
                mode: ExecutionMode::FireAndForget,
            }]
        );
    }

    #[test]
    fn test_validation_fails_before_remote_call() {
        let host = host();
        let client = client(&host);

        let errors = [
            client.create("", DISK_URL).unwrap_err(),
            client.create(DISK, "").unwrap_err(),
            client.read("  ").unwrap_err(),
            client.update(DISK, "", unchanged()).unwrap_err(),
            client.delete("").unwrap_err(),
        ];
        for err in &errors {
            assert_eq!(err.category(), ErrorCategory::Validation, "{err}");
        }
        assert!(host.invocations().is_empty());
    }

    #[test]
    fn test_render_errors_fail_before_remote_call() {
        let host = host();
        let err = client(&host).read("C:\\vm\\a.iso\nRemove-Item C:\\").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Render);
        assert!(host.invocations().is_empty());
    }

    #[test]
    fn test_quotes_in_paths_survive_the_round_trip() {
        let host = Arc::new(MemoryHost::new().with_download("https://example.com/o'neil.iso", 7));
        let client = client(&host);
        let path = r"C:\vm\o'neil's disk.iso";

        let file = client.create(path, "https://example.com/o'neil.iso").unwrap();
        assert!(file.exists);
        assert_eq!(file.name, "o'neil's disk.iso");
        assert!(host.file_exists(path));
    }

    #[test]
    fn test_transport_errors_propagate() {
        let host = host();
        let client = client(&host);
        host.set_unreachable(true);

        for err in [
            client.create(DISK, DISK_URL).unwrap_err(),
            client.read(DISK).unwrap_err(),
            client.delete(DISK).unwrap_err(),
        ] {
            assert_eq!(err.category(), ErrorCategory::Transport);
        }
    }

    #[test]
    fn test_remote_script_error_stops_create_before_read() {
        let host = host();
        let err = client(&host)
            .create(DISK, "https://example.com/unknown.vhdx")
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::RemoteScript);
        assert_eq!(host.invocations().len(), 1);
    }

    #[test]
    fn test_read_of_directory_is_decode_error() {
        let host = Arc::new(
            MemoryHost::new()
                .with_file(r"C:\vm\a.vhdx", 1)
                .with_file(r"C:\vm\b.vhdx", 1),
        );
        let err = client(&host).read(r"C:\vm").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Decode);
    }

    #[test]
    fn test_invoke_returns_output_only_with_result() {
        let host = host();
        let client = client(&host);

        let outcome = client
            .invoke(&ScriptInvocation::with_result(TemplateArgs::get(DISK)))
            .unwrap();
        assert_eq!(outcome.output.as_deref(), Some(r#"{"Exists": false}"#));

        let outcome = client
            .invoke(&ScriptInvocation::fire_and_forget(TemplateArgs::get(DISK)))
            .unwrap();
        assert_eq!(outcome.output, None);
    }

    #[test]
    fn test_distinct_paths_reconcile_in_parallel() {
        let host = Arc::new(
            (0..8).fold(MemoryHost::new(), |host, i| {
                host.with_download(&format!("https://example.com/{i}.iso"), i)
            }),
        );
        let client = client(&host);

        std::thread::scope(|scope| {
            for i in 0..8u64 {
                let client = &client;
                scope.spawn(move || {
                    let path = format!(r"C:\iso\{i}.iso");
                    let file = client
                        .create(&path, &format!("https://example.com/{i}.iso"))
                        .unwrap();
                    assert_eq!(file.size, i);
                });
            }
        });

        assert_eq!(host.files().len(), 8);
    }
}
