//! Common types for file resources and script executions.

use psscript::{TemplateArgs, TemplateId};
use serde::{Deserialize, Serialize};

/// A file artifact tracked on the host.
///
/// `path` is the resource identity. When `exists` is false every observed
/// attribute is undefined and holds its zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResource {
    /// Target location on the host
    pub path: String,
    /// Where the file was materialized from (URI or path)
    #[serde(default)]
    pub source: String,
    /// File name
    #[serde(default)]
    pub name: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// Directory holding the file
    #[serde(default)]
    pub directory_name: String,
    /// Whether the file exists on the host
    #[serde(default)]
    pub exists: bool,
    /// Creation time in the host's native format
    #[serde(default)]
    pub creation_time: String,
    /// Last write time in the host's native format
    #[serde(default)]
    pub last_write_time: String,
}

impl FileResource {
    /// A resource observed as absent.
    pub fn absent() -> Self {
        Self::default()
    }
}

/// What changed since the last known state of a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Whether the file existed at the last read
    pub prior_exists: bool,
    /// Whether the declared path changed
    pub path_changed: bool,
    /// Whether the declared source changed
    pub source_changed: bool,
}

impl FileChange {
    /// Whether the file must be materialized again.
    pub fn requires_recreate(&self) -> bool {
        !self.prior_exists || self.path_changed || self.source_changed
    }
}

/// How a script is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Output is discarded; only success or failure is observed
    FireAndForget,
    /// Standard output is captured for decoding
    WithResult,
}

/// One unit of remote work: a template, its arguments and a mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
    /// Template arguments (selecting the template)
    pub args: TemplateArgs,
    /// Execution mode
    pub mode: ExecutionMode,
}

impl ScriptInvocation {
    /// A fire-and-forget invocation.
    pub fn fire_and_forget(args: TemplateArgs) -> Self {
        Self {
            args,
            mode: ExecutionMode::FireAndForget,
        }
    }

    /// An invocation whose output is captured.
    pub fn with_result(args: TemplateArgs) -> Self {
        Self {
            args,
            mode: ExecutionMode::WithResult,
        }
    }

    /// The template being invoked.
    pub fn template(&self) -> TemplateId {
        self.args.template_id()
    }
}

/// Successful outcome of an invocation.
///
/// Failures are reported through [`crate::Error`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Captured standard output (with-result invocations only)
    pub output: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_recreate() {
        let unchanged = FileChange {
            prior_exists: true,
            path_changed: false,
            source_changed: false,
        };
        assert!(!unchanged.requires_recreate());

        assert!(FileChange::default().requires_recreate());
        assert!(
            FileChange {
                path_changed: true,
                ..unchanged
            }
            .requires_recreate()
        );
        assert!(
            FileChange {
                source_changed: true,
                ..unchanged
            }
            .requires_recreate()
        );
    }

    #[test]
    fn test_absent_resource_has_no_observed_attributes() {
        let absent = FileResource::absent();
        assert!(!absent.exists);
        assert_eq!(absent.size, 0);
        assert!(absent.name.is_empty());
    }

    #[test]
    fn test_invocation_template() {
        let invocation = ScriptInvocation::with_result(TemplateArgs::get(r"C:\a.iso"));
        assert_eq!(invocation.template(), TemplateId::GetFile);
        assert_eq!(invocation.mode, ExecutionMode::WithResult);
    }
}
