//! Backend abstraction for running scripts on a Hyper-V host.
//!
//! The [`Executor`] trait is the only remote capability the reconciler
//! needs, allowing for different implementations:
//! - [`powershell::PowerShellBackend`]: a local or ssh-wrapped PowerShell process
//! - [`memory::MemoryHost`]: an in-memory host for testing

pub mod memory;
pub mod powershell;

use crate::error::Result;
use psscript::Script;

/// Runs rendered scripts against one host.
///
/// Both calls block until the host answers or the executor's own timeout
/// elapses. Implementations must report an unreachable host as
/// [`crate::Error::Transport`] and a failing script as
/// [`crate::Error::RemoteScript`].
pub trait Executor: Send + Sync {
    /// Name of the executor (for logs).
    fn name(&self) -> &str;

    /// Run a script, discarding its output.
    fn run_fire_and_forget(&self, script: &Script) -> Result<()>;

    /// Run a script and return its standard output.
    fn run_with_result(&self, script: &Script) -> Result<String>;
}

impl<E: Executor + ?Sized> Executor for std::sync::Arc<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run_fire_and_forget(&self, script: &Script) -> Result<()> {
        (**self).run_fire_and_forget(script)
    }

    fn run_with_result(&self, script: &Script) -> Result<String> {
        (**self).run_with_result(script)
    }
}
