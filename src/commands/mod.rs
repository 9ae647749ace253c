// Declarative commands (status, diff, apply)
pub mod declarative;

// Single operations against the host
pub mod file;

// Script preview
pub mod render;

use anyhow::{Context as AnyhowContext, Result};
use hvkit::Client;
use hvkit::backend::powershell::PowerShellBackend;

use crate::Context;
use crate::config::Config;
use crate::paths;

/// Load the config file, or defaults when none exists and none was asked for.
pub fn load_config(ctx: &Context) -> Result<Config> {
    let path = paths::config_file(ctx.config.as_deref())?;

    if ctx.config.is_none() && !path.exists() {
        log::debug!(
            "No config file at {}, using local PowerShell",
            path.display()
        );
        return Ok(Config::default());
    }

    Config::load(&path)
}

/// Build a reconciler for the configured host.
pub fn connect(config: &Config) -> Result<Client> {
    let backend = PowerShellBackend::new(config.host.shell_command());
    Client::new(Box::new(backend)).context("Failed to load script templates")
}
