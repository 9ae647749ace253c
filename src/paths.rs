//! Centralized path resolution for hvfiles
//!
//! # Environment Variables
//!
//! - `HVFILES_CONFIG_DIR` - Override config directory
//! - `HVFILES_STATE_DIR` - Override state directory
//! - `HVFILES_CONFIG` - Override the config file itself
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `HVFILES_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/hvfiles` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\hvfiles`
//!    - macOS/Linux: `~/.config/hvfiles`
//!
//! For state_dir():
//! 1. `HVFILES_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/hvfiles` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\hvfiles`
//!    - macOS/Linux: `~/.local/state/hvfiles`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "HVFILES_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "HVFILES_STATE_DIR";

/// Environment variable for config file override
pub const ENV_CONFIG_FILE: &str = "HVFILES_CONFIG";

const APP_DIR: &str = "hvfiles";

/// Get the hvfiles config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join(APP_DIR));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the hvfiles state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            return Ok(local_app_data.join(APP_DIR));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Resolve the config file.
///
/// Priority: explicit `--config` path, then `HVFILES_CONFIG`, then
/// `<config_dir>/config.toml`.
pub fn config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand(&path.to_string_lossy()));
    }

    if let Ok(file) = std::env::var(ENV_CONFIG_FILE) {
        return Ok(expand(&file));
    }

    Ok(config_dir()?.join("config.toml"))
}

/// Get the state file path
pub fn state_file() -> Result<PathBuf> {
    Ok(state_dir()?.join("state.toml"))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
