//! Declared host and file resources (`config.toml`).

use anyhow::{Context, Result, bail};
use hvkit::backend::powershell::ShellCommand;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// How to reach the Hyper-V host
    #[serde(default)]
    pub host: HostConfig,

    /// Declared file resources, keyed by a stable name
    #[serde(default)]
    pub files: BTreeMap<String, FileSpec>,
}

/// Command line used to run scripts on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    pub transport_exit_codes: Vec<i32>,
}

impl Default for HostConfig {
    fn default() -> Self {
        let command = ShellCommand::default();
        Self {
            program: command.program,
            args: command.args,
            timeout_secs: command.timeout.as_secs(),
            transport_exit_codes: command.transport_exit_codes,
        }
    }
}

impl HostConfig {
    /// Backend command line for this host
    pub fn shell_command(&self) -> ShellCommand {
        ShellCommand {
            program: self.program.clone(),
            args: self.args.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            transport_exit_codes: self.transport_exit_codes.clone(),
        }
    }
}

/// One declared file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    /// Absolute path on the host
    pub path: String,
    /// URL or host-local path to materialize from
    pub source: String,
}

impl Config {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!(
            "Loaded {} file resources from {}",
            config.files.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Check declared resources before anything reaches the host.
    pub fn validate(&self) -> Result<()> {
        if self.host.program.trim().is_empty() {
            bail!("host.program must not be empty");
        }
        if self.host.timeout_secs == 0 {
            bail!("host.timeout_secs must be greater than zero");
        }

        let mut seen: HashMap<String, &str> = HashMap::new();
        for (key, spec) in &self.files {
            if spec.path.trim().is_empty() {
                bail!("files.{key}: path is required");
            }
            if spec.source.trim().is_empty() {
                bail!("files.{key}: source is required");
            }
            // Windows paths compare case-insensitively
            if let Some(other) = seen.insert(spec.path.to_lowercase(), key) {
                bail!("files.{key} and files.{other} declare the same path {}", spec.path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[host]
program = "ssh"
args = ["admin@hv01", "powershell", "-NoProfile", "-NonInteractive", "-Command", "-"]
timeout_secs = 600

[files.ubuntu-iso]
path = 'C:\vm\iso\ubuntu.iso'
source = "https://releases.example.com/ubuntu.iso"

[files.base-disk]
path = 'C:\vm\disks\base.vhdx'
source = 'D:\golden\base.vhdx'
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.host.program, "ssh");
        assert_eq!(config.host.timeout_secs, 600);
        assert_eq!(config.host.transport_exit_codes, vec![255]);
        assert_eq!(config.files.len(), 2);
        assert_eq!(config.files["ubuntu-iso"].path, r"C:\vm\iso\ubuntu.iso");

        let command = config.host.shell_command();
        assert_eq!(command.timeout, Duration::from_secs(600));
        assert_eq!(command.args[0], "admin@hv01");
    }

    #[test]
    fn test_empty_config_uses_local_powershell() {
        let config = Config::parse("").unwrap();
        assert!(config.files.is_empty());
        assert_eq!(config.host.shell_command(), ShellCommand::default());
    }

    #[test]
    fn test_rejects_empty_fields() {
        let err = Config::parse("[files.a]\npath = ''\nsource = 'x'\n").unwrap_err();
        assert!(format!("{err:#}").contains("files.a: path is required"));

        let err = Config::parse("[files.a]\npath = 'C:\\a.iso'\nsource = ' '\n").unwrap_err();
        assert!(format!("{err:#}").contains("source is required"));
    }

    #[test]
    fn test_rejects_duplicate_paths_ignoring_case() {
        let content = r#"
[files.a]
path = 'C:\VM\a.iso'
source = "https://example.com/a.iso"

[files.b]
path = 'c:\vm\A.ISO'
source = "https://example.com/b.iso"
"#;
        let err = Config::parse(content).unwrap_err();
        assert!(format!("{err:#}").contains("declare the same path"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = Config::parse("[host]\ntimeout_secs = 0\n").unwrap_err();
        assert!(format!("{err:#}").contains("timeout_secs"));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        assert_eq!(Config::load(&path).unwrap().files.len(), 2);

        let missing = dir.path().join("missing.toml");
        let err = Config::load(&missing).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}
