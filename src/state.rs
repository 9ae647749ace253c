//! Last applied state of each file resource (`state.toml`).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hvkit::FileResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// State Structures
// ============================================================================

/// Every resource hvfiles has applied, keyed like `[files.<key>]` in the config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FilesState {
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,

    /// Last time the state was written
    pub last_updated: DateTime<Utc>,
}

/// What was applied for one resource and what the host reported back
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub source: String,
    #[serde(default)]
    pub exists: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub directory_name: String,
    #[serde(default)]
    pub creation_time: String,
    #[serde(default)]
    pub last_write_time: String,
    /// When a create or update last ran for this resource
    pub last_applied: Option<DateTime<Utc>>,
}

impl Default for FilesState {
    fn default() -> Self {
        Self {
            files: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

impl FileRecord {
    /// Record an observed resource under its declared path and source.
    pub fn observed(path: &str, source: &str, file: &FileResource) -> Self {
        Self {
            path: path.to_string(),
            source: source.to_string(),
            exists: file.exists,
            name: file.name.clone(),
            size: file.size,
            directory_name: file.directory_name.clone(),
            creation_time: file.creation_time.clone(),
            last_write_time: file.last_write_time.clone(),
            last_applied: None,
        }
    }

    /// Builder: stamp the record as just applied
    pub fn applied_now(mut self) -> Self {
        self.last_applied = Some(Utc::now());
        self
    }

    /// Whether the host attributes differ from `file`
    pub fn drifted_from(&self, file: &FileResource) -> bool {
        self.exists != file.exists
            || self.size != file.size
            || self.last_write_time != file.last_write_time
    }
}

// ============================================================================
// FilesState Implementation
// ============================================================================

impl FilesState {
    /// Load state from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&crate::paths::state_file()?)
    }

    /// Save state to the default location
    pub fn save(&mut self) -> Result<()> {
        self.save_to(&crate::paths::state_file()?)
    }

    /// Load state from disk, or return default if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Update `last_updated` and write to disk
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        // write then rename so an interrupted save keeps the previous state
        let tmp = with_extension_suffix(path, "tmp");
        fs::write(&tmp, &content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Record for a resource key
    pub fn get(&self, key: &str) -> Option<&FileRecord> {
        self.files.get(key)
    }

    /// Insert or replace a record
    pub fn record(&mut self, key: &str, record: FileRecord) {
        self.files.insert(key.to_string(), record);
    }

    /// Forget a resource
    pub fn forget(&mut self, key: &str) -> Option<FileRecord> {
        self.files.remove(key)
    }
}

fn with_extension_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

// ============================================================================
// Tests
// ============================================================================
