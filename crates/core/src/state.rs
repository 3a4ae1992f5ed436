//! Persisted plugin state: which plugins are installed, at what version,
//! enabled or not, and where they came from.
//!
//! Reads and writes go through the same write-to-temp-then-rename pattern
//! used elsewhere in this codebase for other on-disk artifacts, so a crash
//! mid-write never leaves a half-written state file behind.

use crate::errors::PluginError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PluginSource {
    Registry,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginStateEntry {
    pub version: String,
    pub enabled: bool,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source: PluginSource,
    #[serde(default)]
    pub local_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginStateFile {
    pub schema_version: u32,
    pub plugins: IndexMap<String, PluginStateEntry>,
    #[serde(default)]
    pub registry_url: Option<String>,
}

impl Default for PluginStateFile {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            plugins: IndexMap::new(),
            registry_url: None,
        }
    }
}

/// Reads and atomically writes the plugin state file.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing file is equivalent to an empty mapping at schema version 0,
    /// not an error.
    #[instrument(skip(self))]
    pub fn read(&self) -> Result<PluginStateFile, PluginError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no plugin state file, using empty state");
            return Ok(PluginStateFile {
                schema_version: 0,
                plugins: IndexMap::new(),
                registry_url: None,
            });
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let state: PluginStateFile = serde_json::from_str(&contents)?;
        Ok(state)
    }

    #[instrument(skip(self, state))]
    pub fn write(&self, state: &PluginStateFile) -> Result<(), PluginError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp_path = self.path.with_extension("json.tmp");

        std::fs::write(&tmp_path, json)?;

        #[cfg(windows)]
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), "wrote plugin state file");
        Ok(())
    }
}

fn default_state_dir() -> Option<PathBuf> {
    directories_next::ProjectDirs::from("dev", "weave", "weave")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
}

/// Resolves the default plugin state file path under the project's private
/// data directory.
pub fn default_state_path() -> Option<PathBuf> {
    default_state_dir().map(|dir| dir.join("plugins").join("state.json"))
}
