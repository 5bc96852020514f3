//! Persisted registry of artifact files to re-import on change
//!
//! The registry is a YAML file (by default `~/.config/microcks/watch`)
//! separate from the main configuration. Each entry maps an artifact file
//! path to the contexts it was imported in. The watch manager re-reads this
//! file whenever it changes and reconciles its watch set against it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{check_file_permission, write_restricted};
use crate::error::Result;

/// Root of the watch registry file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub entries: Vec<WatchEntry>,
}

/// One watched artifact file, keyed by its path.
///
/// Callers strip any leading `./` before storing a path so that keys match
/// the watcher's event paths; the registry itself does no normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchEntry {
    #[serde(rename = "filePath", default)]
    pub file_path: String,
    /// Names of the contexts the artifact was imported in
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(rename = "mainartifact", default)]
    pub main_artifact: bool,
}

impl WatchConfig {
    /// Loads the registry file. Returns `Ok(None)` when it does not exist;
    /// overly permissive file modes are rejected before parsing.
    pub fn read(path: impl AsRef<Path>) -> Result<Option<WatchConfig>> {
        let path = path.as_ref();
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        check_file_permission(path, &metadata)?;

        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Some(WatchConfig::default()));
        }
        Ok(Some(serde_yaml::from_str(&contents)?))
    }

    /// Writes the registry back, creating parent directories and restricting
    /// the file mode to `0600`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_yaml::to_string(self)?;
        write_restricted(path, contents.as_bytes())
    }

    /// Inserts or updates the entry for `entry.file_path`. When the path is
    /// already registered the context lists are unioned, incoming contexts
    /// first, so importing the same file under a second context keeps the
    /// first context's subscription.
    pub fn upsert_entry(&mut self, mut entry: WatchEntry) {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.file_path == entry.file_path)
        {
            for context in &existing.context {
                if !entry.context.contains(context) {
                    entry.context.push(context.clone());
                }
            }
            *existing = entry;
            return;
        }
        self.entries.push(entry);
    }
}
