//! Persistence for the sync state and the manifest.
//!
//! Both files are JSON, pretty-printed, and written atomically: the content
//! goes to a temporary file in the target directory which is then renamed
//! over the destination, so a reader sees either the old or the new file.

use crate::manifest::AnalysisManifest;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Pointer from the last analysed commit to the manifest that reflects it.
/// Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub last_commit_sha: String,
    pub last_synced_at: DateTime<Utc>,
    pub manifest_path: String,
    pub total_pages: usize,
}

/// Reads and writes the sync-state file at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored state, or `None` if the file is missing, unreadable,
    /// malformed or lacks a field. Callers cannot tell these apart.
    pub fn load(&self) -> Option<SyncState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No usable sync state at {:?}: {}", self.path, e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                debug!("Ignoring invalid sync state at {:?}: {}", self.path, e);
                None
            }
        }
    }

    /// Persist `state`, creating parent directories as needed.
    pub fn save(&self, state: &SyncState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.path, json.as_bytes())
    }
}

/// True only if `path` exists, parses as JSON and has a `modules` array.
/// An empty array is valid.
pub fn validate_manifest(path: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(path) else {
        return false;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) else {
        return false;
    };
    value.get("modules").is_some_and(|m| m.is_array())
}

pub fn load_manifest(path: &Path) -> Result<AnalysisManifest> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse manifest {:?}", path))
}

pub fn save_manifest(path: &Path, manifest: &AnalysisManifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    write_atomic(path, json.as_bytes())?;
    debug!("Wrote manifest with {} modules to {:?}", manifest.modules.len(), path);
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {:?}", path))?;
    Ok(())
}
