//! Repository configuration read from `strata.toml`.

use crate::exclusions::DEFAULT_MAX_FILE_SIZE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional configuration file at the repository root.
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Default location of the sync-state record, relative to the root.
pub const DEFAULT_STATE_PATH: &str = ".strata/sync-state.json";

/// Default location of the manifest, relative to the root.
pub const DEFAULT_MANIFEST_PATH: &str = ".strata/manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrataConfig {
    /// Globs (relative to the root) selecting files to analyse.
    pub include: Vec<String>,
    /// Globs removing files from the included set.
    pub exclude: Vec<String>,
    /// Files larger than this many bytes are skipped and counted.
    pub max_file_size: u64,
    /// Propagate changes to transitive importers.
    pub impact_analysis: bool,
    pub state_path: PathBuf,
    pub manifest_path: PathBuf,
    /// Diff base to use instead of the last synced commit.
    pub since: Option<String>,
    /// Extraction worker count.
    pub concurrency: usize,
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            include: vec!["**/*".to_string()],
            exclude: Vec::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            impact_analysis: true,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_PATH),
            since: None,
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl StrataConfig {
    /// Load `strata.toml` from `root`. A missing file gives the defaults; a
    /// file that exists but does not parse is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            tracing::debug!("No {} in {:?}, using defaults", CONFIG_FILE_NAME, root);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid configuration in {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    pub fn state_file(&self, root: &Path) -> PathBuf {
        resolve(root, &self.state_path)
    }

    pub fn manifest_file(&self, root: &Path) -> PathBuf {
        resolve(root, &self.manifest_path)
    }

    /// Worker count, never zero.
    pub fn workers(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Resolve `path` against `root` unless it is already absolute.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
