//! Shared setup for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use strata_index::StrataConfig;
use strata_sync::{GitRepository, SyncEngine};

/// Resolves a path to an absolute project root path.
/// If the path is relative, it's joined with the current directory.
pub fn resolve_project_root(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("Failed to get current directory")?
            .join(path))
    }
}

/// Engine for the repository at `path`, configured from its `strata.toml`.
pub fn open_engine(path: &Path) -> Result<SyncEngine<GitRepository>> {
    let root = resolve_project_root(path)?;
    let config = StrataConfig::load(&root)?;
    let repo = GitRepository::discover(&root)?;
    Ok(SyncEngine::new(root, config, repo))
}
