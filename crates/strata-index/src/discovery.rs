//! File discovery: expand include/exclude globs into repo-relative paths.

use crate::exclusions::{should_exclude_entry, should_exclude_path};
use anyhow::{Context, Result, bail};
use glob::{MatchOptions, Pattern};
use ignore::WalkBuilder;
use std::path::{Component, Path};
use tracing::debug;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled include/exclude globs plus the built-in exclusions.
///
/// Checks path shape only. Ignore files and symlinks are handled by the
/// walk in [`discover`], so a path that exists on disk is admitted only if
/// the walk lists it.
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl FileFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// `rel_path` is POSIX-separated and relative to the root.
    pub fn matches(&self, rel_path: &str) -> bool {
        if should_exclude_path(Path::new(rel_path)) {
            return false;
        }
        self.include
            .iter()
            .any(|p| p.matches_with(rel_path, MATCH_OPTIONS))
            && !self
                .exclude
                .iter()
                .any(|p| p.matches_with(rel_path, MATCH_OPTIONS))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid glob pattern {:?}", p)))
        .collect()
}

/// Repo-relative POSIX form of `path` (which must live under `root`).
pub fn to_relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Every file under `root` that passes `filter`, sorted.
///
/// Hidden entries, `.gitignore`d files and dependency directories are never
/// visited. Unreadable directory entries are logged and skipped.
pub fn discover(root: &Path, filter: &FileFilter) -> Result<Vec<String>> {
    if !root.is_dir() {
        bail!("{:?} is not a directory", root);
    }

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !should_exclude_entry(&name)
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Some(rel) = to_relative(root, entry.path()) else {
            continue;
        };
        if filter.matches(&rel) {
            files.push(rel);
        }
    }

    files.sort();
    debug!("Discovered {} files under {:?}", files.len(), root);
    Ok(files)
}
