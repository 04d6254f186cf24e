//! Built-in exclusions applied on top of the configured globs.
//!
//! Dependency folders, build output and hidden directories never contain
//! code worth analysing and are skipped no matter what `include` says.

use std::path::{Component, Path};

/// Default ceiling for a single file (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "vendor",
    "__pycache__",
    "venv",
    ".venv",
    "coverage",
    ".git",
    ".hg",
    ".svn",
    "out",
    ".next",
    ".nuxt",
    ".cache",
    ".turbo",
];

/// True if any component of `path` is hidden (starts with `.`) or names an
/// excluded directory. Mirrors what the discovery walk skips, so paths that
/// arrive through a diff are filtered the same way.
pub fn should_exclude_path(path: &Path) -> bool {
    path.components().any(|component| {
        let Component::Normal(name) = component else {
            return false;
        };
        let name = name.to_string_lossy();
        name.starts_with('.') || EXCLUDED_DIRS.contains(&name.as_ref())
    })
}

/// Directory-name check for `WalkBuilder::filter_entry`.
pub fn should_exclude_entry(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}
