//! The sync engine: decides between full and incremental analysis, runs
//! extraction over the minimal file set and persists the result.

use crate::error::{Result, SyncError};
use crate::impact::impacted_modules;
use crate::vcs::{DiffStatus, FileDiff, VersionControl, classify};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;
use strata_index::config::resolve;
use strata_index::manifest::repo_name;
use strata_index::{
    AnalysisManifest, FileFilter, ManifestContext, Module, ModuleExtractor, ProgressSink,
    StateStore, StrataConfig, SyncState, discover, load_manifest, save_manifest,
    validate_manifest,
};
use strata_parser::ParserRegistry;
use tracing::{debug, info, warn};

/// Reported as the previous commit when a full analysis ignores prior state.
pub const NO_PREVIOUS_COMMIT: &str = "none";

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Report what would change without extracting or writing anything.
    pub dry_run: bool,
    /// Diff base overriding both the configured one and the last synced
    /// commit.
    pub since: Option<String>,
    /// Ignore prior state and analyse everything.
    pub force_full: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncMode {
    Full,
    Incremental,
    NoChanges,
    DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FullAnalysisReason {
    NoPriorState,
    InvalidManifest,
    UnreachableBase,
    Forced,
}

/// Summary of one sync, returned on every non-fatal path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub mode: SyncMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_analysis_reason: Option<FullAnalysisReason>,
    pub previous_commit: String,
    pub current_commit: String,
    pub diff: Vec<FileDiff>,
    pub impacted_modules: Vec<String>,
    pub modules_reanalyzed: usize,
    pub pages_affected: usize,
    pub skipped_files: usize,
    pub duration_ms: u64,
    /// Where the manifest was written; absent when nothing was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,
}

/// Where the last sync left the repository, as seen by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub current_commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    pub manifest_valid: bool,
    pub base_reachable: bool,
    pub up_to_date: bool,
    pub total_modules: usize,
}

/// How a sync will proceed once prior state has been inspected.
enum Plan {
    Full(FullAnalysisReason),
    Incremental {
        base: String,
        prior: AnalysisManifest,
    },
}

/// Diff split by what each entry means for the manifest.
#[derive(Debug, Default)]
struct ChangeSet {
    /// Added, modified and renamed paths (new names).
    changed: BTreeSet<String>,
    deleted: BTreeSet<String>,
    /// Old path to new path.
    renames: HashMap<String, String>,
}

impl ChangeSet {
    fn from_diff(diff: &[FileDiff]) -> Self {
        let mut set = Self::default();
        for entry in diff {
            match entry.status {
                DiffStatus::Deleted => {
                    set.deleted.insert(entry.path.clone());
                }
                DiffStatus::Renamed => {
                    if let Some(old) = &entry.old_path {
                        set.renames.insert(old.clone(), entry.path.clone());
                    }
                    set.changed.insert(entry.path.clone());
                }
                DiffStatus::Added | DiffStatus::Modified => {
                    set.changed.insert(entry.path.clone());
                }
            }
        }
        set
    }

    fn seeds(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().chain(&self.deleted).map(String::as_str)
    }
}

/// Keeps one repository root's manifest in step with its history.
///
/// One engine per root; concurrent syncs on the same root are not
/// supported.
pub struct SyncEngine<V> {
    root: PathBuf,
    config: StrataConfig,
    vcs: V,
    extractor: ModuleExtractor,
    progress: ProgressSink,
}

impl<V: VersionControl> SyncEngine<V> {
    /// Engine over `root` with the built-in parsers.
    pub fn new(root: impl Into<PathBuf>, config: StrataConfig, vcs: V) -> Self {
        Self::with_registry(root, config, vcs, ParserRegistry::with_defaults())
    }

    pub fn with_registry(
        root: impl Into<PathBuf>,
        config: StrataConfig,
        vcs: V,
        registry: ParserRegistry,
    ) -> Self {
        let extractor = ModuleExtractor::new(registry, config.max_file_size);
        Self {
            root: root.into(),
            config,
            vcs,
            extractor,
            progress: ProgressSink::none(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StrataConfig {
        &self.config
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    fn state_store(&self) -> StateStore {
        StateStore::new(self.config.state_file(&self.root))
    }

    fn filter(&self) -> Result<FileFilter> {
        FileFilter::new(&self.config.include, &self.config.exclude).map_err(SyncError::Discovery)
    }

    /// Bring the manifest up to date with the current commit.
    pub fn sync(&self, options: &SyncOptions) -> Result<SyncResult> {
        let started = Instant::now();
        let current = self.vcs.current_commit()?;
        let filter = self.filter()?;

        match self.plan(options)? {
            Plan::Full(reason) => self.full_analysis(reason, &current, &filter, options, started),
            Plan::Incremental { base, prior } => {
                self.incremental(base, prior, &current, &filter, options, started)
            }
        }
    }

    /// Inspect prior state. Anything unusable degrades to a full analysis;
    /// only version-control failures are errors.
    fn plan(&self, options: &SyncOptions) -> Result<Plan> {
        if options.force_full {
            return Ok(Plan::Full(FullAnalysisReason::Forced));
        }

        let Some(state) = self.state_store().load() else {
            info!("No usable sync state, running full analysis");
            return Ok(Plan::Full(FullAnalysisReason::NoPriorState));
        };

        let manifest_path = resolve(&self.root, Path::new(&state.manifest_path));
        if !validate_manifest(&manifest_path) {
            warn!(
                "Manifest {:?} referenced by sync state is invalid, running full analysis",
                manifest_path
            );
            return Ok(Plan::Full(FullAnalysisReason::InvalidManifest));
        }
        let prior = match load_manifest(&manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Failed to load prior manifest: {:#}, running full analysis", e);
                return Ok(Plan::Full(FullAnalysisReason::InvalidManifest));
            }
        };

        let base = options
            .since
            .clone()
            .or_else(|| self.config.since.clone())
            .unwrap_or(state.last_commit_sha);
        if !self.vcs.is_reachable(&base)? {
            warn!("Base commit {} is not in history, running full analysis", base);
            return Ok(Plan::Full(FullAnalysisReason::UnreachableBase));
        }

        Ok(Plan::Incremental { base, prior })
    }

    fn full_analysis(
        &self,
        reason: FullAnalysisReason,
        current: &str,
        filter: &FileFilter,
        options: &SyncOptions,
        started: Instant,
    ) -> Result<SyncResult> {
        let files = discover(&self.root, filter).map_err(SyncError::Discovery)?;
        info!("Full analysis of {} files ({:?})", files.len(), reason);

        let diff: Vec<FileDiff> = files
            .iter()
            .map(|path| FileDiff::new(path.clone(), DiffStatus::Added))
            .collect();
        let mut result = SyncResult {
            mode: SyncMode::Full,
            full_analysis_reason: Some(reason),
            previous_commit: NO_PREVIOUS_COMMIT.to_string(),
            current_commit: current.to_string(),
            diff,
            impacted_modules: Vec::new(),
            modules_reanalyzed: 0,
            pages_affected: 0,
            skipped_files: 0,
            duration_ms: 0,
            manifest_path: None,
        };

        if options.dry_run {
            result.mode = SyncMode::DryRun;
            result.duration_ms = elapsed_ms(started);
            return Ok(result);
        }

        let outcome =
            self.extractor
                .extract_batch(&self.root, &files, self.config.workers(), &self.progress);
        let manifest = self.assemble(outcome.modules, current, outcome.skipped, started)?;
        self.persist(&manifest)?;

        result.modules_reanalyzed = manifest.modules.len();
        result.pages_affected = manifest.modules.len();
        result.skipped_files = outcome.skipped;
        result.duration_ms = elapsed_ms(started);
        result.manifest_path = Some(self.manifest_path_string());
        Ok(result)
    }

    fn incremental(
        &self,
        base: String,
        prior: AnalysisManifest,
        current: &str,
        filter: &FileFilter,
        options: &SyncOptions,
        started: Instant,
    ) -> Result<SyncResult> {
        let classified = classify(self.vcs.diff(&base, current)?);
        // Present paths are admitted by the same walk a full analysis uses,
        // so ignore files and symlinks are treated identically.
        let present: BTreeSet<String> = discover(&self.root, filter)
            .map_err(SyncError::Discovery)?
            .into_iter()
            .collect();
        let diff = scope_to_filter(classified, filter, &present);

        let mut result = SyncResult {
            mode: SyncMode::NoChanges,
            full_analysis_reason: None,
            previous_commit: base,
            current_commit: current.to_string(),
            diff: Vec::new(),
            impacted_modules: Vec::new(),
            modules_reanalyzed: 0,
            pages_affected: 0,
            skipped_files: 0,
            duration_ms: 0,
            manifest_path: None,
        };
        if diff.is_empty() {
            info!("No changes since {}", result.previous_commit);
            result.duration_ms = elapsed_ms(started);
            return Ok(result);
        }

        let changes = ChangeSet::from_diff(&diff);
        result.diff = diff;

        // Renames first so impact lookups key on current paths.
        let prior = prior.with_renames(&changes.renames);

        let impacted = if self.config.impact_analysis {
            impacted_modules(&prior.dependency_graph, changes.seeds())
        } else {
            BTreeSet::new()
        };
        result.impacted_modules = impacted.iter().cloned().collect();

        let targets: BTreeSet<String> = changes
            .changed
            .union(&impacted)
            .filter(|path| present.contains(*path))
            .cloned()
            .collect();
        info!(
            "{} changed, {} deleted, {} impacted since {}",
            changes.changed.len(),
            changes.deleted.len(),
            impacted.len(),
            result.previous_commit
        );

        if options.dry_run {
            result.mode = SyncMode::DryRun;
            result.duration_ms = elapsed_ms(started);
            return Ok(result);
        }

        let target_list: Vec<String> = targets.iter().cloned().collect();
        let outcome = self.extractor.extract_batch(
            &self.root,
            &target_list,
            self.config.workers(),
            &self.progress,
        );
        let modules_reanalyzed = outcome.modules.len();

        let merged = merge_modules(
            &prior,
            &targets,
            &changes.deleted,
            &present,
            outcome.modules,
        );
        let manifest = self.assemble(merged, current, outcome.skipped, started)?;
        self.persist(&manifest)?;

        result.mode = SyncMode::Incremental;
        result.modules_reanalyzed = modules_reanalyzed;
        result.pages_affected = modules_reanalyzed + changes.deleted.len();
        result.skipped_files = outcome.skipped;
        result.duration_ms = elapsed_ms(started);
        result.manifest_path = Some(self.manifest_path_string());
        Ok(result)
    }

    fn assemble(
        &self,
        modules: Vec<Module>,
        current: &str,
        skipped_files: usize,
        started: Instant,
    ) -> Result<AnalysisManifest> {
        let context = ManifestContext {
            repo: repo_name(&self.root),
            branch: self.vcs.current_branch()?,
            commit_sha: current.to_string(),
            skipped_files,
            duration_ms: elapsed_ms(started),
        };
        Ok(AnalysisManifest::assemble(modules, context))
    }

    /// Write the manifest, then the state pointing at it.
    fn persist(&self, manifest: &AnalysisManifest) -> Result<()> {
        let manifest_file = self.config.manifest_file(&self.root);
        save_manifest(&manifest_file, manifest).map_err(SyncError::Persist)?;

        let state = SyncState {
            last_commit_sha: manifest.commit_sha.clone(),
            last_synced_at: Utc::now(),
            manifest_path: self.manifest_path_string(),
            total_pages: manifest.modules.len(),
        };
        self.state_store().save(&state).map_err(SyncError::Persist)?;
        debug!("Sync state now at {}", state.last_commit_sha);
        Ok(())
    }

    fn manifest_path_string(&self) -> String {
        self.config.manifest_path.to_string_lossy().replace('\\', "/")
    }

    /// Inspect prior state without changing anything.
    pub fn status(&self) -> Result<SyncStatus> {
        let current_commit = self.vcs.current_commit()?;
        let state = self.state_store().load();

        let (manifest_valid, total_modules) = match &state {
            Some(state) => {
                let path = resolve(&self.root, Path::new(&state.manifest_path));
                (validate_manifest(&path), state.total_pages)
            }
            None => (false, 0),
        };
        let base_reachable = match &state {
            Some(state) => self.vcs.is_reachable(&state.last_commit_sha)?,
            None => false,
        };
        let up_to_date = manifest_valid
            && state
                .as_ref()
                .is_some_and(|s| s.last_commit_sha == current_commit);

        Ok(SyncStatus {
            current_commit,
            last_commit: state.as_ref().map(|s| s.last_commit_sha.clone()),
            last_synced_at: state.as_ref().map(|s| s.last_synced_at),
            manifest_valid,
            base_reachable,
            up_to_date,
            total_modules,
        })
    }
}

/// Drop diff entries outside the analysed file set and sort by path.
///
/// Paths that exist after the change must be in `present`, the result of
/// the discovery walk. Paths that no longer exist (deletions, the old side
/// of a rename) only need to pass `filter`. A rename across the boundary
/// becomes an addition or a deletion.
fn scope_to_filter(
    diff: Vec<FileDiff>,
    filter: &FileFilter,
    present: &BTreeSet<String>,
) -> Vec<FileDiff> {
    let mut scoped: Vec<FileDiff> = diff
        .into_iter()
        .filter_map(|entry| match (entry.status, entry.old_path) {
            (DiffStatus::Deleted, _) => filter
                .matches(&entry.path)
                .then(|| FileDiff::new(entry.path, DiffStatus::Deleted)),
            (DiffStatus::Renamed, Some(old)) => {
                match (filter.matches(&old), present.contains(&entry.path)) {
                    (true, true) => Some(FileDiff {
                        path: entry.path,
                        status: DiffStatus::Renamed,
                        old_path: Some(old),
                    }),
                    (false, true) => Some(FileDiff::new(entry.path, DiffStatus::Added)),
                    (true, false) => Some(FileDiff::new(old, DiffStatus::Deleted)),
                    (false, false) => None,
                }
            }
            (status, _) => present
                .contains(&entry.path)
                .then(|| FileDiff::new(entry.path, status)),
        })
        .collect();
    scoped.sort_by(|a, b| a.path.cmp(&b.path));
    scoped
}

/// Prior modules outside `targets`, plus the fresh ones, minus deletions
/// and anything the discovery walk no longer admits.
fn merge_modules(
    prior: &AnalysisManifest,
    targets: &BTreeSet<String>,
    deleted: &BTreeSet<String>,
    present: &BTreeSet<String>,
    fresh: Vec<Module>,
) -> Vec<Module> {
    prior
        .modules
        .iter()
        .filter(|m| !targets.contains(&m.path))
        .cloned()
        .chain(fresh)
        .filter(|m| !deleted.contains(&m.path) && present.contains(&m.path))
        .collect()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests;
