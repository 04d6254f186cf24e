//! Scenario tests for the sync engine, driven by a scripted version-control
//! fake over a real scratch directory.

use super::*;
use crate::error::VcsError;
use crate::vcs::RawChange;
use std::cell::RefCell;
use std::fs;
use std::sync::mpsc;
use strata_index::ProgressEvent;
use tempfile::TempDir;

#[derive(Default)]
struct History {
    /// Commits reachable from HEAD, oldest first. The last one is HEAD.
    commits: Vec<String>,
    diffs: HashMap<(String, String), Vec<RawChange>>,
    diff_calls: usize,
    broken: bool,
}

#[derive(Default)]
struct FakeVcs {
    history: RefCell<History>,
}

impl FakeVcs {
    fn at(sha: &str) -> Self {
        let vcs = Self::default();
        vcs.history.borrow_mut().commits.push(sha.to_string());
        vcs
    }

    /// Append a commit to history and record its diff from the previous
    /// HEAD.
    fn commit(&self, sha: &str, changes: Vec<RawChange>) {
        let mut history = self.history.borrow_mut();
        let parent = history.commits.last().cloned().unwrap_or_default();
        history
            .diffs
            .insert((parent, sha.to_string()), changes);
        history.commits.push(sha.to_string());
    }

    fn set_diff(&self, from: &str, to: &str, changes: Vec<RawChange>) {
        self.history
            .borrow_mut()
            .diffs
            .insert((from.to_string(), to.to_string()), changes);
    }

    /// Drop every commit after the first, as a force-push would.
    fn rewrite(&self, sha: &str) {
        let mut history = self.history.borrow_mut();
        history.commits.truncate(1);
        history.commits.push(sha.to_string());
    }

    fn diff_calls(&self) -> usize {
        self.history.borrow().diff_calls
    }
}

impl VersionControl for FakeVcs {
    fn current_commit(&self) -> std::result::Result<String, VcsError> {
        let history = self.history.borrow();
        if history.broken {
            return Err(VcsError::UnknownCommit("HEAD".to_string()));
        }
        history
            .commits
            .last()
            .cloned()
            .ok_or_else(|| VcsError::UnknownCommit("HEAD".to_string()))
    }

    fn current_branch(&self) -> std::result::Result<Option<String>, VcsError> {
        Ok(Some("main".to_string()))
    }

    fn is_reachable(&self, sha: &str) -> std::result::Result<bool, VcsError> {
        Ok(self.history.borrow().commits.iter().any(|c| c == sha))
    }

    fn diff(&self, from: &str, to: &str) -> std::result::Result<Vec<RawChange>, VcsError> {
        let mut history = self.history.borrow_mut();
        history.diff_calls += 1;
        Ok(history
            .diffs
            .get(&(from.to_string(), to.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// a.ts imports b.ts imports c.ts; d.ts stands alone.
fn seed_project(root: &Path) {
    write(root, "src/a.ts", "import { b } from './b';\nexport const a = b + 1;\n");
    write(root, "src/b.ts", "import { c } from './c';\nexport const b = c + 1;\n");
    write(root, "src/c.ts", "export const c = 1;\n");
    write(root, "src/d.ts", "export function d() {}\n");
    write(root, "README.md", "# project\n");
}

fn config() -> StrataConfig {
    StrataConfig {
        concurrency: 2,
        ..StrataConfig::default()
    }
}

fn engine(root: &Path, vcs: FakeVcs) -> SyncEngine<FakeVcs> {
    SyncEngine::new(root, config(), vcs)
}

fn manifest(root: &Path) -> AnalysisManifest {
    load_manifest(&root.join(".strata/manifest.json")).unwrap()
}

fn state(root: &Path) -> SyncState {
    StateStore::new(root.join(".strata/sync-state.json"))
        .load()
        .unwrap()
}

fn paths(manifest: &AnalysisManifest) -> Vec<&str> {
    manifest.modules.iter().map(|m| m.path.as_str()).collect()
}

fn sync(engine: &SyncEngine<FakeVcs>) -> SyncResult {
    engine.sync(&SyncOptions::default()).unwrap()
}

/// Engine that has completed a first full sync at commit `c1`.
fn synced(dir: &TempDir) -> SyncEngine<FakeVcs> {
    seed_project(dir.path());
    let engine = engine(dir.path(), FakeVcs::at("c1"));
    let result = sync(&engine);
    assert_eq!(result.mode, SyncMode::Full);
    engine
}

#[test]
fn test_first_sync_is_full() {
    let dir = TempDir::new().unwrap();
    seed_project(dir.path());
    let engine = engine(dir.path(), FakeVcs::at("c1"));

    let result = sync(&engine);

    assert_eq!(result.mode, SyncMode::Full);
    assert_eq!(result.full_analysis_reason, Some(FullAnalysisReason::NoPriorState));
    assert_eq!(result.previous_commit, "none");
    assert_eq!(result.current_commit, "c1");
    assert_eq!(result.modules_reanalyzed, 4);
    assert_eq!(result.skipped_files, 0);
    assert_eq!(result.manifest_path.as_deref(), Some(".strata/manifest.json"));

    let manifest = manifest(dir.path());
    assert_eq!(paths(&manifest), vec!["src/a.ts", "src/b.ts", "src/c.ts", "src/d.ts"]);
    assert_eq!(manifest.commit_sha, "c1");
    assert_eq!(manifest.branch.as_deref(), Some("main"));
    assert!(manifest.dependency_graph.is_consistent());
    assert_eq!(manifest.dependency_graph.edges.len(), 2);

    let state = state(dir.path());
    assert_eq!(state.last_commit_sha, "c1");
    assert_eq!(state.manifest_path, ".strata/manifest.json");
    assert_eq!(state.total_pages, 4);
}

#[test]
fn test_no_changes_leaves_state_untouched() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);
    let state_file = dir.path().join(".strata/sync-state.json");
    let before = fs::read(&state_file).unwrap();

    engine.vcs().commit("c2", Vec::new());
    let result = sync(&engine);

    assert_eq!(result.mode, SyncMode::NoChanges);
    assert_eq!(result.previous_commit, "c1");
    assert_eq!(result.current_commit, "c2");
    assert!(result.diff.is_empty());
    assert_eq!(result.modules_reanalyzed, 0);
    assert!(result.manifest_path.is_none());
    assert_eq!(fs::read(&state_file).unwrap(), before);
}

#[test]
fn test_changes_outside_filter_are_no_changes() {
    let dir = TempDir::new().unwrap();
    seed_project(dir.path());
    let config = StrataConfig {
        include: vec!["src/**/*.ts".to_string()],
        ..config()
    };
    let engine = SyncEngine::new(dir.path(), config, FakeVcs::at("c1"));
    sync(&engine);

    write(dir.path(), "README.md", "# changed\n");
    engine.vcs().commit("c2", vec![RawChange::new('M', "README.md")]);

    assert_eq!(sync(&engine).mode, SyncMode::NoChanges);
}

#[test]
fn test_incremental_reanalyses_changed_and_impacted() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);
    let before = manifest(dir.path());

    write(dir.path(), "src/c.ts", "export const c = 2;\nexport const extra = 3;\n");
    engine.vcs().commit("c2", vec![RawChange::new('M', "src/c.ts")]);
    let result = sync(&engine);

    assert_eq!(result.mode, SyncMode::Incremental);
    assert_eq!(result.previous_commit, "c1");
    assert_eq!(result.diff, vec![FileDiff::new("src/c.ts", DiffStatus::Modified)]);
    assert_eq!(result.impacted_modules, vec!["src/a.ts", "src/b.ts"]);
    assert_eq!(result.modules_reanalyzed, 3);
    assert_eq!(result.pages_affected, 3);

    let after = manifest(dir.path());
    assert_eq!(after.commit_sha, "c2");
    assert_eq!(paths(&after), paths(&before));
    assert_ne!(
        after.module("src/c.ts").unwrap().content_hash,
        before.module("src/c.ts").unwrap().content_hash
    );
    assert_eq!(after.module("src/c.ts").unwrap().symbols.len(), 2);
    // Untouched modules are carried over as they were.
    assert_eq!(after.module("src/d.ts"), before.module("src/d.ts"));
    assert_eq!(state(dir.path()).last_commit_sha, "c2");
}

#[test]
fn test_impact_analysis_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    seed_project(dir.path());
    let config = StrataConfig {
        impact_analysis: false,
        ..config()
    };
    let engine = SyncEngine::new(dir.path(), config, FakeVcs::at("c1"));
    sync(&engine);

    write(dir.path(), "src/c.ts", "export const c = 2;\n");
    engine.vcs().commit("c2", vec![RawChange::new('M', "src/c.ts")]);
    let result = sync(&engine);

    assert!(result.impacted_modules.is_empty());
    assert_eq!(result.modules_reanalyzed, 1);
}

#[test]
fn test_merge_adds_and_deletes() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);
    let before = manifest(dir.path());

    fs::remove_file(dir.path().join("src/d.ts")).unwrap();
    write(dir.path(), "src/e.ts", "import { d } from './c';\nexport class E {}\n");
    engine.vcs().commit(
        "c2",
        vec![RawChange::new('D', "src/d.ts"), RawChange::new('A', "src/e.ts")],
    );
    let result = sync(&engine);

    assert_eq!(result.mode, SyncMode::Incremental);
    assert!(result.impacted_modules.is_empty());
    assert_eq!(result.modules_reanalyzed, 1);
    assert_eq!(result.pages_affected, 2);

    let after = manifest(dir.path());
    assert_eq!(paths(&after), vec!["src/a.ts", "src/b.ts", "src/c.ts", "src/e.ts"]);
    assert!(!after.dependency_graph.nodes.contains("src/d.ts"));
    assert!(after.dependency_graph.is_consistent());
    for path in ["src/a.ts", "src/b.ts", "src/c.ts"] {
        assert_eq!(after.module(path), before.module(path));
    }
    let from_e: Vec<_> = after.dependency_graph.dependencies_of("src/e.ts").into_iter().collect();
    assert_eq!(from_e, vec!["src/c.ts"]);
}

#[test]
fn test_deleting_an_imported_file_impacts_importers() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);

    fs::remove_file(dir.path().join("src/c.ts")).unwrap();
    engine.vcs().commit("c2", vec![RawChange::new('D', "src/c.ts")]);
    let result = sync(&engine);

    assert_eq!(result.impacted_modules, vec!["src/a.ts", "src/b.ts"]);
    let after = manifest(dir.path());
    assert_eq!(paths(&after), vec!["src/a.ts", "src/b.ts", "src/d.ts"]);
    assert!(after.dependency_graph.dependencies_of("src/b.ts").is_empty());
}

#[test]
fn test_rename_preserves_graph() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);

    // b.ts has a dependent (a.ts) and a dependency (c.ts).
    fs::rename(dir.path().join("src/b.ts"), dir.path().join("src/bee.ts")).unwrap();
    write(dir.path(), "src/a.ts", "import { b } from './bee';\nexport const a = b + 1;\n");
    engine.vcs().commit(
        "c2",
        vec![
            RawChange::renamed("src/b.ts", "src/bee.ts"),
            RawChange::new('M', "src/a.ts"),
        ],
    );
    let result = sync(&engine);

    assert_eq!(result.mode, SyncMode::Incremental);
    assert_eq!(result.diff[1].status, DiffStatus::Renamed);
    assert_eq!(result.diff[1].old_path.as_deref(), Some("src/b.ts"));
    // a.ts is changed itself, so nothing is merely impacted.
    assert!(result.impacted_modules.is_empty());

    let graph = manifest(dir.path()).dependency_graph;
    assert!(!graph.nodes.contains("src/b.ts"));
    assert!(graph.nodes.contains("src/bee.ts"));
    let edges: Vec<_> = graph.edges.iter().map(|e| (e.from.as_str(), e.to.as_str())).collect();
    assert_eq!(edges, vec![("src/a.ts", "src/bee.ts"), ("src/bee.ts", "src/c.ts")]);
}

#[test]
fn test_rename_impact_keys_on_new_path() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);

    // Move c.ts without touching its importer: b.ts is impacted through the
    // renamed node even though its import no longer resolves.
    fs::rename(dir.path().join("src/c.ts"), dir.path().join("src/sea.ts")).unwrap();
    engine
        .vcs()
        .commit("c2", vec![RawChange::renamed("src/c.ts", "src/sea.ts")]);
    let result = engine
        .sync(&SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        })
        .unwrap();

    assert_eq!(result.impacted_modules, vec!["src/a.ts", "src/b.ts"]);
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);
    let state_file = dir.path().join(".strata/sync-state.json");
    let manifest_file = dir.path().join(".strata/manifest.json");
    let state_before = fs::read(&state_file).unwrap();
    let manifest_before = fs::read(&manifest_file).unwrap();

    write(dir.path(), "src/c.ts", "export const c = 42;\n");
    engine.vcs().commit("c2", vec![RawChange::new('M', "src/c.ts")]);
    let result = engine
        .sync(&SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        })
        .unwrap();

    assert_eq!(result.mode, SyncMode::DryRun);
    assert_eq!(result.diff.len(), 1);
    assert_eq!(result.impacted_modules, vec!["src/a.ts", "src/b.ts"]);
    assert_eq!(result.modules_reanalyzed, 0);
    assert!(result.manifest_path.is_none());
    assert_eq!(fs::read(&state_file).unwrap(), state_before);
    assert_eq!(fs::read(&manifest_file).unwrap(), manifest_before);
}

#[test]
fn test_dry_run_without_state_writes_nothing() {
    let dir = TempDir::new().unwrap();
    seed_project(dir.path());
    let engine = engine(dir.path(), FakeVcs::at("c1"));

    let result = engine
        .sync(&SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        })
        .unwrap();

    assert_eq!(result.mode, SyncMode::DryRun);
    assert_eq!(result.full_analysis_reason, Some(FullAnalysisReason::NoPriorState));
    assert_eq!(result.diff.len(), 5);
    assert!(result.diff.iter().all(|d| d.status == DiffStatus::Added));
    assert!(!dir.path().join(".strata").exists());
}

#[test]
fn test_recovers_from_corrupt_state() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);
    fs::write(dir.path().join(".strata/sync-state.json"), "{ this is not json").unwrap();
    engine.vcs().commit("c2", Vec::new());

    let result = sync(&engine);

    assert_eq!(result.mode, SyncMode::Full);
    assert_eq!(result.full_analysis_reason, Some(FullAnalysisReason::NoPriorState));
    assert_eq!(result.previous_commit, "none");
    assert_eq!(result.modules_reanalyzed, 4);
    assert_eq!(state(dir.path()).last_commit_sha, "c2");
}

#[test]
fn test_recovers_from_manifest_without_modules() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);
    fs::write(dir.path().join(".strata/manifest.json"), r#"{"repo": "x"}"#).unwrap();
    engine.vcs().commit("c2", Vec::new());

    let result = sync(&engine);

    assert_eq!(result.mode, SyncMode::Full);
    assert_eq!(result.full_analysis_reason, Some(FullAnalysisReason::InvalidManifest));
    assert_eq!(result.previous_commit, "none");
    assert_eq!(result.modules_reanalyzed, 4);
    assert_eq!(manifest(dir.path()).modules.len(), 4);
}

#[test]
fn test_recovers_from_missing_manifest() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);
    fs::remove_file(dir.path().join(".strata/manifest.json")).unwrap();

    let result = sync(&engine);

    assert_eq!(result.full_analysis_reason, Some(FullAnalysisReason::InvalidManifest));
    assert!(dir.path().join(".strata/manifest.json").exists());
}

#[test]
fn test_recovers_from_rewritten_history() {
    let dir = TempDir::new().unwrap();
    seed_project(dir.path());
    let vcs = FakeVcs::at("root");
    vcs.commit("c1", Vec::new());
    let engine = engine(dir.path(), vcs);
    sync(&engine);
    assert_eq!(state(dir.path()).last_commit_sha, "c1");

    // c1 is gone from history after a force-push.
    engine.vcs().rewrite("c1-rewritten");
    let result = sync(&engine);

    assert_eq!(result.mode, SyncMode::Full);
    assert_eq!(result.full_analysis_reason, Some(FullAnalysisReason::UnreachableBase));
    assert_eq!(result.previous_commit, "none");
    assert_eq!(result.modules_reanalyzed, 4);
    assert_eq!(engine.vcs().diff_calls(), 0);
    assert_eq!(state(dir.path()).last_commit_sha, "c1-rewritten");
}

#[test]
fn test_identical_commits_extract_nothing() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);
    let manifest_file = dir.path().join(".strata/manifest.json");
    let before = fs::read(&manifest_file).unwrap();

    engine.vcs().commit("c2", Vec::new());
    let result = sync(&engine);

    assert!(result.diff.is_empty());
    assert_eq!(result.modules_reanalyzed, 0);
    assert_eq!(engine.vcs().diff_calls(), 1);
    assert_eq!(fs::read(&manifest_file).unwrap(), before);
}

#[test]
fn test_full_analysis_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);
    let first = manifest(dir.path());

    let forced = SyncOptions {
        force_full: true,
        ..SyncOptions::default()
    };
    let result = engine.sync(&forced).unwrap();
    assert_eq!(result.full_analysis_reason, Some(FullAnalysisReason::Forced));
    assert_eq!(result.previous_commit, "none");
    let second = manifest(dir.path());

    let hashes = |m: &AnalysisManifest| -> Vec<(String, String)> {
        m.modules
            .iter()
            .map(|m| (m.path.clone(), m.content_hash.clone()))
            .collect()
    };
    assert_eq!(hashes(&first), hashes(&second));
    assert_eq!(first.dependency_graph, second.dependency_graph);
    assert_eq!(first.stats.total_symbols, second.stats.total_symbols);
}

#[test]
fn test_since_overrides_base() {
    let dir = TempDir::new().unwrap();
    let engine = synced(&dir);
    write(dir.path(), "README.md", "# renamed project\n");
    engine.vcs().commit("c2", vec![RawChange::new('M', "README.md")]);
    sync(&engine);
    assert_eq!(state(dir.path()).last_commit_sha, "c2");

    write(dir.path(), "src/d.ts", "export function d(x: number) {}\n");
    engine.vcs().commit("c3", Vec::new());
    engine
        .vcs()
        .set_diff("c1", "c3", vec![RawChange::new('M', "src/d.ts")]);

    let result = engine
        .sync(&SyncOptions {
            since: Some("c1".to_string()),
            ..SyncOptions::default()
        })
        .unwrap();

    assert_eq!(result.mode, SyncMode::Incremental);
    assert_eq!(result.previous_commit, "c1");
    assert_eq!(result.modules_reanalyzed, 1);
}

#[test]
fn test_oversized_files_are_counted() {
    let dir = TempDir::new().unwrap();
    seed_project(dir.path());
    write(dir.path(), "src/big.ts", &"export const x = 1;\n".repeat(100));
    let config = StrataConfig {
        max_file_size: 200,
        ..config()
    };
    let engine = SyncEngine::new(dir.path(), config, FakeVcs::at("c1"));

    let result = sync(&engine);

    assert_eq!(result.skipped_files, 1);
    assert_eq!(result.modules_reanalyzed, 4);
    assert_eq!(manifest(dir.path()).stats.skipped_files, 1);
}

#[test]
fn test_vcs_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    seed_project(dir.path());
    let vcs = FakeVcs::at("c1");
    vcs.history.borrow_mut().broken = true;
    let engine = engine(dir.path(), vcs);

    let result = engine.sync(&SyncOptions::default());

    assert!(matches!(result, Err(SyncError::Vcs(_))));
    assert!(!dir.path().join(".strata").exists());
}

#[test]
fn test_invalid_glob_is_a_discovery_error() {
    let dir = TempDir::new().unwrap();
    let config = StrataConfig {
        include: vec!["[".to_string()],
        ..config()
    };
    let engine = SyncEngine::new(dir.path(), config, FakeVcs::at("c1"));

    assert!(matches!(
        engine.sync(&SyncOptions::default()),
        Err(SyncError::Discovery(_))
    ));
}

#[test]
fn test_progress_events_do_not_change_results() {
    let dir = TempDir::new().unwrap();
    seed_project(dir.path());
    let (tx, rx) = mpsc::channel();
    let engine = engine(dir.path(), FakeVcs::at("c1")).with_progress(ProgressSink::channel(tx));

    let result = sync(&engine);
    drop(engine);
    let events: Vec<ProgressEvent> = rx.iter().collect();

    assert_eq!(result.modules_reanalyzed, 4);
    assert_eq!(events.first(), Some(&ProgressEvent::Started { total: 5 }));
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Finished {
            extracted: 4,
            skipped: 0
        })
    );
    assert_eq!(events.len(), 7);
}

#[test]
fn test_status() {
    let dir = TempDir::new().unwrap();
    seed_project(dir.path());
    let engine = engine(dir.path(), FakeVcs::at("c1"));

    let before = engine.status().unwrap();
    assert_eq!(before.last_commit, None);
    assert!(!before.up_to_date);

    sync(&engine);
    let synced = engine.status().unwrap();
    assert!(synced.up_to_date);
    assert!(synced.manifest_valid);
    assert!(synced.base_reachable);
    assert_eq!(synced.total_modules, 4);

    engine.vcs().commit("c2", Vec::new());
    let behind = engine.status().unwrap();
    assert!(!behind.up_to_date);
    assert_eq!(behind.current_commit, "c2");
}

#[test]
fn test_result_json_shape() {
    let result = SyncResult {
        mode: SyncMode::NoChanges,
        full_analysis_reason: None,
        previous_commit: "a".to_string(),
        current_commit: "b".to_string(),
        diff: Vec::new(),
        impacted_modules: Vec::new(),
        modules_reanalyzed: 0,
        pages_affected: 0,
        skipped_files: 0,
        duration_ms: 5,
        manifest_path: None,
    };
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["mode"], "noChanges");
    assert_eq!(json["previousCommit"], "a");
    assert!(json.get("fullAnalysisReason").is_none());
    assert!(json.get("manifestPath").is_none());
}

#[test]
fn test_scope_to_filter_rewrites_boundary_renames() {
    let filter = FileFilter::new(&["src/**".to_string()], &[]).unwrap();
    let present: BTreeSet<String> = ["src/in.ts".to_string()].into_iter().collect();
    let diff = vec![
        FileDiff {
            path: "src/in.ts".to_string(),
            status: DiffStatus::Renamed,
            old_path: Some("scripts/out.ts".to_string()),
        },
        FileDiff {
            path: "scripts/gone.ts".to_string(),
            status: DiffStatus::Renamed,
            old_path: Some("src/gone.ts".to_string()),
        },
        FileDiff::new("docs/readme.md", DiffStatus::Modified),
        // Matches the globs but was not found by the walk.
        FileDiff::new("src/ignored.ts", DiffStatus::Modified),
    ];

    assert_eq!(
        scope_to_filter(diff, &filter, &present),
        vec![
            FileDiff::new("src/gone.ts", DiffStatus::Deleted),
            FileDiff::new("src/in.ts", DiffStatus::Added),
        ]
    );
}

/// Force a full analysis and return its manifest.
fn forced_full(engine: &SyncEngine<FakeVcs>, root: &Path) -> AnalysisManifest {
    let result = engine
        .sync(&SyncOptions {
            force_full: true,
            ..SyncOptions::default()
        })
        .unwrap();
    assert_eq!(result.mode, SyncMode::Full);
    manifest(root)
}

#[test]
fn test_ignored_tracked_file_stays_out_of_incremental_sync() {
    let dir = TempDir::new().unwrap();
    seed_project(dir.path());
    // Ignore files only apply inside a git work tree.
    fs::create_dir(dir.path().join(".git")).unwrap();
    write(dir.path(), ".gitignore", "gen/\n");
    write(dir.path(), "gen/api.ts", "import { c } from '../src/c';\nexport const api = c;\n");
    let engine = engine(dir.path(), FakeVcs::at("c1"));
    sync(&engine);
    assert!(manifest(dir.path()).module("gen/api.ts").is_none());

    write(dir.path(), "gen/api.ts", "import { c } from '../src/c';\nexport const api = c + 1;\n");
    write(dir.path(), "src/d.ts", "export function d(x: number) {}\n");
    engine.vcs().commit(
        "c2",
        vec![RawChange::new('M', "gen/api.ts"), RawChange::new('M', "src/d.ts")],
    );
    let result = sync(&engine);

    assert_eq!(result.mode, SyncMode::Incremental);
    assert_eq!(result.diff, vec![FileDiff::new("src/d.ts", DiffStatus::Modified)]);
    let incremental = manifest(dir.path());
    let full = forced_full(&engine, dir.path());
    assert_eq!(paths(&incremental), paths(&full));
    assert_eq!(incremental.dependency_graph, full.dependency_graph);
}

#[cfg(unix)]
#[test]
fn test_symlinked_source_stays_out_of_incremental_sync() {
    let dir = TempDir::new().unwrap();
    seed_project(dir.path());
    let engine = engine(dir.path(), FakeVcs::at("c1"));
    sync(&engine);

    std::os::unix::fs::symlink("c.ts", dir.path().join("src/link.ts")).unwrap();
    write(dir.path(), "src/d.ts", "export function d(x: number) {}\n");
    engine.vcs().commit(
        "c2",
        vec![RawChange::new('A', "src/link.ts"), RawChange::new('M', "src/d.ts")],
    );
    let result = sync(&engine);

    assert_eq!(result.mode, SyncMode::Incremental);
    assert_eq!(result.modules_reanalyzed, 1);
    let incremental = manifest(dir.path());
    assert!(incremental.module("src/link.ts").is_none());
    let full = forced_full(&engine, dir.path());
    assert_eq!(paths(&incremental), paths(&full));
}
