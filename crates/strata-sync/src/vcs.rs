//! Version-control access: the [`VersionControl`] port, its git
//! implementation, and classification of raw changes into [`FileDiff`]s.

use crate::error::VcsError;
use git2::{Commit, Delta, DiffFindOptions, Oid, Repository};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use tracing::debug;

/// One changed path as reported by version control, before classification.
/// `status` is a git-style status letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub path: String,
    pub old_path: Option<String>,
    pub status: char,
}

impl RawChange {
    pub fn new(status: char, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            old_path: None,
            status,
        }
    }

    pub fn renamed(old_path: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            old_path: Some(old_path.into()),
            status: 'R',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    pub path: String,
    pub status: DiffStatus,
    /// Prior path, set for renames only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

impl FileDiff {
    pub fn new(path: impl Into<String>, status: DiffStatus) -> Self {
        Self {
            path: path.into(),
            status,
            old_path: None,
        }
    }
}

/// Map status letters onto [`DiffStatus`]: copies count as additions,
/// type changes as modifications, and a rename without a prior path as an
/// addition. Unknown letters are dropped. The result is sorted by path.
pub fn classify(changes: Vec<RawChange>) -> Vec<FileDiff> {
    let mut diffs: Vec<FileDiff> = changes
        .into_iter()
        .filter_map(|change| {
            let status = match change.status {
                'A' | 'C' => DiffStatus::Added,
                'M' | 'T' => DiffStatus::Modified,
                'D' => DiffStatus::Deleted,
                'R' if change.old_path.is_some() => DiffStatus::Renamed,
                'R' => DiffStatus::Added,
                other => {
                    debug!("Ignoring change {} with status {:?}", change.path, other);
                    return None;
                }
            };
            Some(FileDiff {
                old_path: change.old_path.filter(|_| status == DiffStatus::Renamed),
                path: change.path,
                status,
            })
        })
        .collect();
    diffs.sort_by(|a, b| a.path.cmp(&b.path));
    diffs
}

/// What the sync engine needs from version control.
pub trait VersionControl {
    /// Full SHA of HEAD.
    fn current_commit(&self) -> Result<String, VcsError>;

    /// Branch HEAD points at, `None` when detached.
    fn current_branch(&self) -> Result<Option<String>, VcsError>;

    /// True if `sha` names a commit that is HEAD or an ancestor of HEAD.
    /// A commit rewritten away by a force-push or rebase is not reachable.
    fn is_reachable(&self, sha: &str) -> Result<bool, VcsError>;

    /// Files changed between two commits, paths relative to the analysed
    /// root.
    fn diff(&self, from: &str, to: &str) -> Result<Vec<RawChange>, VcsError>;
}

/// [`VersionControl`] over a git repository.
pub struct GitRepository {
    repo: Repository,
    /// Analysed root relative to the work tree (`None` at the top).
    prefix: Option<String>,
}

impl GitRepository {
    /// Open the repository containing `root`.
    pub fn discover(root: &Path) -> Result<Self, VcsError> {
        let repo = Repository::discover(root).map_err(|source| VcsError::NotFound {
            path: root.to_path_buf(),
            source,
        })?;
        let prefix = repo.workdir().and_then(|workdir| subdirectory(workdir, root));
        if let Some(prefix) = &prefix {
            debug!("Analysing subdirectory {:?} of the work tree", prefix);
        }
        Ok(Self { repo, prefix })
    }

    fn find(&self, sha: &str) -> Option<Commit<'_>> {
        self.repo
            .revparse_single(sha)
            .and_then(|object| object.peel_to_commit())
            .ok()
    }

    fn head_oid(&self) -> Result<Oid, VcsError> {
        let commit = self
            .repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(VcsError::Head)?;
        Ok(commit.id())
    }

    /// Re-root a work-tree path onto the analysed root; `None` if outside.
    fn reroot(&self, path: &Path) -> Option<String> {
        let path = path.to_string_lossy().replace('\\', "/");
        match &self.prefix {
            None => Some(path),
            Some(prefix) => path
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .map(str::to_string),
        }
    }
}

/// `root` relative to `workdir` in POSIX form, `None` if they are the same
/// directory or cannot be compared.
fn subdirectory(workdir: &Path, root: &Path) -> Option<String> {
    let workdir = workdir.canonicalize().ok()?;
    let root = root.canonicalize().ok()?;
    let rel = root.strip_prefix(&workdir).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

impl VersionControl for GitRepository {
    fn current_commit(&self) -> Result<String, VcsError> {
        Ok(self.head_oid()?.to_string())
    }

    fn current_branch(&self) -> Result<Option<String>, VcsError> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(_) => return Ok(None),
        };
        if !head.is_branch() {
            return Ok(None);
        }
        Ok(head.shorthand().map(str::to_string))
    }

    fn is_reachable(&self, sha: &str) -> Result<bool, VcsError> {
        let Some(commit) = self.find(sha) else {
            return Ok(false);
        };
        let head = self.head_oid()?;
        if commit.id() == head {
            return Ok(true);
        }
        self.repo
            .graph_descendant_of(head, commit.id())
            .map_err(VcsError::git("graph_descendant_of"))
    }

    fn diff(&self, from: &str, to: &str) -> Result<Vec<RawChange>, VcsError> {
        let old = self
            .find(from)
            .ok_or_else(|| VcsError::UnknownCommit(from.to_string()))?;
        let new = self
            .find(to)
            .ok_or_else(|| VcsError::UnknownCommit(to.to_string()))?;
        let old_tree = old.tree().map_err(VcsError::git("tree"))?;
        let new_tree = new.tree().map_err(VcsError::git("tree"))?;

        let mut diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)
            .map_err(VcsError::git("diff"))?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))
            .map_err(VcsError::git("find_similar"))?;

        let mut changes = Vec::new();
        for delta in diff.deltas() {
            let status = match delta.status() {
                Delta::Added => 'A',
                Delta::Deleted => 'D',
                Delta::Modified => 'M',
                Delta::Renamed => 'R',
                Delta::Copied => 'C',
                Delta::Typechange => 'T',
                _ => continue,
            };
            let new_path = delta.new_file().path().and_then(|p| self.reroot(p));
            let old_path = delta.old_file().path().and_then(|p| self.reroot(p));

            let change = match (status, old_path, new_path) {
                ('D', Some(old), _) => RawChange::new('D', old),
                ('R', Some(old), Some(new)) => RawChange::renamed(old, new),
                // Moved into or out of the analysed root.
                ('R', None, Some(new)) => RawChange::new('A', new),
                ('R', Some(old), None) => RawChange::new('D', old),
                (status, _, Some(new)) if status != 'D' && status != 'R' => {
                    RawChange::new(status, new)
                }
                _ => continue,
            };
            changes.push(change);
        }

        debug!("{} changes between {} and {}", changes.len(), from, to);
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{IndexAddOption, Signature};
    use std::fs;
    use tempfile::TempDir;

    fn commit_all(repo: &Repository, message: &str) -> String {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
            .to_string()
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_classify() {
        let diffs = classify(vec![
            RawChange::new('M', "b.ts"),
            RawChange::new('A', "a.ts"),
            RawChange::new('C', "copy.ts"),
            RawChange::new('T', "link.ts"),
            RawChange::new('D', "gone.ts"),
            RawChange::renamed("old.ts", "new.ts"),
            RawChange::new('R', "orphan.ts"),
            RawChange::new('X', "weird.ts"),
        ]);

        let summary: Vec<_> = diffs.iter().map(|d| (d.path.as_str(), d.status)).collect();
        assert_eq!(
            summary,
            vec![
                ("a.ts", DiffStatus::Added),
                ("b.ts", DiffStatus::Modified),
                ("copy.ts", DiffStatus::Added),
                ("gone.ts", DiffStatus::Deleted),
                ("link.ts", DiffStatus::Modified),
                ("new.ts", DiffStatus::Renamed),
                ("orphan.ts", DiffStatus::Added),
            ]
        );
        assert_eq!(diffs[5].old_path.as_deref(), Some("old.ts"));
        assert!(diffs[6].old_path.is_none());
    }

    #[test]
    fn test_file_diff_json() {
        let diff = FileDiff::new("a.ts", DiffStatus::Added);
        assert_eq!(
            serde_json::to_string(&diff).unwrap(),
            r#"{"path":"a.ts","status":"added"}"#
        );
    }

    #[test]
    fn test_discover_outside_repository_fails() {
        let dir = TempDir::new().unwrap();
        let result = GitRepository::discover(dir.path());
        assert!(matches!(result, Err(VcsError::NotFound { .. })));
    }

    #[test]
    fn test_git_diff_statuses() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let body = "export function keep() { return 'a fairly long body so rename detection works'; }\n";
        write(dir.path(), "src/a.ts", "export const a = 1;\n");
        write(dir.path(), "src/b.ts", "export const b = 1;\n");
        write(dir.path(), "src/old.ts", body);
        let first = commit_all(&repo, "first");

        write(dir.path(), "src/a.ts", "export const a = 2;\n");
        fs::remove_file(dir.path().join("src/b.ts")).unwrap();
        fs::rename(dir.path().join("src/old.ts"), dir.path().join("src/new.ts")).unwrap();
        write(dir.path(), "src/c.ts", "export const c = 3;\n");
        let second = commit_all(&repo, "second");

        let git = GitRepository::discover(dir.path()).unwrap();
        assert_eq!(git.current_commit().unwrap(), second);

        let diffs = classify(git.diff(&first, &second).unwrap());
        let summary: Vec<_> = diffs.iter().map(|d| (d.path.as_str(), d.status)).collect();
        assert_eq!(
            summary,
            vec![
                ("src/a.ts", DiffStatus::Modified),
                ("src/b.ts", DiffStatus::Deleted),
                ("src/c.ts", DiffStatus::Added),
                ("src/new.ts", DiffStatus::Renamed),
            ]
        );
        assert_eq!(diffs[3].old_path.as_deref(), Some("src/old.ts"));

        assert!(git.diff(&second, &second).unwrap().is_empty());
    }

    #[test]
    fn test_reachability() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.py", "x = 1\n");
        let first = commit_all(&repo, "first");
        write(dir.path(), "a.py", "x = 2\n");
        let second = commit_all(&repo, "second");

        let git = GitRepository::discover(dir.path()).unwrap();
        assert!(git.is_reachable(&first).unwrap());
        assert!(git.is_reachable(&second).unwrap());
        assert!(git.is_reachable(&first[..10]).unwrap());
        assert!(!git.is_reachable("0123456789abcdef0123456789abcdef01234567").unwrap());
        assert!(!git.is_reachable("not-a-sha").unwrap());

        // Rewind HEAD: the second commit still exists but is no longer an ancestor.
        let first_commit = repo.find_commit(Oid::from_str(&first).unwrap()).unwrap();
        repo.reset(first_commit.as_object(), git2::ResetType::Hard, None)
            .unwrap();
        assert!(!git.is_reachable(&second).unwrap());
    }

    #[test]
    fn test_branch_name() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "main.go", "package main\n");
        commit_all(&repo, "init");

        let git = GitRepository::discover(dir.path()).unwrap();
        let head = repo.head().unwrap();
        assert_eq!(git.current_branch().unwrap().as_deref(), head.shorthand());
        assert!(git.current_branch().unwrap().is_some());
    }

    #[test]
    fn test_subdirectory_root_is_rerooted() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "web/src/app.ts", "export const a = 1;\n");
        write(dir.path(), "api/main.go", "package main\n");
        let first = commit_all(&repo, "first");
        write(dir.path(), "web/src/app.ts", "export const a = 2;\n");
        write(dir.path(), "api/main.go", "package main\n\nfunc main() {}\n");
        let second = commit_all(&repo, "second");

        let git = GitRepository::discover(&dir.path().join("web")).unwrap();
        let changes = git.diff(&first, &second).unwrap();
        assert_eq!(changes, vec![RawChange::new('M', "src/app.ts")]);
    }

    #[test]
    fn test_unknown_commit_in_diff_is_an_error() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "a.py", "x = 1\n");
        let head = commit_all(&repo, "first");
        let git = GitRepository::discover(dir.path()).unwrap();
        assert!(matches!(
            git.diff("ffffffffffffffffffffffffffffffffffffffff", &head),
            Err(VcsError::UnknownCommit(_))
        ));
    }
}
