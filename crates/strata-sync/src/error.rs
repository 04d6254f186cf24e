use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to version control. Always fatal to a sync.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("no git repository found at {path:?}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("failed to resolve HEAD: {0}")]
    Head(#[source] git2::Error),

    #[error("commit {0} not found")]
    UnknownCommit(String),

    #[error("git {operation} failed: {source}")]
    Git {
        operation: &'static str,
        #[source]
        source: git2::Error,
    },
}

impl VcsError {
    pub(crate) fn git(operation: &'static str) -> impl FnOnce(git2::Error) -> Self {
        move |source| VcsError::Git { operation, source }
    }
}

/// Errors a sync surfaces to its caller. Corrupt state, missing manifests,
/// unreachable commits and per-file failures are handled by falling back
/// and never show up here.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error("file discovery failed: {0:#}")]
    Discovery(anyhow::Error),

    #[error("failed to persist sync results: {0:#}")]
    Persist(anyhow::Error),
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
