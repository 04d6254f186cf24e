//! Incremental synchronisation of an analysis manifest with version-control
//! history.

pub mod engine;
pub mod error;
pub mod impact;
pub mod vcs;

pub use engine::{
    FullAnalysisReason, NO_PREVIOUS_COMMIT, SyncEngine, SyncMode, SyncOptions, SyncResult,
    SyncStatus,
};
pub use error::{Result, SyncError, VcsError};
pub use impact::impacted_modules;
pub use vcs::{DiffStatus, FileDiff, GitRepository, RawChange, VersionControl, classify};
