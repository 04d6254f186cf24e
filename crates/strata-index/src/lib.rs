pub mod config;
pub mod discovery;
pub mod exclusions;
pub mod extractor;
pub mod graph;
pub mod manifest;
pub mod progress;
pub mod store;

pub use config::StrataConfig;
pub use discovery::{FileFilter, discover};
pub use exclusions::{DEFAULT_MAX_FILE_SIZE, EXCLUDED_DIRS, should_exclude_entry, should_exclude_path};
pub use extractor::{BatchOutcome, Extraction, Module, ModuleExtractor, SkipReason, hash_content};
pub use graph::{DependencyEdge, DependencyGraph};
pub use manifest::{AnalysisManifest, AnalysisStats, ManifestContext, ProjectMeta, TOOL_VERSION};
pub use progress::{ProgressEvent, ProgressSink};
pub use store::{StateStore, SyncState, load_manifest, save_manifest, validate_manifest};
