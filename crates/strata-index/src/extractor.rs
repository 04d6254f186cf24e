//! Module extraction: one file in, one [`Module`] (or a skip) out.

use crate::progress::{ProgressEvent, ProgressSink};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use strata_parser::{ExportInfo, ImportInfo, Language, ParserRegistry, Symbol, detect};
use tracing::{debug, info, warn};

/// SHA-256 of raw file bytes, lowercase hex.
pub fn hash_content(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// The analysis result for one file. Replaced wholesale on re-analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Repo-relative, POSIX-separated. The natural key.
    pub path: String,
    pub language: Language,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportInfo>,
    pub exports: Vec<ExportInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_doc: Option<String>,
    pub size: u64,
    pub line_count: usize,
    pub content_hash: String,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge { size: u64, limit: u64 },
    /// I/O failure or content that is not UTF-8.
    Unreadable(String),
    /// No language detected, or no parser registered for it.
    Unsupported,
    ParserPanicked,
}

impl SkipReason {
    /// Unsupported files are not analysis failures and are not counted.
    pub fn is_counted(&self) -> bool {
        !matches!(self, SkipReason::Unsupported)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooLarge { size, limit } => {
                write!(f, "file too large ({} > {} bytes)", size, limit)
            }
            SkipReason::Unreadable(e) => write!(f, "unreadable: {}", e),
            SkipReason::Unsupported => write!(f, "unsupported language"),
            SkipReason::ParserPanicked => write!(f, "parser panicked"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Extracted(Module),
    Skipped { path: String, reason: SkipReason },
}

/// Result of a batch. `modules` follows the order of the input paths.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub modules: Vec<Module>,
    /// Files skipped for a counted reason.
    pub skipped: usize,
    pub unsupported: usize,
}

#[derive(Debug, Clone)]
pub struct ModuleExtractor {
    registry: ParserRegistry,
    max_file_size: u64,
}

impl ModuleExtractor {
    pub fn new(registry: ParserRegistry, max_file_size: u64) -> Self {
        Self {
            registry,
            max_file_size,
        }
    }

    /// Extract one file. Never fails: every problem becomes a skip.
    pub fn extract(&self, root: &Path, rel_path: &str) -> Extraction {
        let skipped = |reason: SkipReason| {
            debug!("Skipping {}: {}", rel_path, reason);
            Extraction::Skipped {
                path: rel_path.to_string(),
                reason,
            }
        };

        let Some(parser) = detect(rel_path).and_then(|lang| self.registry.get(lang)) else {
            return skipped(SkipReason::Unsupported);
        };

        let full_path = root.join(rel_path);
        let size = match std::fs::metadata(&full_path) {
            Ok(meta) => meta.len(),
            Err(e) => return skipped(SkipReason::Unreadable(e.to_string())),
        };
        if size > self.max_file_size {
            return skipped(SkipReason::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        let bytes = match std::fs::read(&full_path) {
            Ok(bytes) => bytes,
            Err(e) => return skipped(SkipReason::Unreadable(e.to_string())),
        };
        let content_hash = hash_content(&bytes);
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => return skipped(SkipReason::Unreadable(e.to_string())),
        };

        let output = match catch_unwind(AssertUnwindSafe(|| parser.parse(&content, rel_path))) {
            Ok(output) => output,
            Err(_) => {
                warn!("Parser for {} panicked on {}", parser.language(), rel_path);
                return skipped(SkipReason::ParserPanicked);
            }
        };

        Extraction::Extracted(Module {
            path: rel_path.to_string(),
            language: parser.language(),
            symbols: output.symbols,
            imports: output.imports,
            exports: output.exports,
            module_doc: output.module_doc,
            size: content.len() as u64,
            line_count: content.lines().count(),
            content_hash,
            analyzed_at: Utc::now(),
        })
    }

    /// Extract `paths` on up to `workers` threads.
    ///
    /// Returns only once every file is done. Workers share nothing mutable
    /// apart from the completion counter used for progress.
    pub fn extract_batch(
        &self,
        root: &Path,
        paths: &[String],
        workers: usize,
        progress: &ProgressSink,
    ) -> BatchOutcome {
        let total = paths.len();
        progress.emit(ProgressEvent::Started { total });

        let completed = AtomicUsize::new(0);
        let run_one = |path: &String| {
            let extraction = self.extract(root, path);
            let current = completed.fetch_add(1, Ordering::Relaxed) + 1;
            progress.emit(ProgressEvent::File {
                current,
                total,
                path: path.clone(),
            });
            extraction
        };

        let extractions: Vec<Extraction> =
            match rayon::ThreadPoolBuilder::new().num_threads(workers.max(1)).build() {
                Ok(pool) => pool.install(|| paths.par_iter().map(run_one).collect()),
                Err(e) => {
                    warn!("Failed to build worker pool ({}), extracting sequentially", e);
                    paths.iter().map(run_one).collect()
                }
            };

        let mut outcome = BatchOutcome::default();
        for extraction in extractions {
            match extraction {
                Extraction::Extracted(module) => outcome.modules.push(module),
                Extraction::Skipped { reason, .. } if reason.is_counted() => outcome.skipped += 1,
                Extraction::Skipped { .. } => outcome.unsupported += 1,
            }
        }

        progress.emit(ProgressEvent::Finished {
            extracted: outcome.modules.len(),
            skipped: outcome.skipped,
        });
        info!(
            "Extracted {} modules ({} skipped, {} unsupported)",
            outcome.modules.len(),
            outcome.skipped,
            outcome.unsupported
        );
        outcome
    }
}
