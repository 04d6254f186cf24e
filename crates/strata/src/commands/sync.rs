//! Sync the analysis manifest with the current commit

use anyhow::Result;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use strata_index::{ProgressEvent, ProgressSink};
use strata_sync::{SyncMode, SyncOptions, SyncResult};
use tracing::{debug, info};

use super::common::open_engine;

/// Log every this many files during extraction.
const PROGRESS_INTERVAL: usize = 100;

pub struct SyncArgs {
    pub dry_run: bool,
    pub since: Option<String>,
    pub full: bool,
    pub json: bool,
}

pub fn sync(path: &Path, args: SyncArgs) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let engine = open_engine(path)?.with_progress(ProgressSink::channel(tx));
    info!("Syncing {:?}", engine.root());

    let reporter = thread::spawn(move || {
        for event in rx {
            match event {
                ProgressEvent::Started { total } => debug!("Extracting {} files", total),
                ProgressEvent::File {
                    current,
                    total,
                    path,
                } => {
                    if current % PROGRESS_INTERVAL == 0 || current == total {
                        info!("Processed {}/{} files", current, total);
                    }
                    debug!("Processed {}", path);
                }
                ProgressEvent::Finished { .. } => {}
            }
        }
    });

    let options = SyncOptions {
        dry_run: args.dry_run,
        since: args.since,
        force_full: args.full,
    };
    let result = engine.sync(&options);
    drop(engine);
    let _ = reporter.join();
    let result = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn print_summary(result: &SyncResult) {
    let short = |sha: &str| sha.chars().take(10).collect::<String>();

    match result.mode {
        SyncMode::NoChanges => {
            println!("Already up to date at {}", short(&result.current_commit));
            return;
        }
        SyncMode::Full => {
            let reason = result
                .full_analysis_reason
                .map(|r| format!(" ({:?})", r))
                .unwrap_or_default();
            println!("Full analysis{} at {}", reason, short(&result.current_commit));
        }
        SyncMode::Incremental => println!(
            "Incremental sync {} -> {}",
            short(&result.previous_commit),
            short(&result.current_commit)
        ),
        SyncMode::DryRun => println!(
            "Dry run {} -> {} (nothing written)",
            short(&result.previous_commit),
            short(&result.current_commit)
        ),
    }

    if result.mode != SyncMode::Full {
        for diff in &result.diff {
            match &diff.old_path {
                Some(old) => println!("  {:?}: {} -> {}", diff.status, old, diff.path),
                None => println!("  {:?}: {}", diff.status, diff.path),
            }
        }
    }
    if !result.impacted_modules.is_empty() {
        println!("Impacted modules:");
        for path in &result.impacted_modules {
            println!("  {}", path);
        }
    }

    println!();
    println!("  Files changed: {}", result.diff.len());
    println!("  Modules re-analysed: {}", result.modules_reanalyzed);
    println!("  Pages affected: {}", result.pages_affected);
    println!("  Skipped files: {}", result.skipped_files);
    println!("  Time: {:.2}s", result.duration_ms as f64 / 1000.0);
    if let Some(manifest) = &result.manifest_path {
        println!("  Manifest: {}", manifest);
    }
}
