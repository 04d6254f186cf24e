//! Show the last sync and whether it is current

use anyhow::Result;
use std::path::Path;

use super::common::open_engine;

pub fn status(path: &Path, json: bool) -> Result<()> {
    let engine = open_engine(path)?;
    let status = engine.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("strata status");
    println!("=============");
    println!("Root: {:?}", engine.root());
    println!("HEAD: {}", status.current_commit);

    let Some(last) = &status.last_commit else {
        println!("Never synced. Run 'strata sync' first.");
        return Ok(());
    };

    println!("Last synced commit: {}", last);
    if let Some(at) = status.last_synced_at {
        println!("Last synced at: {}", at.to_rfc3339());
    }
    println!("Modules: {}", status.total_modules);
    println!(
        "Manifest: {}",
        if status.manifest_valid { "valid" } else { "missing or invalid" }
    );
    if !status.base_reachable {
        println!("Last synced commit is no longer in history; next sync runs a full analysis.");
    }
    println!(
        "State: {}",
        if status.up_to_date { "up to date" } else { "behind HEAD" }
    );
    Ok(())
}
