use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about = "Incremental structural analysis of source trees")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the analysis manifest up to date with the current commit
    Sync {
        /// Repository root to analyse
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Report what would change without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Diff against this commit instead of the last synced one
        #[arg(long, value_name = "SHA")]
        since: Option<String>,

        /// Ignore prior state and analyse every file
        #[arg(long)]
        full: bool,

        /// Print the sync result as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Show the last sync and whether it is current
    Status {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Print the status as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr so --json output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Sync {
            path,
            dry_run,
            since,
            full,
            json,
        } => commands::sync(
            &path,
            commands::SyncArgs {
                dry_run,
                since,
                full,
                json,
            },
        ),
        Commands::Status { path, json } => commands::status(&path, json),
    }
}
