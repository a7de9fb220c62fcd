//! importwatch: batch-file import watcher.
//!
//! # Usage
//!
//! ```text
//! importwatch run [--config <path>] [--log-json]
//! importwatch records [--config <path>] [--result pending|imported|failed|interrupted] [--json]
//! importwatch classify <file-name> [--config <path>] [--report]
//! importwatch check-config [--config <path>]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    check_config::CheckConfigArgs, classify::ClassifyArgs, records::RecordsArgs, run::RunArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "importwatch",
    version,
    about = "Track batch files through an external import job and report failures",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the watcher service in the foreground until ctrl-c.
    Run(RunArgs),

    /// List registry records.
    Records(RecordsArgs),

    /// Judge a batch file from its artifacts without touching the registry.
    Classify(ClassifyArgs),

    /// Load and validate the configuration file.
    CheckConfig(CheckConfigArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Records(args) => args.run(),
        Commands::Classify(args) => args.run(),
        Commands::CheckConfig(args) => args.run(),
    }
}
