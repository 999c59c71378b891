//! hgferry CLI - hgferry command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod git;

/// hgferry - turn git commits into Mercurial bundles
#[derive(Parser)]
#[command(name = "hgferry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a Mercurial bundle from a git revision range
    Bundle {
        /// Bundle format version
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=2))]
        version: u8,

        /// Path of the bundle
        path: PathBuf,

        /// Git revision range (see the Specifying Ranges section of
        /// gitrevisions(7))
        #[arg(required = true)]
        rev: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Bundle { version, path, rev } => cmd::bundle::run(version, &path, &rev),
    }
}
