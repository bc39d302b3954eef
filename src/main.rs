//! assetdep: GUID dependency resolution for asset trees.

mod checker;
mod commands;
mod config;
mod error;
mod extract;
mod index;
mod meta;
mod report;
mod resolver;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Command line interface.
#[derive(Parser)]
#[command(name = "assetdep", about = "GUID dependency resolution for asset trees")]
struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Resolve dependencies and report only the issues found
    Check {
        /// Seed files to resolve
        files: Vec<PathBuf>,
        /// Emit the full report as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Mirror tree to consult for availability
        #[arg(long)]
        mirror: Option<PathBuf>,
        /// Index root; repeatable, earlier roots win on conflict
        #[arg(long)]
        root: Vec<PathBuf>,
    },
    /// Build the identifier index for a root and summarize it
    Index {
        /// Emit the summary as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Directory to index
        root: PathBuf,
    },
    /// Look one identifier up and print the owning asset path
    Query {
        /// The identifier, bare or hyphenated hex
        guid: String,
        /// Index root; repeatable, earlier roots win on conflict
        #[arg(long)]
        root: Vec<PathBuf>,
    },
    /// Compute the full dependency closure and print the report
    Resolve {
        /// Seed files to resolve
        files: Vec<PathBuf>,
        /// Emit the full report as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Mirror tree to consult for availability
        #[arg(long)]
        mirror: Option<PathBuf>,
        /// Index root; repeatable, earlier roots win on conflict
        #[arg(long)]
        root: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Check { files, json, mirror, root } => {
            commands::check(&files, &root, mirror.as_deref(), json)
        },
        Commands::Index { json, root } => commands::index(&root, json),
        Commands::Query { guid, root } => commands::query(&guid, &root),
        Commands::Resolve { files, json, mirror, root } => {
            commands::resolve(&files, &root, mirror.as_deref(), json)
        },
    };

    match outcome {
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        },
        Ok(code) => return code,
    }
}
