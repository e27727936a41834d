//! csgedit CLI - transform normalization for CSG databases
//!
//! Runs push, xpush and pull against a JSON object database and writes the
//! result back to the same file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;

#[derive(Parser)]
#[command(name = "csgedit")]
#[command(about = "Push, xpush and pull placement matrices in a CSG database", long_about = None)]
struct Cli {
    /// Database file
    #[arg(long, global = true, default_value = "csgedit.json")]
    db: PathBuf,

    /// Engine configuration (default: csgedit.toml next to the database)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bake leaf matrices into solid geometry
    Push {
        /// Accepted for compatibility; pushes always run on one thread
        #[arg(short = 'P', value_name = "N")]
        parallel: Option<usize>,
        /// Trace the walk
        #[arg(short)]
        debug: bool,
        /// Objects to push
        #[arg(required = true)]
        objects: Vec<String>,
    },
    /// Push a shared hierarchy, duplicating objects as needed
    Xpush {
        /// Combination to push
        object: String,
    },
    /// Move solids into their natural frames and hoist the placements
    Pull {
        /// Trace the walk
        #[arg(short)]
        debug: bool,
        /// Combination to pull
        object: String,
    },
    /// Drop every leaf matrix below an object
    Identitize {
        /// Root object
        object: String,
    },
    /// Print an object's hierarchy
    Tree {
        /// Root object
        object: String,
    },
    /// List an object's solids in world coordinates
    Solids {
        /// Root object
        object: String,
    },
    /// Summarize the database
    Info,
}

/// Outcome of a command, as reported to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Error,
    Help,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => ExitCode::SUCCESS,
            Status::Error => ExitCode::from(1),
            Status::Help => ExitCode::from(2),
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return Status::Help.into();
        }
    };

    let debug = matches!(
        cli.command,
        Commands::Push { debug: true, .. } | Commands::Pull { debug: true, .. }
    );
    let level = if debug {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let status = match commands::run(&cli) {
        Ok(()) => Status::Ok,
        Err(e) => {
            eprintln!("error: {e:#}");
            Status::Error
        }
    };
    status.into()
}
