//! Kiln: a single-flight compile worker speaking newline-delimited JSON.
//!
//! Reads requests from stdin, writes responses to stdout and logs to stderr.

#![warn(missing_docs)]

mod bootstrap;

use std::path::PathBuf;
use std::process;

use clap::Parser;

/// Kiln compile worker.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln compile worker")]
pub struct Cli {
    /// Suppress all log output except errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose (debug-level) log output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to a `kiln.toml` configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Scratch root directory, overriding `paths.root`.
    #[arg(long)]
    pub root: Option<PathBuf>,
}

impl Cli {
    /// The log level selected by `--quiet` and `--verbose`.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            log::LevelFilter::Error
        } else if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = bootstrap::run(&cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
