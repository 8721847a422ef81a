//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Does NOT perform repository mutations directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! the engine modules ([`crate::patches`], [`crate::status`],
//! [`crate::bootstrap`], [`crate::sync`]) for execution. Typed engine
//! errors become `anyhow` errors only here, at the boundary.

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

/// Execution context shared by all command handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory to operate in; current directory when unset.
    pub cwd: Option<PathBuf>,
    /// Suppress non-essential output.
    pub quiet: bool,
}

impl Context {
    /// The directory the command operates in.
    pub fn working_dir(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("cannot determine current directory"),
        }
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.debug);

    let ctx = Context {
        cwd: cli.cwd.clone(),
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Initialize the tracing subscriber.
///
/// `--debug` forces debug-level output; otherwise `RUST_LOG` applies,
/// defaulting to warnings only.
fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if debug {
        EnvFilter::new("sgsync=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
