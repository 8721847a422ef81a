//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sgsync - keeps source-git and dist-git repositories synchronized
#[derive(Parser, Debug)]
#[command(name = "sgs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if sgs was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show synchronization status between source-git and dist-git
    #[command(
        name = "status",
        long_about = "Show which commits are pending synchronization.\n\n\
            Walks both histories backward from HEAD looking for provenance \
            trailers (From-dist-git-commit / From-source-git-commit), picks \
            the most recently written synchronization point, and reports the \
            oldest unsynchronized commit on each side. Both sides pending \
            means the repositories have diverged.",
        after_help = "\
WORKFLOW EXAMPLES:
    # From the source-git checkout
    sgs status --dist-git ../dist-git

    # Machine-readable output for scripting
    sgs status --dist-git ../dist-git --json"
    )]
    Status {
        /// Path to the dist-git checkout
        #[arg(long, value_name = "PATH")]
        dist_git: PathBuf,

        /// Emit JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Propagate source-git changes into dist-git
    #[command(
        name = "update-dist-git",
        long_about = "Convert pending source-git commits into a downstream update.\n\n\
            Generates the numbered patch series for the unsynchronized commit \
            range, declares the new patches in the spec file, runs the \
            configured file sync, and commits the result to dist-git with a \
            From-source-git-commit provenance trailer.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Standard update
    sgs update-dist-git --dist-git ../dist-git

    # Use a named job's configuration overrides
    sgs update-dist-git --dist-git ../dist-git --job release

    # Override the range start instead of trailer discovery
    sgs update-dist-git --dist-git ../dist-git --since v0.1.0

    # Generate everything but commit nothing
    sgs update-dist-git --dist-git ../dist-git --no-commit"
    )]
    UpdateDistGit {
        /// Path to the dist-git checkout
        #[arg(long, value_name = "PATH")]
        dist_git: PathBuf,

        /// Configuration job to apply
        #[arg(long)]
        job: Option<String>,

        /// Generate patches since this revision instead of the discovered
        /// synchronization point
        #[arg(long, value_name = "REVISION")]
        since: Option<String>,

        /// Write patches and sync files but do not commit to dist-git
        #[arg(long)]
        no_commit: bool,
    },

    /// Bootstrap a source-git repository from upstream and dist-git
    #[command(
        name = "init",
        long_about = "Create a source-git repository on top of an upstream checkout.\n\n\
            Run inside a clone of the upstream project with the release ref \
            checked out. The dist-git tree is copied into .distro/, the \
            package configuration is generated, and every patch the spec \
            declares is replayed as regular commits carrying full provenance \
            trailers. The upstream history is never rewritten.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Inside the upstream clone, checked out at the packaged release
    sgs init --dist-git ../dist-git --upstream-ref 0.1.0

    # Spec without %autosetup (patches will not auto-apply at build time)
    sgs init --dist-git ../dist-git --upstream-ref 0.1.0 \\
        --ignore-missing-autosetup"
    )]
    Init {
        /// Path to the dist-git checkout
        #[arg(long, value_name = "PATH")]
        dist_git: PathBuf,

        /// Upstream ref the dist-git packaging corresponds to
        #[arg(long, value_name = "REF")]
        upstream_ref: String,

        /// Proceed even if the spec never uses %autosetup/%autopatch
        #[arg(long)]
        ignore_missing_autosetup: bool,

        /// Replay each patch file as a single commit
        #[arg(long)]
        squash_patches: bool,

        /// Zero-padding width recorded in the generated configuration
        #[arg(long, default_value = "4", value_name = "N")]
        patch_id_digits: usize,
    },

    /// Run the configured file synchronization on its own
    #[command(
        name = "sync-files",
        long_about = "Copy the configured files_to_sync entries into dist-git.\n\n\
            Applies each entry in declaration order: glob expansion, \
            recursive merge copy, optional deletion mirroring, with protect/ \
            exclude filters honored. Does not commit.",
        after_help = "\
WORKFLOW EXAMPLES:
    sgs sync-files --dist-git ../dist-git
    sgs sync-files --dist-git ../dist-git --job release"
    )]
    SyncFiles {
        /// Path to the dist-git checkout
        #[arg(long, value_name = "PATH")]
        dist_git: PathBuf,

        /// Configuration job to apply
        #[arg(long)]
        job: Option<String>,
    },
}
