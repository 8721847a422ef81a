//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the engine modules to execute the command
//! 3. Formats and displays output
//!
//! Handlers do NOT implement synchronization logic themselves.

mod init;
mod status_cmd;
mod sync_files;
mod update_dist_git;

pub use init::init;
pub use status_cmd::status;
pub use sync_files::sync_files;
pub use update_dist_git::update_dist_git;

use anyhow::Result;

use crate::cli::args::Command;
use crate::cli::Context;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Status { dist_git, json } => status(ctx, &dist_git, json),
        Command::UpdateDistGit {
            dist_git,
            job,
            since,
            no_commit,
        } => update_dist_git(ctx, &dist_git, job.as_deref(), since.as_deref(), no_commit),
        Command::Init {
            dist_git,
            upstream_ref,
            ignore_missing_autosetup,
            squash_patches,
            patch_id_digits,
        } => init(
            ctx,
            &dist_git,
            &upstream_ref,
            ignore_missing_autosetup,
            squash_patches,
            patch_id_digits,
        ),
        Command::SyncFiles { dist_git, job } => sync_files(ctx, &dist_git, job.as_deref()),
    }
}
