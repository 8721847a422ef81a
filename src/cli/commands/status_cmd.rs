//! status command - show pending synchronization on both sides

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::git::Git;
use crate::status::sync_status;

/// Show the synchronization status between source-git and dist-git.
pub fn status(ctx: &Context, dist_git: &Path, json: bool) -> Result<()> {
    let source_dir = ctx.working_dir()?;
    let source = Git::open(&source_dir).context("cannot open source-git repository")?;
    let dist = Git::open(dist_git).context("cannot open dist-git repository")?;

    let status = sync_status(&source, &dist)?;

    if json {
        let value = serde_json::json!({
            "source_git_range_start": status.source_git_range_start.as_ref().map(|o| o.as_str()),
            "dist_git_range_start": status.dist_git_range_start.as_ref().map(|o| o.as_str()),
            "synced": status.is_synced(),
            "diverged": status.is_diverged(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if status.is_synced() {
        println!("Repositories are in sync.");
        return Ok(());
    }

    match &status.source_git_range_start {
        Some(oid) => println!(
            "source-git has unsynchronized commits starting at {}",
            oid.short(12)
        ),
        None => println!("source-git is fully reflected in dist-git"),
    }
    match &status.dist_git_range_start {
        Some(oid) => println!(
            "dist-git has unsynchronized commits starting at {}",
            oid.short(12)
        ),
        None => println!("dist-git is fully reflected in source-git"),
    }
    if status.is_diverged() {
        println!("Both sides have pending commits: the repositories have diverged.");
    }

    Ok(())
}
