//! sync-files command - run the configured file synchronization

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::config::{ConfigFile, CONFIG_FILE_NAME};
use crate::git::Git;

/// Copy the configured `files_to_sync` entries into dist-git.
pub fn sync_files(ctx: &Context, dist_git: &Path, job: Option<&str>) -> Result<()> {
    let source_dir = ctx.working_dir()?;
    let dist = Git::open(dist_git).context("cannot open dist-git repository")?;
    let dist_root = dist.workdir()?.to_path_buf();

    let config = ConfigFile::load(&source_dir.join(CONFIG_FILE_NAME))?
        .resolve(job)
        .context("cannot resolve package configuration")?;

    if config.files_to_sync.is_empty() {
        if !ctx.quiet {
            println!("no files_to_sync entries configured");
        }
        return Ok(());
    }

    for item in &config.files_to_sync {
        item.sync(&source_dir, &dist_root)?;
    }

    if !ctx.quiet {
        println!("applied {} sync entries", config.files_to_sync.len());
    }

    Ok(())
}
