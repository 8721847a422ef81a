//! init command - bootstrap a source-git repository

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::bootstrap::Bootstrapper;
use crate::cli::Context;
use crate::external::LocalCommandRunner;
use crate::git::Git;

/// Bootstrap a source-git repository from the upstream checkout in the
/// working directory and the dist-git checkout at `dist_git`.
pub fn init(
    ctx: &Context,
    dist_git: &Path,
    upstream_ref: &str,
    ignore_missing_autosetup: bool,
    squash_patches: bool,
    patch_id_digits: usize,
) -> Result<()> {
    let source_dir = ctx.working_dir()?;
    let source = Git::open(&source_dir).context("cannot open upstream repository")?;
    let dist = Git::open(dist_git).context("cannot open dist-git repository")?;
    let runner = LocalCommandRunner;

    let outcome = Bootstrapper::new(&source, &dist, &runner)
        .patch_id_digits(patch_id_digits)
        .ignore_missing_autosetup(ignore_missing_autosetup)
        .squash_patches(squash_patches)
        .create_from_upstream(upstream_ref)?;

    if !ctx.quiet {
        println!(
            "created packaging subtree commit {}",
            outcome.subtree_commit.short(12)
        );
        println!(
            "replayed {} downstream patch commit(s)",
            outcome.patch_commits.len()
        );
    }

    Ok(())
}
