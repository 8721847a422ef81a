//! update-dist-git command - propagate source-git changes downstream

use std::path::Path;

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::config::{ConfigFile, CONFIG_FILE_NAME};
use crate::core::trailers::{append_trailers, Trailer, FROM_SOURCE_GIT_COMMIT};
use crate::core::types::Oid;
use crate::git::Git;
use crate::patches::{generate_patches, specfile};
use crate::status::sync_status;

/// Turn pending source-git commits into a dist-git update.
pub fn update_dist_git(
    ctx: &Context,
    dist_git: &Path,
    job: Option<&str>,
    since: Option<&str>,
    no_commit: bool,
) -> Result<()> {
    let source_dir = ctx.working_dir()?;
    let source = Git::open(&source_dir).context("cannot open source-git repository")?;
    let dist = Git::open(dist_git).context("cannot open dist-git repository")?;

    let config = ConfigFile::load(&source_dir.join(CONFIG_FILE_NAME))?
        .resolve(job)
        .context("cannot resolve package configuration")?;

    dist.require_pristine()
        .context("dist-git must be pristine before updating")?;

    let head = source.head_oid()?;
    let start = match since {
        Some(rev) => source
            .resolve(rev)
            .with_context(|| format!("cannot resolve --since revision '{rev}'"))?,
        None => {
            let status = sync_status(&source, &dist)?;
            if status.is_diverged() {
                bail!(
                    "repositories have diverged; reconcile dist-git first or \
                     pass --since to choose the range explicitly"
                );
            }
            let Some(oldest_pending) = status.source_git_range_start else {
                if !ctx.quiet {
                    println!("dist-git is already up to date");
                }
                return Ok(());
            };
            range_base(&source, &oldest_pending)?
        }
    };

    let dist_root = dist.workdir()?.to_path_buf();
    let patches = generate_patches(&source, &config, &start, &head, &dist_root)?;

    let spec_name = config
        .specfile_path
        .file_name()
        .context("specfile_path has no file name")?;
    specfile::add_patches(
        &dist_root.join(spec_name),
        &patches,
        config.patch_generation_patch_id_digits,
    )?;

    for item in &config.files_to_sync {
        item.sync(&source_dir, &dist_root)?;
    }

    if !ctx.quiet {
        for patch in &patches {
            println!("wrote {}", patch.metadata.name);
        }
    }

    if no_commit {
        return Ok(());
    }

    if dist.worktree_status()?.is_pristine() {
        if !ctx.quiet {
            println!("nothing changed in dist-git");
        }
        return Ok(());
    }

    let message = append_trailers(
        &format!("Update from source-git ({} patches)", patches.len()),
        &[Trailer::new(FROM_SOURCE_GIT_COMMIT, head.as_str())],
    );
    let commit = dist.commit_all(&message, None)?;
    if !ctx.quiet {
        println!("committed {} to dist-git", commit.short(12));
    }

    Ok(())
}

/// The exclusive lower bound of the pending range: the parent of its
/// oldest commit.
fn range_base(source: &Git, oldest_pending: &Oid) -> Result<Oid> {
    let info = source.commit_info(oldest_pending)?;
    info.parents.first().cloned().context(
        "pending range starts at a root commit; pass --since to choose the range explicitly",
    )
}
