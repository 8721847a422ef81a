//! patches
//!
//! Patch engine: turns a commit range into a numbered, linear patch file
//! series plus the matching specfile declarations.
//!
//! The series is strictly linear even when the underlying history is a
//! DAG: merge-containing ranges are reduced to run descriptors first
//! (see [`linearize`]), and each run becomes exactly one patch. The
//! emitted sequence, not the original branch, is what a build-time
//! `%autopatch -pN` invocation applies in order.

pub mod linearize;
pub mod specfile;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::config::PackageConfig;
use crate::core::types::{Oid, PatchId, TypeError};
use crate::git::{Git, GitError, Identity};
use linearize::{linearize, Run, RunKind};

/// Errors from patch generation and specfile editing.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The specfile has no `Source*` or `Patch*` declaration to anchor
    /// the generated patch block on.
    #[error("no Source or Patch declaration in specfile: {path}")]
    NoDeclarationAnchor { path: PathBuf },
}

impl PatchError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        PatchError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Metadata describing one emitted (or parsed) patch.
///
/// Created per run during generation, or per downstream patch file during
/// bootstrap; consumed once and never mutated - regeneration creates
/// fresh instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchMetadata {
    /// Patch file name.
    pub name: String,
    /// Whether the patch stands for several squashed commits.
    pub squash_commits: bool,
    /// Whether the specfile already declares this patch.
    pub present_in_specfile: bool,
    /// 1-based position in the series.
    pub patch_id: Option<usize>,
}

/// One generated patch: the file on disk plus its metadata.
#[derive(Debug, Clone)]
pub struct GeneratedPatch {
    /// Where the patch file was written.
    pub path: PathBuf,
    /// Metadata for this patch.
    pub metadata: PatchMetadata,
    /// Combined commit message(s) of the run, used for the specfile
    /// comment block.
    pub message: String,
}

/// Generate the numbered patch series for `(start, head]`.
///
/// Commits are enumerated first-parent. When the range contains merges,
/// the full (non-first-parent) history is linearized into runs and
/// replayed commit by commit into a synthetic linear sequence, pinned by
/// a disposable `sgsync-patches-<short>` branch until the files are
/// written; the same replay covers named runs whose commits are
/// interleaved with unrelated work, so no hunk ever lands in two
/// patches. Each patch is the diff between consecutive points of the
/// (replayed or original) sequence, excluding the configured ignore
/// paths. Runs whose diff is empty after exclusion (changes only under
/// ignored paths) emit nothing.
///
/// Patch files are written to `output_dir` as
/// `{index:0N}-{slug}.patch` (or under their `Patch-name` for named
/// runs), with a leading `# ` comment block carrying the original commit
/// subject(s) and author. Rerunning over an unchanged range rewrites
/// byte-identical files.
pub fn generate_patches(
    git: &Git,
    config: &PackageConfig,
    start: &Oid,
    head: &Oid,
    output_dir: &Path,
) -> Result<Vec<GeneratedPatch>, PatchError> {
    let mainline = git.log_range(Some(start), head, true)?;
    let mainline_oids: HashSet<Oid> = mainline.iter().map(|c| c.oid.clone()).collect();
    let has_merge = mainline.iter().any(|c| c.is_merge());

    let runs = if has_merge {
        // A linear one-patch-per-commit model cannot replay a merge.
        let full = git.log_range(Some(start), head, false)?;
        linearize(&full, &mainline_oids)
    } else {
        linearize(&mainline, &mainline_oids)
    };

    // Endpoint diffs only compose into a linearly applicable series when
    // every run is an unbroken parent chain: a run with interleaved
    // foreign commits would absorb their changes into its endpoint diff
    // while they also emit their own patches.
    let branch = format!("sgsync-patches-{}", start.short(7));
    let replayed = has_merge || runs.iter().any(|run| !is_contiguous(run));
    let segments: Vec<(Option<Oid>, Oid)> = if replayed {
        replay_runs(git, &runs, start, &branch)?
    } else {
        runs.iter()
            .map(|run| (run.base.clone(), run.end.clone()))
            .collect()
    };

    fs::create_dir_all(output_dir).map_err(|e| PatchError::io(output_dir, e))?;

    let digits = config.patch_generation_patch_id_digits;
    let mut patches = Vec::new();

    for (run, (base, end)) in runs.iter().zip(segments.iter()) {
        let Some(rep) = run.commits.last() else {
            continue;
        };

        let diff = git.diff_range(
            base.as_ref(),
            end,
            &config.patch_generation_ignore_paths,
        )?;
        if diff.is_empty() {
            debug!(commit = %run.end.short(7), "run touches only ignored paths, skipping");
            continue;
        }

        let id = PatchId::new(patches.len() + 1)?;
        let name = match &run.patch_name {
            Some(name) => with_patch_suffix(name),
            None => format!("{}-{}.patch", id.render(digits), slugify(&rep.summary)),
        };

        let mut content = String::new();
        for commit in &run.commits {
            content.push_str(&format!("# {}\n", commit.summary));
        }
        content.push_str(&format!("# Author: {}\n\n", rep.author()));
        content.push_str(&diff);

        let path = output_dir.join(&name);
        fs::write(&path, &content).map_err(|e| PatchError::io(&path, e))?;

        let message = run
            .commits
            .iter()
            .map(|c| c.message.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n\n");

        patches.push(GeneratedPatch {
            path,
            metadata: PatchMetadata {
                name,
                squash_commits: run.kind == RunKind::NamedSquash && run.commits.len() > 1
                    || config.patch_generation_squash_commits,
                present_in_specfile: false,
                patch_id: Some(id.value()),
            },
            message,
        });
    }

    if replayed {
        git.delete_branch(&branch)?;
    }

    Ok(patches)
}

/// Whether each commit's first parent is the previous commit in the run.
fn is_contiguous(run: &Run) -> bool {
    run.commits
        .windows(2)
        .all(|pair| pair[1].parents.first() == Some(&pair[0].oid))
}

/// Rebuild the runs as a strictly linear commit sequence and return each
/// run's `(base, end)` endpoints within it.
///
/// Every constituent commit's own diff is applied, in run order, on top
/// of the previous synthetic commit; the named branch pins the sequence
/// until the patch files have been written. A commit whose changes no
/// longer apply after reordering fails with a patch-apply error instead
/// of producing a series that would not replay.
fn replay_runs(
    git: &Git,
    runs: &[Run],
    start: &Oid,
    branch: &str,
) -> Result<Vec<(Option<Oid>, Oid)>, PatchError> {
    debug!(branch, "replaying runs into a linear sequence");
    git.delete_branch(branch)?; // leftover from an aborted run

    let mut segments = Vec::with_capacity(runs.len());
    let mut prev = start.clone();
    for run in runs {
        let mut tip = prev.clone();
        for commit in &run.commits {
            let diff = git.diff_range(commit.parents.first(), &commit.oid, &[])?;
            if diff.is_empty() {
                continue;
            }
            let mut author = Identity::new(&commit.author_name, &commit.author_email);
            author.time = Some(commit.author_time);
            tip = git.apply_to_commit(&tip, &diff, &commit.message, Some(&author))?;
        }
        segments.push((Some(prev.clone()), tip.clone()));
        prev = tip;
    }

    git.create_branch(branch, &prev)?;
    Ok(segments)
}

/// Make sure a patch name carries the `.patch` suffix.
fn with_patch_suffix(name: &str) -> String {
    if name.ends_with(".patch") {
        name.to_string()
    } else {
        format!("{name}.patch")
    }
}

/// Turn a commit subject into a file name slug, the way `git
/// format-patch` does: non-alphanumeric runs become single dashes.
fn slugify(subject: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in subject.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug.truncate(64);
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "patch".to_string()
    } else {
        slug
    }
}
