//! bootstrap
//!
//! One-shot creation of a source-git repository from an upstream
//! checkout and its dist-git counterpart.
//!
//! The bootstrapper works on top of the upstream history: it never
//! rewrites existing commits. Starting from the upstream ref checked
//! out at HEAD, it
//!
//! 1. copies the dist-git tree into the reserved `.distro/` subtree,
//! 2. writes the generated package configuration, commits both as one
//!    subtree commit, and
//! 3. replays every patch the spec declares, in declaration order, as
//!    regular commits with full provenance trailers.
//!
//! Every commit it creates carries a `From-dist-git-commit` trailer
//! naming the dist-git HEAD it was built from, so the status engine can
//! find the synchronization point immediately after bootstrap.

pub mod patch_file;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::{ConfigError, CONFIG_FILE_NAME, DEFAULT_PATCH_ID_DIGITS, DISTRO_DIR};
use crate::core::trailers::{
    self, Trailer, FROM_DIST_GIT_COMMIT, PATCH_ID, PATCH_NAME, PATCH_STATUS,
};
use crate::core::types::Oid;
use crate::external::{CommandError, CommandRunner};
use crate::git::{Git, GitError};
use crate::patches::specfile;
use crate::patches::{PatchError, PatchMetadata};
use crate::sync::{FilterRule, SyncError, SyncFilesItem};

/// Errors from bootstrapping a source-git repository.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested upstream ref is not what is checked out.
    #[error("upstream ref {reference} resolves to {resolved}, but HEAD is {head}; check out the ref first")]
    RefNotAtHead {
        reference: String,
        resolved: Oid,
        head: Oid,
    },

    /// The spec prepares sources without `%autosetup`/`%autopatch`.
    #[error("spec file {path} does not use %autosetup or %autopatch; generated patch series would not be applied (pass --ignore-missing-autosetup to proceed)")]
    NoAutosetup { path: PathBuf },

    /// No `*.spec` file in the dist-git root.
    #[error("no spec file found in dist-git at {path}")]
    MissingSpecfile { path: PathBuf },

    /// The dist-git working tree has uncommitted changes.
    #[error("dist-git working tree is dirty ({details}); commit or stash before bootstrapping")]
    DirtyDistGit { details: String },
}

/// Result of a successful bootstrap.
#[derive(Debug, Clone)]
pub struct BootstrapOutcome {
    /// The commit that added `.distro/` and the package configuration.
    pub subtree_commit: Oid,
    /// The replayed patch commits, in application order.
    pub patch_commits: Vec<Oid>,
}

/// Builder for the bootstrap operation.
pub struct Bootstrapper<'a> {
    source_git: &'a Git,
    dist_git: &'a Git,
    runner: &'a dyn CommandRunner,
    patch_id_digits: usize,
    ignore_missing_autosetup: bool,
    squash_patches: bool,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(source_git: &'a Git, dist_git: &'a Git, runner: &'a dyn CommandRunner) -> Self {
        Self {
            source_git,
            dist_git,
            runner,
            patch_id_digits: DEFAULT_PATCH_ID_DIGITS,
            ignore_missing_autosetup: false,
            squash_patches: false,
        }
    }

    /// Zero-padding width recorded in the generated configuration.
    pub fn patch_id_digits(mut self, digits: usize) -> Self {
        self.patch_id_digits = digits;
        self
    }

    /// Proceed even when the spec never invokes `%autosetup`/`%autopatch`.
    pub fn ignore_missing_autosetup(mut self, yes: bool) -> Self {
        self.ignore_missing_autosetup = yes;
        self
    }

    /// Default for per-patch squashing: replay each multi-mail patch
    /// file as a single commit. Recorded in the generated configuration
    /// so later patch generation keeps the same shape.
    pub fn squash_patches(mut self, yes: bool) -> Self {
        self.squash_patches = yes;
        self
    }

    /// Bootstrap the source-git repository from `upstream_ref`.
    ///
    /// # Errors
    ///
    /// Precondition failures are reported before anything is written:
    ///
    /// - [`BootstrapError::RefNotAtHead`] if `upstream_ref` is not the
    ///   current HEAD of the source repository
    /// - [`BootstrapError::MissingSpecfile`] if dist-git has no `*.spec`
    /// - [`BootstrapError::NoAutosetup`] if the spec would ignore the
    ///   generated patch declarations
    /// - [`BootstrapError::DirtyDistGit`] if dist-git has uncommitted
    ///   changes
    pub fn create_from_upstream(
        &self,
        upstream_ref: &str,
    ) -> Result<BootstrapOutcome, BootstrapError> {
        let resolved = self.source_git.resolve(upstream_ref)?;
        let head = self.source_git.head_oid()?;
        if resolved != head {
            return Err(BootstrapError::RefNotAtHead {
                reference: upstream_ref.to_string(),
                resolved,
                head,
            });
        }

        let dist_root = self.dist_git.workdir()?.to_path_buf();
        let spec_path = find_specfile(&dist_root)?;
        let spec_text = read(&spec_path)?;

        if !self.ignore_missing_autosetup && !specfile::uses_autosetup(&spec_text) {
            return Err(BootstrapError::NoAutosetup { path: spec_path });
        }

        self.dist_git.require_pristine().map_err(|e| match e {
            GitError::DirtyWorktree { details } => BootstrapError::DirtyDistGit { details },
            other => other.into(),
        })?;

        self.download_sources(&dist_root, &spec_path)?;

        let source_root = self.source_git.workdir()?.to_path_buf();
        let dist_head = self.dist_git.head_oid()?;

        let subtree_commit = self.commit_subtree(&source_root, &dist_root, &spec_path, &dist_head)?;
        info!(commit = %subtree_commit.short(7), "created packaging subtree commit");

        let mut patch_commits = Vec::new();
        for (index, name) in specfile::declared_patches(&spec_text).iter().enumerate() {
            let commits =
                self.replay_patch(&dist_root, &spec_text, name, index + 1, &dist_head)?;
            patch_commits.extend(commits);
        }
        info!(
            patches = patch_commits.len(),
            "replayed downstream patch series"
        );

        Ok(BootstrapOutcome {
            subtree_commit,
            patch_commits,
        })
    }

    /// Fetch upstream source archives into the dist-git checkout.
    ///
    /// Only runs when a lookaside `sources` manifest exists; a plain
    /// dist-git layout with everything committed needs no download.
    fn download_sources(&self, dist_root: &Path, spec_path: &Path) -> Result<(), BootstrapError> {
        if !dist_root.join("sources").exists() {
            return Ok(());
        }
        let spec_name = file_name(spec_path);
        debug!(spec = %spec_name, "downloading upstream sources");
        self.runner
            .run("spectool", &["--get-files", &spec_name], dist_root)?;
        Ok(())
    }

    /// Copy dist-git into `.distro/`, write the generated configuration,
    /// and commit both with dist-git provenance.
    fn commit_subtree(
        &self,
        source_root: &Path,
        dist_root: &Path,
        spec_path: &Path,
        dist_head: &Oid,
    ) -> Result<Oid, BootstrapError> {
        let distro_dir = source_root.join(DISTRO_DIR);
        fs::create_dir_all(&distro_dir).map_err(|e| BootstrapError::Io {
            path: distro_dir.clone(),
            source: e,
        })?;

        let item = SyncFilesItem {
            src: vec!["./".to_string()],
            dest: PathBuf::from(DISTRO_DIR),
            delete: true,
            filters: vec![
                FilterRule::parse("protect .git*")?,
                FilterRule::parse("protect sources")?,
                FilterRule::parse(&format!("exclude {CONFIG_FILE_NAME}"))?,
                FilterRule::parse("exclude .gitignore")?,
            ],
        };
        item.sync(dist_root, source_root)?;

        let config_path = source_root.join(CONFIG_FILE_NAME);
        write(&config_path, &self.generated_config(spec_path))?;

        let message = trailers::append_trailers(
            "Initialize downstream packaging subtree",
            &[Trailer::new(FROM_DIST_GIT_COMMIT, dist_head.as_str())],
        );
        Ok(self.source_git.commit_all(&message, None)?)
    }

    fn generated_config(&self, spec_path: &Path) -> String {
        format!(
            "# Package configuration generated by `sgs init`.\n\
             specfile_path = \"{DISTRO_DIR}/{spec}\"\n\
             patch_generation_ignore_paths = [\"{DISTRO_DIR}\"]\n\
             patch_generation_patch_id_digits = {digits}\n\
             patch_generation_squash_commits = {squash}\n",
            spec = file_name(spec_path),
            digits = self.patch_id_digits,
            squash = self.squash_patches,
        )
    }

    /// Replay one declared patch file as provenance-tagged commits.
    ///
    /// Multi-mail files become one commit per mail, preserving the
    /// original authors; the trailer block goes on the final commit so
    /// the whole file maps to exactly one `Patch-name`.
    fn replay_patch(
        &self,
        dist_root: &Path,
        spec_text: &str,
        name: &str,
        patch_id: usize,
        dist_head: &Oid,
    ) -> Result<Vec<Oid>, BootstrapError> {
        let path = dist_root.join(name);
        let text = read(&path)?;
        let segments = patch_file::parse(&text);
        if segments.is_empty() {
            debug!(patch = name, "patch file has no diff content, skipping");
            return Ok(Vec::new());
        }

        let declaration = declaration_line(spec_text, name);
        let metadata = PatchMetadata {
            name: name.to_string(),
            squash_commits: self.squash_patches,
            present_in_specfile: declaration.is_some(),
            patch_id: Some(patch_id),
        };

        let mut patch_trailers = vec![Trailer::new(PATCH_NAME, metadata.name.as_str())];
        if let Some(id) = metadata.patch_id {
            patch_trailers.push(Trailer::new(PATCH_ID, id.to_string()));
        }
        if metadata.present_in_specfile {
            patch_trailers.push(Trailer::new(
                PATCH_STATUS,
                declaration.unwrap_or_default(),
            ));
        }
        patch_trailers.push(Trailer::new(FROM_DIST_GIT_COMMIT, dist_head.as_str()));

        let mut commits = Vec::new();
        if metadata.squash_commits && segments.len() > 1 {
            for segment in &segments {
                self.source_git.apply_diff(&segment.diff)?;
            }
            let first = &segments[0];
            let message = trailers::append_trailers(
                &segment_message(first, name),
                &patch_trailers,
            );
            commits.push(self.source_git.commit_all(&message, first.author.as_ref())?);
        } else {
            let last = segments.len() - 1;
            for (i, segment) in segments.iter().enumerate() {
                self.source_git.apply_diff(&segment.diff)?;
                let base = segment_message(segment, name);
                let message = if i == last {
                    trailers::append_trailers(&base, &patch_trailers)
                } else {
                    base
                };
                commits.push(
                    self.source_git
                        .commit_all(&message, segment.author.as_ref())?,
                );
            }
        }
        debug!(patch = name, commits = commits.len(), "replayed patch");
        Ok(commits)
    }
}

/// Commit message for a segment: its subject and body, falling back to
/// the patch filename when the file carries no headers.
fn segment_message(segment: &patch_file::PatchSegment, name: &str) -> String {
    let subject = if segment.subject.is_empty() {
        format!("Apply {name}")
    } else {
        segment.subject.clone()
    };
    if segment.body.is_empty() {
        subject
    } else {
        format!("{subject}\n\n{}", segment.body)
    }
}

/// Find the single spec file in the dist-git root.
///
/// Multiple spec files would be ambiguous; the lexicographically first
/// one wins, which keeps the choice deterministic.
fn find_specfile(dist_root: &Path) -> Result<PathBuf, BootstrapError> {
    let entries = fs::read_dir(dist_root).map_err(|e| BootstrapError::Io {
        path: dist_root.to_path_buf(),
        source: e,
    })?;

    let mut specs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "spec"))
        .collect();
    specs.sort();

    specs
        .into_iter()
        .next()
        .ok_or_else(|| BootstrapError::MissingSpecfile {
            path: dist_root.to_path_buf(),
        })
}

/// The original `PatchN: file` line for a declared patch, trimmed.
fn declaration_line(spec_text: &str, name: &str) -> Option<String> {
    spec_text
        .lines()
        .map(str::trim)
        .find(|line| {
            line.strip_prefix("Patch")
                .and_then(|rest| rest.split_once(':'))
                .is_some_and(|(num, value)| {
                    num.chars().all(|c| c.is_ascii_digit()) && value.trim() == name
                })
        })
        .map(str::to_string)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read(path: &Path) -> Result<String, BootstrapError> {
    fs::read_to_string(path).map_err(|e| BootstrapError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write(path: &Path, content: &str) -> Result<(), BootstrapError> {
    fs::write(path, content).map_err(|e| BootstrapError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
