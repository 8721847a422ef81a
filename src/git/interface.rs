//! git::interface
//!
//! Git adapter implementation using git2.
//!
//! This module is the **single doorway** to all Git operations in the
//! engine. No other module imports `git2` directly. This ensures:
//!
//! - Consistent error handling across all Git operations
//! - Strong type guarantees at the boundary (validated [`Oid`]s in and out)
//!
//! The adapter assumes a local, already-cloned repository: it reads and
//! creates commits but never rewrites history in place - new commits are
//! appended, or history is recreated on throwaway branches.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::ObjectNotFound`]: Requested object does not exist
//! - [`GitError::DirtyWorktree`]: Working tree has uncommitted changes
//!
//! # Example
//!
//! ```ignore
//! use sgsync::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let head = git.head_oid()?;
//! let commits = git.log_range(None, &head, true)?;
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::core::types::{Oid, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Working tree has uncommitted changes.
    #[error("working tree is dirty: {details}")]
    DirtyWorktree {
        /// Description of what's dirty
        details: String,
    },

    /// A patch could not be applied to the working tree.
    #[error("patch does not apply: {message}")]
    PatchApplyFailed {
        /// The error message
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context.contains("ref") {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }

    fn internal(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        GitError::InvalidOid {
            oid: err.to_string(),
        }
    }
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// First line of the commit message
    pub summary: String,
    /// Full commit message
    pub message: String,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author timestamp
    pub author_time: DateTime<Utc>,
    /// Parent OIDs; more than one means a merge commit
    pub parents: Vec<Oid>,
}

impl CommitInfo {
    /// Whether this commit has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Author in `Name <email>` form.
    pub fn author(&self) -> String {
        format!("{} <{}>", self.author_name, self.author_email)
    }
}

/// An author identity for commit creation.
///
/// When `time` is unset the current time is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub time: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            time: None,
        }
    }
}

/// Summary of working tree status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Number of untracked files
    pub untracked: usize,
}

impl WorktreeStatus {
    /// Pristine means no changes of any kind, untracked files included.
    ///
    /// The bootstrapper requires a pristine dist-git tree because its
    /// file-sync step assumes the tree it copies is exactly what is
    /// tracked.
    pub fn is_pristine(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && self.untracked == 0
    }
}

impl std::fmt::Display for WorktreeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} staged, {} unstaged, {} untracked",
            self.staged, self.unstaged, self.untracked
        )
    }
}

/// The Git adapter.
///
/// This is the single point of interaction with Git. All repository
/// reads and writes flow through this interface.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover` to find the repository root,
    /// so `path` can be any directory within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Path of the working directory.
    pub fn workdir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    // =========================================================================
    // Ref and Object Resolution
    // =========================================================================

    /// Get HEAD commit OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if HEAD is unborn (new repository)
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        let oid = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?
            .id();

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    /// Resolve an arbitrary revision spec (branch, tag, abbreviated hash)
    /// to a commit OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if nothing matches
    pub fn resolve(&self, spec: &str) -> Result<Oid, GitError> {
        let object = self
            .repo
            .revparse_single(spec)
            .map_err(|e| GitError::from_git2(e, spec))?;

        let commit = object
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, spec))?;

        Oid::new(commit.id().to_string()).map_err(|e| e.into())
    }

    /// Check whether a commit exists in this repository.
    pub fn commit_exists(&self, oid: &Oid) -> bool {
        git2::Oid::from_str(oid.as_str())
            .ok()
            .and_then(|id| self.repo.find_commit(id).ok())
            .is_some()
    }

    // =========================================================================
    // Working Tree Status
    // =========================================================================

    /// Get working tree status summary, untracked files included.
    pub fn worktree_status(&self) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true).include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(GitError::internal)?;

        let mut result = WorktreeStatus::default();
        for entry in statuses.iter() {
            let status = entry.status();

            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }
            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }
            if status.is_wt_new() {
                result.untracked += 1;
            }
        }

        Ok(result)
    }

    /// Fail with [`GitError::DirtyWorktree`] unless the tree is pristine.
    pub fn require_pristine(&self) -> Result<(), GitError> {
        let status = self.worktree_status()?;
        if !status.is_pristine() {
            return Err(GitError::DirtyWorktree {
                details: status.to_string(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Commit Information and History
    // =========================================================================

    /// Get information about a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the commit doesn't exist
    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let git_oid =
            git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let commit = self
            .repo
            .find_commit(git_oid)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        Self::commit_to_info(&commit)
    }

    fn commit_to_info(commit: &git2::Commit<'_>) -> Result<CommitInfo, GitError> {
        let author = commit.author();
        let author_time = Utc
            .timestamp_opt(author.when().seconds(), 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH);

        let mut parents = Vec::with_capacity(commit.parent_count());
        for parent in commit.parent_ids() {
            parents.push(Oid::new(parent.to_string())?);
        }

        Ok(CommitInfo {
            oid: Oid::new(commit.id().to_string())?,
            summary: commit.summary().unwrap_or("").to_string(),
            message: commit.message().unwrap_or("").to_string(),
            author_name: author.name().unwrap_or("").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            author_time,
            parents,
        })
    }

    /// List the commits in `(start, head]`, oldest first.
    ///
    /// With `first_parent`, merged-in side branches are collapsed to the
    /// mainline: only the first parent of each merge is followed. When
    /// `start` is `None` the walk covers all of `head`'s history.
    pub fn log_range(
        &self,
        start: Option<&Oid>,
        head: &Oid,
        first_parent: bool,
    ) -> Result<Vec<CommitInfo>, GitError> {
        let head_oid = git2::Oid::from_str(head.as_str())
            .map_err(|e| GitError::from_git2(e, head.as_str()))?;

        let mut revwalk = self.repo.revwalk().map_err(GitError::internal)?;
        revwalk.push(head_oid).map_err(GitError::internal)?;
        if let Some(start) = start {
            let start_oid = git2::Oid::from_str(start.as_str())
                .map_err(|e| GitError::from_git2(e, start.as_str()))?;
            revwalk.hide(start_oid).map_err(GitError::internal)?;
        }
        if first_parent {
            revwalk.simplify_first_parent().map_err(GitError::internal)?;
        }
        revwalk
            .set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)
            .map_err(GitError::internal)?;

        let mut commits = Vec::new();
        for entry in revwalk {
            let oid = entry.map_err(GitError::internal)?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| GitError::from_git2(e, &oid.to_string()))?;
            commits.push(Self::commit_to_info(&commit)?);
        }

        Ok(commits)
    }

    // =========================================================================
    // Diffing
    // =========================================================================

    /// Produce a unified diff of everything changed between two commits,
    /// excluding the given paths.
    ///
    /// The diff is computed tree-to-tree between the endpoints, so a run
    /// of several commits still yields one coherent patch. A file delta
    /// is excluded when its (old or new) path starts with any of
    /// `exclude_paths`. `from = None` diffs against the empty tree (root
    /// commits).
    pub fn diff_range(
        &self,
        from: Option<&Oid>,
        to: &Oid,
        exclude_paths: &[PathBuf],
    ) -> Result<String, GitError> {
        let tree_from = from.map(|oid| self.commit_tree(oid)).transpose()?;
        let tree_to = self.commit_tree(to)?;

        let mut opts = git2::DiffOptions::new();
        opts.show_binary(true);

        let diff = self
            .repo
            .diff_tree_to_tree(tree_from.as_ref(), Some(&tree_to), Some(&mut opts))
            .map_err(GitError::internal)?;

        let mut buf = Vec::new();
        diff.print(git2::DiffFormat::Patch, |delta, _hunk, line| {
            if delta_excluded(&delta, exclude_paths) {
                return true;
            }
            match line.origin() {
                '+' | '-' | ' ' => buf.push(line.origin() as u8),
                _ => {}
            }
            buf.extend_from_slice(line.content());
            true
        })
        .map_err(GitError::internal)?;

        String::from_utf8(buf).map_err(|_| GitError::Internal {
            message: "diff is not valid UTF-8".into(),
        })
    }

    fn commit_tree(&self, oid: &Oid) -> Result<git2::Tree<'_>, GitError> {
        let git_oid =
            git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        let commit = self
            .repo
            .find_commit(git_oid)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        commit.tree().map_err(GitError::internal)
    }

    // =========================================================================
    // Mutation: apply, commit, branch, checkout
    // =========================================================================

    /// Apply a unified diff to the working tree and index.
    ///
    /// # Errors
    ///
    /// - [`GitError::PatchApplyFailed`] if the diff does not apply cleanly
    pub fn apply_diff(&self, diff_text: &str) -> Result<(), GitError> {
        let diff = git2::Diff::from_buffer(diff_text.as_bytes()).map_err(|e| {
            GitError::PatchApplyFailed {
                message: e.message().to_string(),
            }
        })?;

        self.repo
            .apply(&diff, git2::ApplyLocation::WorkDir, None)
            .map_err(|e| GitError::PatchApplyFailed {
                message: e.message().to_string(),
            })
    }

    /// Stage every change in the working tree and create a commit on HEAD.
    ///
    /// When `author` is given, the commit is attributed to it; the
    /// committer is always the repository's configured identity (falling
    /// back to a fixed engine identity). Returns the new commit's OID.
    pub fn commit_all(&self, message: &str, author: Option<&Identity>) -> Result<Oid, GitError> {
        let mut index = self.repo.index().map_err(GitError::internal)?;
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .map_err(GitError::internal)?;
        index.write().map_err(GitError::internal)?;

        let tree_oid = index.write_tree().map_err(GitError::internal)?;
        let tree = self.repo.find_tree(tree_oid).map_err(GitError::internal)?;

        let (author_sig, committer) = self.signatures(author)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(GitError::internal)?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
            Err(e) => return Err(GitError::internal(e)),
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &author_sig, &committer, message, &tree, &parents)
            .map_err(GitError::internal)?;

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    /// Apply a unified diff on top of an existing commit, producing a new
    /// commit object that no reference points at. HEAD, the index, and
    /// the working tree are untouched.
    ///
    /// # Errors
    ///
    /// - [`GitError::PatchApplyFailed`] if the diff does not apply to the
    ///   base commit's tree
    pub fn apply_to_commit(
        &self,
        base: &Oid,
        diff_text: &str,
        message: &str,
        author: Option<&Identity>,
    ) -> Result<Oid, GitError> {
        let base_oid = git2::Oid::from_str(base.as_str())
            .map_err(|e| GitError::from_git2(e, base.as_str()))?;
        let base_commit = self
            .repo
            .find_commit(base_oid)
            .map_err(|e| GitError::from_git2(e, base.as_str()))?;
        let base_tree = base_commit.tree().map_err(GitError::internal)?;

        let diff = git2::Diff::from_buffer(diff_text.as_bytes()).map_err(|e| {
            GitError::PatchApplyFailed {
                message: e.message().to_string(),
            }
        })?;
        let mut index = self
            .repo
            .apply_to_tree(&base_tree, &diff, None)
            .map_err(|e| GitError::PatchApplyFailed {
                message: e.message().to_string(),
            })?;

        let tree_oid = index
            .write_tree_to(&self.repo)
            .map_err(GitError::internal)?;
        let tree = self.repo.find_tree(tree_oid).map_err(GitError::internal)?;

        let (author_sig, committer) = self.signatures(author)?;
        let oid = self
            .repo
            .commit(None, &author_sig, &committer, message, &tree, &[&base_commit])
            .map_err(GitError::internal)?;

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    /// Author and committer signatures for a new commit.
    ///
    /// The committer is always the repository's configured identity,
    /// falling back to a fixed engine identity; the author defaults to
    /// the committer.
    fn signatures(
        &self,
        author: Option<&Identity>,
    ) -> Result<(git2::Signature<'static>, git2::Signature<'static>), GitError> {
        let committer = self
            .repo
            .signature()
            .or_else(|_| git2::Signature::now("sgsync", "sgsync@localhost"))
            .map_err(GitError::internal)?;

        let author_sig = match author {
            Some(identity) => {
                let time = identity
                    .time
                    .map(|t| git2::Time::new(t.timestamp(), 0));
                match time {
                    Some(t) => git2::Signature::new(&identity.name, &identity.email, &t)
                        .map_err(GitError::internal)?,
                    None => git2::Signature::now(&identity.name, &identity.email)
                        .map_err(GitError::internal)?,
                }
            }
            None => committer.clone(),
        };

        Ok((author_sig, committer))
    }

    /// Create a branch pointing at the given commit.
    pub fn create_branch(&self, name: &str, at: &Oid) -> Result<(), GitError> {
        let git_oid =
            git2::Oid::from_str(at.as_str()).map_err(|e| GitError::from_git2(e, at.as_str()))?;
        let commit = self
            .repo
            .find_commit(git_oid)
            .map_err(|e| GitError::from_git2(e, at.as_str()))?;

        self.repo
            .branch(name, &commit, false)
            .map_err(GitError::internal)?;
        Ok(())
    }

    /// Delete a local branch. Missing branches are not an error.
    pub fn delete_branch(&self, name: &str) -> Result<(), GitError> {
        match self.repo.find_branch(name, git2::BranchType::Local) {
            Ok(mut branch) => branch.delete().map_err(GitError::internal),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(()),
            Err(e) => Err(GitError::internal(e)),
        }
    }

    /// Check out a branch, updating HEAD and the working tree.
    pub fn checkout(&self, branch: &str) -> Result<(), GitError> {
        let refname = format!("refs/heads/{branch}");
        let object = self
            .repo
            .revparse_single(&refname)
            .map_err(|e| GitError::from_git2(e, &refname))?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force();
        self.repo
            .checkout_tree(&object, Some(&mut checkout))
            .map_err(GitError::internal)?;
        self.repo
            .set_head(&refname)
            .map_err(|e| GitError::from_git2(e, &refname))?;
        Ok(())
    }
}

/// Check whether a file delta touches only excluded paths.
fn delta_excluded(delta: &git2::DiffDelta<'_>, exclude_paths: &[PathBuf]) -> bool {
    let matches = |path: Option<&Path>| {
        path.is_some_and(|p| exclude_paths.iter().any(|prefix| p.starts_with(prefix)))
    };
    matches(delta.new_file().path()) || matches(delta.old_file().path())
}
