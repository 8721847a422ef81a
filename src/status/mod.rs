//! status
//!
//! Bidirectional synchronization status, computed purely from
//! commit-graph traversal.
//!
//! Walking backward from each repository's HEAD, the engine looks for
//! the provenance trailers written during synchronization
//! (`From-dist-git-commit` on source-git commits, `From-source-git-commit`
//! on dist-git commits). The most recently written anchor determines the
//! last known-synchronized point; everything strictly after it on either
//! side is the pending sync range.
//!
//! Provenance problems are fatal: guessing a sync point would silently
//! corrupt history.

use thiserror::Error;
use tracing::debug;

use crate::core::trailers::{find_trailer, FROM_DIST_GIT_COMMIT, FROM_SOURCE_GIT_COMMIT};
use crate::core::types::Oid;
use crate::git::{CommitInfo, Git, GitError};

/// Errors from status computation.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error(transparent)]
    Git(#[from] GitError),

    /// No provenance trailer exists anywhere in either history - nothing
    /// has ever been synchronized.
    #[error("no synchronization point found in either repository")]
    NoSyncPoint,

    /// A provenance trailer references a commit that does not exist in
    /// the other repository.
    #[error("{trailer} on commit {carrier} references {target}, which does not exist")]
    DanglingReference {
        /// The trailer key that was followed
        trailer: &'static str,
        /// The commit carrying the trailer
        carrier: Oid,
        /// The referenced, missing commit
        target: Oid,
    },

    /// A provenance trailer value is not a commit hash.
    #[error("{trailer} on commit {carrier} holds an invalid value: {value}")]
    InvalidTrailerValue {
        trailer: &'static str,
        carrier: Oid,
        value: String,
    },
}

/// Which side of each repository has commits pending synchronization.
///
/// `None` on a side means that side has nothing pending. Both sides
/// non-`None` signals divergence - a valid, expected outcome, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Oldest source-git commit not yet reflected in dist-git.
    pub source_git_range_start: Option<Oid>,
    /// Oldest dist-git commit not yet reflected in source-git.
    pub dist_git_range_start: Option<Oid>,
}

impl SyncStatus {
    /// Whether both sides are fully synchronized.
    pub fn is_synced(&self) -> bool {
        self.source_git_range_start.is_none() && self.dist_git_range_start.is_none()
    }

    /// Whether both sides have pending commits.
    pub fn is_diverged(&self) -> bool {
        self.source_git_range_start.is_some() && self.dist_git_range_start.is_some()
    }
}

/// A provenance anchor discovered while walking one repository.
#[derive(Debug, Clone)]
struct Anchor {
    /// The commit carrying the trailer.
    carrier: CommitInfo,
    /// The commit in the *other* repository the trailer points at.
    counterpart: Oid,
    /// First-parent distance from the carrier to its own HEAD.
    distance: usize,
}

/// Compute the synchronization status between the two repositories.
///
/// # Errors
///
/// - [`StatusError::NoSyncPoint`] if neither history carries a
///   provenance trailer
/// - [`StatusError::DanglingReference`] if a trailer points at a commit
///   absent from the other repository
pub fn sync_status(source_git: &Git, dist_git: &Git) -> Result<SyncStatus, StatusError> {
    let source_head = source_git.head_oid()?;
    let dist_head = dist_git.head_oid()?;

    let source_anchor = find_anchor(source_git, &source_head, FROM_DIST_GIT_COMMIT)?;
    let dist_anchor = find_anchor(dist_git, &dist_head, FROM_SOURCE_GIT_COMMIT)?;

    if let Some(anchor) = &source_anchor {
        if !dist_git.commit_exists(&anchor.counterpart) {
            return Err(StatusError::DanglingReference {
                trailer: FROM_DIST_GIT_COMMIT,
                carrier: anchor.carrier.oid.clone(),
                target: anchor.counterpart.clone(),
            });
        }
    }
    if let Some(anchor) = &dist_anchor {
        if !source_git.commit_exists(&anchor.counterpart) {
            return Err(StatusError::DanglingReference {
                trailer: FROM_SOURCE_GIT_COMMIT,
                carrier: anchor.carrier.oid.clone(),
                target: anchor.counterpart.clone(),
            });
        }
    }

    // (last synced source-git commit, last synced dist-git commit)
    let (source_point, dist_point) = match (source_anchor, dist_anchor) {
        (None, None) => return Err(StatusError::NoSyncPoint),
        (Some(a), None) => (a.carrier.oid.clone(), a.counterpart),
        (None, Some(b)) => (b.counterpart.clone(), b.carrier.oid),
        (Some(a), Some(b)) => {
            if prefer_source_anchor(&a, &b) {
                (a.carrier.oid.clone(), a.counterpart)
            } else {
                (b.counterpart.clone(), b.carrier.oid)
            }
        }
    };

    debug!(
        source_point = %source_point.short(7),
        dist_point = %dist_point.short(7),
        "authoritative sync point"
    );

    Ok(SyncStatus {
        source_git_range_start: range_start(source_git, &source_point, &source_head)?,
        dist_git_range_start: range_start(dist_git, &dist_point, &dist_head)?,
    })
}

/// Walk backward from `head` to the newest commit carrying `trailer`.
fn find_anchor(git: &Git, head: &Oid, trailer: &'static str) -> Result<Option<Anchor>, StatusError> {
    let history = git.log_range(None, head, true)?;

    // log_range returns oldest first; scan from the newest end
    for (behind, commit) in history.iter().rev().enumerate() {
        if let Some(value) = find_trailer(&commit.message, trailer) {
            let counterpart =
                Oid::new(&value).map_err(|_| StatusError::InvalidTrailerValue {
                    trailer,
                    carrier: commit.oid.clone(),
                    value,
                })?;
            return Ok(Some(Anchor {
                carrier: commit.clone(),
                counterpart,
                distance: behind,
            }));
        }
    }

    Ok(None)
}

/// Decide which of two anchors is the more recently written one.
///
/// Primary criterion: the anchor closer to its own HEAD wins, since
/// either side may have been updated most recently. When the distances
/// tie (including after history rewrites that make ordering ambiguous),
/// the anchor whose carrying commit has the later author date wins; on
/// equal dates the source-git anchor is preferred. Deterministic by
/// construction.
fn prefer_source_anchor(source: &Anchor, dist: &Anchor) -> bool {
    if source.distance != dist.distance {
        return source.distance < dist.distance;
    }
    source.carrier.author_time >= dist.carrier.author_time
}

/// Oldest commit strictly after `point`, or `None` when HEAD is `point`.
fn range_start(git: &Git, point: &Oid, head: &Oid) -> Result<Option<Oid>, StatusError> {
    if point == head {
        return Ok(None);
    }
    let pending = git.log_range(Some(point), head, true)?;
    Ok(pending.first().map(|c| c.oid.clone()))
}
