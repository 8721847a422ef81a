//! patches::linearize
//!
//! Linearization of a commit range into patch-equivalent runs.
//!
//! A merge-containing history cannot be replayed by a linear
//! `%autopatch` application, so the range is reduced to an ordered list
//! of run descriptors first. Each run is an explicit `{base, end, kind}`
//! record over one or more constituent commits; the patch engine emits
//! exactly one patch per run. The graph is walked once, topologically,
//! and never represented as a mutable tree.
//!
//! Rules:
//!
//! - merge commits themselves never produce a run; their side-branch
//!   commits do, in topological order
//! - commits carrying an explicit `Patch-name` trailer are folded into a
//!   single named run regardless of merge topology
//! - everything else is a singleton run

use std::collections::{HashMap, HashSet};

use crate::core::trailers::{find_trailer, PATCH_NAME};
use crate::core::types::Oid;
use crate::git::CommitInfo;

/// How a run came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// A single commit on the first-parent mainline.
    Linear,
    /// A single commit reachable only through a merged-in branch.
    MergedBranch,
    /// Commits folded together by a shared `Patch-name` trailer.
    NamedSquash,
}

/// One patch-equivalent unit of the linearized range.
#[derive(Debug, Clone)]
pub struct Run {
    /// Diff base (exclusive); `None` for a root commit.
    pub base: Option<Oid>,
    /// Terminal commit of the run.
    pub end: Oid,
    /// Descriptor kind.
    pub kind: RunKind,
    /// Constituent commits, oldest first. Never empty.
    pub commits: Vec<CommitInfo>,
    /// `Patch-name` trailer value, for named runs.
    pub patch_name: Option<String>,
}

impl Run {
    fn singleton(commit: CommitInfo, kind: RunKind) -> Self {
        Self {
            base: commit.parents.first().cloned(),
            end: commit.oid.clone(),
            kind,
            patch_name: None,
            commits: vec![commit],
        }
    }
}

/// Reduce a topologically ordered commit list (oldest first) to runs.
///
/// `commits` is the full, non-first-parent history of the range;
/// `mainline` is the set of commits on the first-parent walk, used only
/// to classify run kinds.
pub fn linearize(commits: &[CommitInfo], mainline: &HashSet<Oid>) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    // Patch-name -> index of the run it folds into
    let mut named: HashMap<String, usize> = HashMap::new();

    for commit in commits {
        if commit.is_merge() {
            // The merge itself is not a patch; its branch commits are.
            continue;
        }

        let kind = if mainline.contains(&commit.oid) {
            RunKind::Linear
        } else {
            RunKind::MergedBranch
        };

        match find_trailer(&commit.message, PATCH_NAME) {
            Some(name) => match named.get(&name) {
                Some(&index) => {
                    let run = &mut runs[index];
                    run.end = commit.oid.clone();
                    run.commits.push(commit.clone());
                }
                None => {
                    named.insert(name.clone(), runs.len());
                    let mut run = Run::singleton(commit.clone(), RunKind::NamedSquash);
                    run.patch_name = Some(name);
                    runs.push(run);
                }
            },
            None => runs.push(Run::singleton(commit.clone(), kind)),
        }
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn oid(n: u8) -> Oid {
        Oid::new(format!("{n:040x}")).unwrap()
    }

    fn commit(n: u8, parents: &[u8], message: &str) -> CommitInfo {
        CommitInfo {
            oid: oid(n),
            summary: message.lines().next().unwrap_or("").to_string(),
            message: message.to_string(),
            author_name: "Test".into(),
            author_email: "test@example.com".into(),
            author_time: DateTime::UNIX_EPOCH,
            parents: parents.iter().map(|&p| oid(p)).collect(),
        }
    }

    #[test]
    fn linear_history_is_singleton_runs() {
        let commits = vec![
            commit(2, &[1], "first\n"),
            commit(3, &[2], "second\n"),
        ];
        let mainline: HashSet<Oid> = commits.iter().map(|c| c.oid.clone()).collect();

        let runs = linearize(&commits, &mainline);
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.kind == RunKind::Linear));
        assert_eq!(runs[0].base, Some(oid(1)));
        assert_eq!(runs[0].end, oid(2));
    }

    #[test]
    fn merge_commit_produces_no_run() {
        // 1 <- 2 <- 5(merge of 4)   mainline
        //  \ 3 <- 4 /               side branch
        let commits = vec![
            commit(2, &[1], "mainline work\n"),
            commit(3, &[1], "branch first\n"),
            commit(4, &[3], "branch second\n"),
            commit(5, &[2, 4], "Merge branch 'a'\n"),
        ];
        let mainline: HashSet<Oid> = [oid(2), oid(5)].into_iter().collect();

        let runs = linearize(&commits, &mainline);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].kind, RunKind::Linear);
        assert_eq!(runs[1].kind, RunKind::MergedBranch);
        assert_eq!(runs[2].kind, RunKind::MergedBranch);
        assert!(runs.iter().all(|r| r.end != oid(5)));
    }

    #[test]
    fn named_commits_fold_into_one_run() {
        let commits = vec![
            commit(2, &[1], "a\n\nPatch-name: feature.patch\n"),
            commit(3, &[2], "b\n\nPatch-name: feature.patch\n"),
            commit(4, &[3], "unrelated\n"),
        ];
        let mainline: HashSet<Oid> = commits.iter().map(|c| c.oid.clone()).collect();

        let runs = linearize(&commits, &mainline);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].kind, RunKind::NamedSquash);
        assert_eq!(runs[0].base, Some(oid(1)));
        assert_eq!(runs[0].end, oid(3));
        assert_eq!(runs[0].commits.len(), 2);
        assert_eq!(runs[0].patch_name.as_deref(), Some("feature.patch"));
        assert_eq!(runs[1].kind, RunKind::Linear);
    }

    #[test]
    fn root_commit_has_no_base() {
        let commits = vec![commit(1, &[], "root\n")];
        let mainline: HashSet<Oid> = [oid(1)].into_iter().collect();

        let runs = linearize(&commits, &mainline);
        assert_eq!(runs[0].base, None);
    }
}
