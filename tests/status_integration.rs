//! Integration tests for the synchronization status engine.
//!
//! Each test builds a pair of real git repositories, plants provenance
//! trailers, and checks which side reports pending commits.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use sgsync::core::types::Oid;
use sgsync::git::Git;
use sgsync::status::{sync_status, StatusError};

struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    fn new(seed: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-b", "main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);

        fs::write(dir.path().join("seed.txt"), seed).unwrap();
        run_git(dir.path(), &["add", "-A"]);
        run_git(dir.path(), &["commit", "-m", "Initial commit"]);
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn git(&self) -> Git {
        Git::open(self.path()).expect("failed to open test repo")
    }

    fn head(&self) -> Oid {
        self.git().head_oid().unwrap()
    }

    fn commit(&self, path: &str, content: &str, message: &str) -> Oid {
        fs::write(self.path().join(path), content).unwrap();
        run_git(self.path(), &["add", "-A"]);
        run_git(self.path(), &["commit", "-m", message]);
        self.head()
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

/// A synchronized pair: the source-git HEAD carries a
/// `From-dist-git-commit` trailer pointing at the dist-git HEAD, the way
/// the bootstrapper leaves things.
fn synced_pair() -> (TestRepo, TestRepo) {
    let source = TestRepo::new("source\n");
    let dist = TestRepo::new("dist\n");
    let dist_head = dist.head();
    source.commit(
        "packaging.txt",
        "subtree\n",
        &format!("Add packaging\n\nFrom-dist-git-commit: {dist_head}"),
    );
    (source, dist)
}

#[test]
fn no_trailers_anywhere_is_no_sync_point() {
    let source = TestRepo::new("source\n");
    let dist = TestRepo::new("dist\n");
    assert!(matches!(
        sync_status(&source.git(), &dist.git()),
        Err(StatusError::NoSyncPoint)
    ));
}

#[test]
fn freshly_bootstrapped_pair_is_synced() {
    let (source, dist) = synced_pair();
    let status = sync_status(&source.git(), &dist.git()).unwrap();
    assert!(status.is_synced());
    assert_eq!(status.source_git_range_start, None);
    assert_eq!(status.dist_git_range_start, None);
}

#[test]
fn source_commits_after_anchor_are_pending() {
    let (source, dist) = synced_pair();
    let first_pending = source.commit("work.txt", "w\n", "Do some work");
    source.commit("more.txt", "m\n", "More work");

    let status = sync_status(&source.git(), &dist.git()).unwrap();
    assert_eq!(status.source_git_range_start, Some(first_pending));
    assert_eq!(status.dist_git_range_start, None);
}

#[test]
fn dist_commits_after_anchor_are_pending() {
    let (source, dist) = synced_pair();
    let pending = dist.commit("pkg.spec", "Name: pkg\n", "Tweak spec");

    let status = sync_status(&source.git(), &dist.git()).unwrap();
    assert_eq!(status.source_git_range_start, None);
    assert_eq!(status.dist_git_range_start, Some(pending));
}

#[test]
fn both_sides_pending_is_divergence() {
    let (source, dist) = synced_pair();
    let source_pending = source.commit("work.txt", "w\n", "Source work");
    let dist_pending = dist.commit("pkg.spec", "Name: pkg\n", "Dist work");

    let status = sync_status(&source.git(), &dist.git()).unwrap();
    assert!(status.is_diverged());
    assert_eq!(status.source_git_range_start, Some(source_pending));
    assert_eq!(status.dist_git_range_start, Some(dist_pending));
}

#[test]
fn newer_anchor_supersedes_older_one() {
    let (source, dist) = synced_pair();

    // An update run writes the inverse trailer into dist-git, pointing at
    // the current source HEAD; this newer anchor is authoritative.
    let source_head = source.head();
    dist.commit(
        "0001-x.patch",
        "diff\n",
        &format!("Update from source-git\n\nFrom-source-git-commit: {source_head}"),
    );

    let status = sync_status(&source.git(), &dist.git()).unwrap();
    assert!(status.is_synced());

    // Work after the newer anchor is pending on the source side only.
    let pending = source.commit("next.txt", "n\n", "Next change");
    let status = sync_status(&source.git(), &dist.git()).unwrap();
    assert_eq!(status.source_git_range_start, Some(pending));
    assert_eq!(status.dist_git_range_start, None);
}

#[test]
fn dangling_reference_is_fatal() {
    let source = TestRepo::new("source\n");
    let dist = TestRepo::new("dist\n");
    source.commit(
        "packaging.txt",
        "subtree\n",
        &format!("Add packaging\n\nFrom-dist-git-commit: {}", "f".repeat(40)),
    );

    assert!(matches!(
        sync_status(&source.git(), &dist.git()),
        Err(StatusError::DanglingReference { .. })
    ));
}

#[test]
fn garbage_trailer_value_is_fatal() {
    let source = TestRepo::new("source\n");
    let dist = TestRepo::new("dist\n");
    source.commit(
        "packaging.txt",
        "subtree\n",
        "Add packaging\n\nFrom-dist-git-commit: not-a-hash",
    );

    assert!(matches!(
        sync_status(&source.git(), &dist.git()),
        Err(StatusError::InvalidTrailerValue { .. })
    ));
}
