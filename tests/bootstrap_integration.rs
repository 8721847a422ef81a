//! Integration tests for the source-git bootstrapper.
//!
//! Each test builds a real upstream clone and a real dist-git checkout
//! (spec file, patch files), runs the bootstrapper, and inspects the
//! resulting commit series.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use sgsync::bootstrap::{BootstrapError, Bootstrapper};
use sgsync::core::trailers::{
    find_trailer, FROM_DIST_GIT_COMMIT, PATCH_ID, PATCH_NAME, PATCH_STATUS,
};
use sgsync::external::LocalCommandRunner;
use sgsync::git::Git;
use sgsync::status::sync_status;

struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    fn empty() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-b", "main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn git(&self) -> Git {
        Git::open(self.path()).expect("failed to open test repo")
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn commit_all(&self, message: &str) {
        run_git(self.path(), &["add", "-A"]);
        run_git(self.path(), &["commit", "-m", message]);
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

const SPEC: &str = "\
Name: acme
Version: 0.1.0
Source0: acme-0.1.0.tar.gz
Patch0001: 0001-greet-politely.patch

%description
A package.

%prep
%autosetup -p1
";

const PATCH: &str = "\
From 1234567890abcdef1234567890abcdef12345678 Mon Sep 17 00:00:00 2001
From: Jane Doe <jane@example.com>
Date: Tue, 3 Mar 2026 10:00:00 +0100
Subject: [PATCH] Greet politely

Downstream prefers a polite greeting.
---
 hello.txt | 2 +-
 1 file changed, 1 insertion(+), 1 deletion(-)

diff --git a/hello.txt b/hello.txt
--- a/hello.txt
+++ b/hello.txt
@@ -1 +1 @@
-hello world
+hello polite world
--
2.43.0
";

/// Upstream clone at the packaged release, plus a matching dist-git.
fn fixture() -> (TestRepo, TestRepo) {
    let upstream = TestRepo::empty();
    upstream.write("hello.txt", "hello world\n");
    upstream.commit_all("Initial release");
    run_git(upstream.path(), &["tag", "0.1.0"]);

    let dist = TestRepo::empty();
    dist.write("acme.spec", SPEC);
    dist.write("0001-greet-politely.patch", PATCH);
    dist.commit_all("Import acme 0.1.0");

    (upstream, dist)
}

#[test]
fn bootstrap_builds_full_source_git() {
    let (upstream, dist) = fixture();
    let source_git = upstream.git();
    let dist_git = dist.git();
    let runner = LocalCommandRunner;

    let outcome = Bootstrapper::new(&source_git, &dist_git, &runner)
        .create_from_upstream("0.1.0")
        .unwrap();
    assert_eq!(outcome.patch_commits.len(), 1);

    // Subtree: dist-git content under .distro/, no .git leakage.
    let distro = upstream.path().join(".distro");
    assert!(distro.join("acme.spec").exists());
    assert!(distro.join("0001-greet-politely.patch").exists());
    assert!(!distro.join(".git").exists());

    // Generated configuration points at the copied spec.
    let config = fs::read_to_string(upstream.path().join(".sgsync.toml")).unwrap();
    assert!(config.contains("specfile_path = \".distro/acme.spec\""));
    assert!(config.contains("patch_generation_patch_id_digits = 4"));
    assert!(config.contains("patch_generation_squash_commits = false"));

    // Subtree commit carries dist-git provenance.
    let subtree = source_git.commit_info(&outcome.subtree_commit).unwrap();
    let dist_head = dist_git.head_oid().unwrap();
    assert_eq!(
        find_trailer(&subtree.message, FROM_DIST_GIT_COMMIT).as_deref(),
        Some(dist_head.as_str())
    );

    // The patch is applied to the tree as a regular commit.
    let hello = fs::read_to_string(upstream.path().join("hello.txt")).unwrap();
    assert_eq!(hello, "hello polite world\n");

    let patch_commit = source_git.commit_info(&outcome.patch_commits[0]).unwrap();
    assert_eq!(patch_commit.summary, "Greet politely");
    assert_eq!(patch_commit.author_name, "Jane Doe");
    assert_eq!(patch_commit.author_email, "jane@example.com");
    assert_eq!(
        find_trailer(&patch_commit.message, PATCH_NAME).as_deref(),
        Some("0001-greet-politely.patch")
    );
    assert_eq!(
        find_trailer(&patch_commit.message, PATCH_ID).as_deref(),
        Some("1")
    );
    // The declaration exists in the spec, so its original spelling is
    // recorded.
    assert_eq!(
        find_trailer(&patch_commit.message, PATCH_STATUS).as_deref(),
        Some("Patch0001: 0001-greet-politely.patch")
    );
    assert_eq!(
        find_trailer(&patch_commit.message, FROM_DIST_GIT_COMMIT).as_deref(),
        Some(dist_head.as_str())
    );
}

const TWO_MAIL_PATCH: &str = "\
From 1111111111111111111111111111111111111111 Mon Sep 17 00:00:00 2001
From: Jane Doe <jane@example.com>
Date: Tue, 3 Mar 2026 10:00:00 +0100
Subject: [PATCH 1/2] Make greeting brave

---
 hello.txt | 2 +-
 1 file changed, 1 insertion(+), 1 deletion(-)

diff --git a/hello.txt b/hello.txt
--- a/hello.txt
+++ b/hello.txt
@@ -1 +1 @@
-hello world
+hello brave world
--
2.43.0

From 2222222222222222222222222222222222222222 Mon Sep 17 00:00:00 2001
From: John Roe <john@example.com>
Date: Tue, 3 Mar 2026 11:00:00 +0100
Subject: [PATCH 2/2] Add notes

---
 notes.txt | 1 +
 1 file changed, 1 insertion(+)

diff --git a/notes.txt b/notes.txt
new file mode 100644
--- /dev/null
+++ b/notes.txt
@@ -0,0 +1 @@
+remember the milk
--
2.43.0
";

/// Like [`fixture`], but the single declared patch file holds two mails.
fn two_mail_fixture() -> (TestRepo, TestRepo) {
    let upstream = TestRepo::empty();
    upstream.write("hello.txt", "hello world\n");
    upstream.commit_all("Initial release");
    run_git(upstream.path(), &["tag", "0.1.0"]);

    let dist = TestRepo::empty();
    dist.write(
        "acme.spec",
        "Name: acme\nVersion: 0.1.0\nSource0: acme-0.1.0.tar.gz\n\
         Patch0001: 0001-downstream.patch\n\n%prep\n%autosetup -p1\n",
    );
    dist.write("0001-downstream.patch", TWO_MAIL_PATCH);
    dist.commit_all("Import acme 0.1.0");

    (upstream, dist)
}

#[test]
fn multi_mail_patch_replays_one_commit_per_mail() {
    let (upstream, dist) = two_mail_fixture();
    let source_git = upstream.git();
    let dist_git = dist.git();
    let runner = LocalCommandRunner;

    let outcome = Bootstrapper::new(&source_git, &dist_git, &runner)
        .create_from_upstream("0.1.0")
        .unwrap();
    assert_eq!(outcome.patch_commits.len(), 2);

    let first = source_git.commit_info(&outcome.patch_commits[0]).unwrap();
    let last = source_git.commit_info(&outcome.patch_commits[1]).unwrap();
    assert_eq!(first.author_name, "Jane Doe");
    assert_eq!(last.author_name, "John Roe");

    // The trailer block maps the whole file to one patch, so it sits on
    // the final commit only.
    assert!(find_trailer(&first.message, PATCH_NAME).is_none());
    assert_eq!(
        find_trailer(&last.message, PATCH_NAME).as_deref(),
        Some("0001-downstream.patch")
    );

    let hello = fs::read_to_string(upstream.path().join("hello.txt")).unwrap();
    assert_eq!(hello, "hello brave world\n");
    let notes = fs::read_to_string(upstream.path().join("notes.txt")).unwrap();
    assert_eq!(notes, "remember the milk\n");
}

#[test]
fn squash_replays_multi_mail_patch_as_one_commit() {
    let (upstream, dist) = two_mail_fixture();
    let source_git = upstream.git();
    let dist_git = dist.git();
    let runner = LocalCommandRunner;

    let outcome = Bootstrapper::new(&source_git, &dist_git, &runner)
        .squash_patches(true)
        .create_from_upstream("0.1.0")
        .unwrap();
    assert_eq!(outcome.patch_commits.len(), 1);

    let commit = source_git.commit_info(&outcome.patch_commits[0]).unwrap();
    assert_eq!(commit.author_name, "Jane Doe");
    assert_eq!(
        find_trailer(&commit.message, PATCH_NAME).as_deref(),
        Some("0001-downstream.patch")
    );

    // Both mails land in the single commit's tree.
    let hello = fs::read_to_string(upstream.path().join("hello.txt")).unwrap();
    assert_eq!(hello, "hello brave world\n");
    let notes = fs::read_to_string(upstream.path().join("notes.txt")).unwrap();
    assert_eq!(notes, "remember the milk\n");

    // The chosen default is recorded for later patch generation.
    let config = fs::read_to_string(upstream.path().join(".sgsync.toml")).unwrap();
    assert!(config.contains("patch_generation_squash_commits = true"));
}

#[test]
fn bootstrap_round_trips_to_synced_status() {
    let (upstream, dist) = fixture();
    let source_git = upstream.git();
    let dist_git = dist.git();
    let runner = LocalCommandRunner;

    Bootstrapper::new(&source_git, &dist_git, &runner)
        .create_from_upstream("0.1.0")
        .unwrap();

    let status = sync_status(&source_git, &dist_git).unwrap();
    assert!(status.is_synced());
}

#[test]
fn ref_not_checked_out_is_rejected() {
    let (upstream, dist) = fixture();
    // Move HEAD past the tagged release.
    upstream.write("hello.txt", "hello newer world\n");
    upstream.commit_all("Post-release work");

    let source_git = upstream.git();
    let dist_git = dist.git();
    let runner = LocalCommandRunner;

    let result = Bootstrapper::new(&source_git, &dist_git, &runner).create_from_upstream("0.1.0");
    assert!(matches!(result, Err(BootstrapError::RefNotAtHead { .. })));
}

#[test]
fn spec_without_autosetup_is_rejected_unless_ignored() {
    let (upstream, dist) = fixture();
    dist.write(
        "acme.spec",
        "Name: acme\nVersion: 0.1.0\nSource0: acme-0.1.0.tar.gz\n\n%prep\n%setup -q\n",
    );
    dist.commit_all("Drop autosetup");

    let source_git = upstream.git();
    let dist_git = dist.git();
    let runner = LocalCommandRunner;

    let result = Bootstrapper::new(&source_git, &dist_git, &runner).create_from_upstream("0.1.0");
    assert!(matches!(result, Err(BootstrapError::NoAutosetup { .. })));

    let outcome = Bootstrapper::new(&source_git, &dist_git, &runner)
        .ignore_missing_autosetup(true)
        .create_from_upstream("0.1.0");
    assert!(outcome.is_ok());
}

#[test]
fn dirty_dist_git_is_rejected() {
    let (upstream, dist) = fixture();
    dist.write("scratch.txt", "uncommitted\n");

    let source_git = upstream.git();
    let dist_git = dist.git();
    let runner = LocalCommandRunner;

    let result = Bootstrapper::new(&source_git, &dist_git, &runner).create_from_upstream("0.1.0");
    assert!(matches!(result, Err(BootstrapError::DirtyDistGit { .. })));
}

#[test]
fn dist_git_without_spec_is_rejected() {
    let upstream = TestRepo::empty();
    upstream.write("hello.txt", "hello world\n");
    upstream.commit_all("Initial release");
    run_git(upstream.path(), &["tag", "0.1.0"]);

    let dist = TestRepo::empty();
    dist.write("README.md", "no spec here\n");
    dist.commit_all("Init");

    let source_git = upstream.git();
    let dist_git = dist.git();
    let runner = LocalCommandRunner;

    let result = Bootstrapper::new(&source_git, &dist_git, &runner).create_from_upstream("0.1.0");
    assert!(matches!(
        result,
        Err(BootstrapError::MissingSpecfile { .. })
    ));
}
