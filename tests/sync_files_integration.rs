//! Integration tests for the file sync engine.
//!
//! These tests run real copies between temporary directory trees and
//! check glob expansion, merge copying, deletion mirroring, and the
//! protect/exclude filter semantics.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use sgsync::sync::{FilterRule, SyncError, SyncFilesItem};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

fn item(src: &[&str], dest: &str) -> SyncFilesItem {
    SyncFilesItem {
        src: src.iter().map(|s| s.to_string()).collect(),
        dest: PathBuf::from(dest),
        delete: false,
        filters: vec![],
    }
}

#[test]
fn literal_file_copies_to_dest_dir() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write(src.path(), "pkg.spec", "Name: pkg\n");
    fs::create_dir_all(dest.path().join("out")).unwrap();

    item(&["pkg.spec"], "out")
        .sync(src.path(), dest.path())
        .unwrap();

    assert_eq!(read(dest.path(), "out/pkg.spec"), "Name: pkg\n");
}

#[test]
fn glob_expands_to_all_matches() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write(src.path(), "README.md", "readme\n");
    write(src.path(), "CHANGELOG.md", "changelog\n");
    write(src.path(), "code.rs", "fn main() {}\n");
    fs::create_dir_all(dest.path().join("docs")).unwrap();

    item(&["*.md"], "docs")
        .sync(src.path(), dest.path())
        .unwrap();

    assert_eq!(read(dest.path(), "docs/README.md"), "readme\n");
    assert_eq!(read(dest.path(), "docs/CHANGELOG.md"), "changelog\n");
    assert!(!dest.path().join("docs/code.rs").exists());
}

#[test]
fn trailing_slash_syncs_directory_contents() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write(src.path(), "tree/a.txt", "a\n");
    write(src.path(), "tree/nested/b.txt", "b\n");
    fs::create_dir_all(dest.path().join("mirror")).unwrap();

    item(&["tree/"], "mirror")
        .sync(src.path(), dest.path())
        .unwrap();

    assert_eq!(read(dest.path(), "mirror/a.txt"), "a\n");
    assert_eq!(read(dest.path(), "mirror/nested/b.txt"), "b\n");
}

#[test]
fn resolve_expands_globs_into_raw_items() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write(src.path(), "a.md", "a\n");
    write(src.path(), "b.md", "b\n");
    write(src.path(), "c.txt", "c\n");

    let raw = item(&["*.md"], "docs")
        .resolve(src.path(), dest.path())
        .unwrap();

    // One concrete pair per match, every pair keeping the declared dest.
    assert_eq!(raw.len(), 2);
    let mut sources: Vec<_> = raw
        .iter()
        .map(|r| r.src.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    sources.sort();
    assert_eq!(sources, vec!["a.md", "b.md"]);
    for pair in &raw {
        assert_eq!(pair.dest, dest.path().join("docs"));
    }
}

#[test]
fn wildcard_expansion_skips_hidden_entries() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write(src.path(), "tree/visible.txt", "v\n");
    write(src.path(), "tree/.git/HEAD", "ref: refs/heads/main\n");
    write(src.path(), "tree/.hidden", "h\n");
    fs::create_dir_all(dest.path().join("mirror")).unwrap();

    item(&["tree/"], "mirror")
        .sync(src.path(), dest.path())
        .unwrap();

    assert!(dest.path().join("mirror/visible.txt").exists());
    assert!(!dest.path().join("mirror/.git").exists());
    assert!(!dest.path().join("mirror/.hidden").exists());
}

#[test]
fn missing_literal_source_is_an_error() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();

    let result = item(&["does-not-exist.txt"], ".").sync(src.path(), dest.path());
    assert!(matches!(result, Err(SyncError::MissingSource { .. })));
}

#[test]
fn glob_matching_nothing_is_a_no_op() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();

    item(&["*.nothing"], ".").sync(src.path(), dest.path()).unwrap();
}

#[test]
fn delete_mirrors_removals() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write(src.path(), "tree/kept.txt", "kept\n");
    write(dest.path(), "mirror/kept.txt", "stale\n");
    write(dest.path(), "mirror/removed.txt", "gone upstream\n");

    let mut sync = item(&["tree/"], "mirror");
    sync.delete = true;
    sync.sync(src.path(), dest.path()).unwrap();

    assert_eq!(read(dest.path(), "mirror/kept.txt"), "kept\n");
    assert!(!dest.path().join("mirror/removed.txt").exists());
}

#[test]
fn protected_paths_survive_deletion_and_overwrite() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write(src.path(), "tree/kept.txt", "kept\n");
    write(src.path(), "tree/sources", "upstream manifest\n");
    write(dest.path(), "mirror/sources", "local manifest\n");
    write(dest.path(), "mirror/extra.txt", "stale\n");

    let mut sync = item(&["tree/"], "mirror");
    sync.delete = true;
    sync.filters = vec![FilterRule::parse("protect sources").unwrap()];
    sync.sync(src.path(), dest.path()).unwrap();

    // Not deleted and not overwritten.
    assert_eq!(read(dest.path(), "mirror/sources"), "local manifest\n");
    // Unprotected stale entries are still mirrored away.
    assert!(!dest.path().join("mirror/extra.txt").exists());
}

#[test]
fn protected_paths_copy_when_absent_at_dest() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write(src.path(), "tree/sources", "upstream manifest\n");
    fs::create_dir_all(dest.path().join("mirror")).unwrap();

    let mut sync = item(&["tree/"], "mirror");
    sync.filters = vec![FilterRule::parse("protect sources").unwrap()];
    sync.sync(src.path(), dest.path()).unwrap();

    // Protection guards what exists at the destination; an empty
    // destination still receives the file.
    assert_eq!(read(dest.path(), "mirror/sources"), "upstream manifest\n");
}

#[test]
fn excluded_paths_are_never_copied() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write(src.path(), "tree/wanted.txt", "w\n");
    write(src.path(), "tree/.gitignore", "target/\n");

    let mut sync = item(&["tree/"], "mirror");
    sync.filters = vec![FilterRule::parse("exclude .gitignore").unwrap()];
    fs::create_dir_all(dest.path().join("mirror")).unwrap();
    sync.sync(src.path(), dest.path()).unwrap();

    assert!(dest.path().join("mirror/wanted.txt").exists());
    assert!(!dest.path().join("mirror/.gitignore").exists());
}

#[test]
fn first_matching_filter_wins() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write(src.path(), "tree/notes.txt", "new\n");
    write(dest.path(), "mirror/notes.txt", "old\n");

    // protect declared first shadows the broader exclude
    let mut sync = item(&["tree/"], "mirror");
    sync.filters = vec![
        FilterRule::parse("protect notes.txt").unwrap(),
        FilterRule::parse("exclude *.txt").unwrap(),
    ];
    sync.sync(src.path(), dest.path()).unwrap();

    assert_eq!(read(dest.path(), "mirror/notes.txt"), "old\n");
}
