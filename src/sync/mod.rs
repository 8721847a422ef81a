//! sync
//!
//! File synchronization engine.
//!
//! Resolves declarative sync specifications ([`SyncFilesItem`]) against a
//! filesystem tree and performs the resulting copy/mirror operations.
//! Used both to materialize the packaging subtree inside source-git and
//! to copy arbitrary files between the two repositories.
//!
//! # Model
//!
//! A [`SyncFilesItem`] declares a list of source patterns, one destination,
//! a `delete` flag (mirror removals), and an ordered list of filter rules.
//! Glob expansion turns it into zero or more [`RawSyncFilesItem`]s, the
//! concrete `(source path, destination path)` pairs that actually get
//! copied. Every expanded pair keeps the declared destination.
//!
//! # Filters
//!
//! Rules are free-text strings, evaluated in declaration order; the first
//! rule matching a path wins:
//!
//! - `protect <glob>` - never overwritten or deleted at the destination;
//!   still copied where the destination has nothing yet
//! - `exclude <glob>` - never copied, never counted for deletion
//!
//! # Example
//!
//! ```no_run
//! use sgsync::sync::{FilterRule, SyncFilesItem};
//! use std::path::Path;
//!
//! let item = SyncFilesItem {
//!     src: vec!["*.md".into()],
//!     dest: "docs".into(),
//!     delete: false,
//!     filters: vec![FilterRule::parse("exclude DRAFT.md").unwrap()],
//! };
//! let raw = item.resolve(Path::new("/src"), Path::new("/dst")).unwrap();
//! sgsync::sync::apply(&raw, false, &item.filters).unwrap();
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use tracing::debug;

/// Errors from file synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A literal (non-glob) source path does not exist.
    ///
    /// Glob patterns that match nothing are not an error; a literal path
    /// names one specific file, so its absence is.
    #[error("source path does not exist: {path}")]
    MissingSource {
        /// The missing path
        path: PathBuf,
    },

    /// A pattern matched nothing under strict resolution.
    #[error("pattern matched no files: {pattern}")]
    NoMatches {
        /// The offending pattern
        pattern: String,
    },

    /// A filter rule string could not be parsed.
    #[error("invalid filter rule: {rule}")]
    InvalidFilter {
        /// The offending rule text
        rule: String,
    },

    /// A glob pattern is syntactically invalid.
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Parser diagnostic
        message: String,
    },

    /// Filesystem operation failed.
    #[error("io error at {path}: {source}")]
    Io {
        /// The path being operated on
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
}

/// A single filter rule: `protect <glob>` or `exclude <glob>`.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterRule {
    /// Never overwritten or deleted at the destination.
    Protect(Pattern),
    /// Never copied; invisible to deletion accounting.
    Exclude(Pattern),
}

impl FilterRule {
    /// Parse a rule from its free-text form.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidFilter` for an unknown verb and
    /// `SyncError::InvalidPattern` for a malformed glob.
    ///
    /// # Example
    ///
    /// ```
    /// use sgsync::sync::FilterRule;
    ///
    /// assert!(FilterRule::parse("protect .git*").is_ok());
    /// assert!(FilterRule::parse("exclude .gitignore").is_ok());
    /// assert!(FilterRule::parse("banish *.tmp").is_err());
    /// ```
    pub fn parse(rule: &str) -> Result<Self, SyncError> {
        let (verb, pattern) = rule
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| SyncError::InvalidFilter { rule: rule.into() })?;

        let pattern = Pattern::new(pattern.trim()).map_err(|e| SyncError::InvalidPattern {
            pattern: pattern.trim().into(),
            message: e.msg.into(),
        })?;

        match verb {
            "protect" => Ok(FilterRule::Protect(pattern)),
            "exclude" => Ok(FilterRule::Exclude(pattern)),
            _ => Err(SyncError::InvalidFilter { rule: rule.into() }),
        }
    }

    /// The glob pattern of the rule.
    pub fn pattern(&self) -> &Pattern {
        match self {
            FilterRule::Protect(p) | FilterRule::Exclude(p) => p,
        }
    }
}

/// A declarative sync specification.
///
/// `src` patterns are evaluated relative to a source root; `dest` is
/// always relative to a destination root. Glob expansion preserves the
/// declared `dest` for every matched path.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFilesItem {
    /// Ordered list of path patterns, relative to the source root.
    pub src: Vec<String>,
    /// Destination, relative to the destination root.
    pub dest: PathBuf,
    /// Mirror deletions: remove paths under `dest` absent from `src`.
    pub delete: bool,
    /// Ordered filter rules; first match per path wins.
    pub filters: Vec<FilterRule>,
}

impl SyncFilesItem {
    /// Expand the item's patterns into concrete copy pairs.
    ///
    /// - a pattern without wildcards that does not end in `/` is a
    ///   literal path (exactly one result, existence checked at apply)
    /// - a pattern ending in `/` gets `*` appended, then globs
    /// - anything else globs directly
    ///
    /// Wildcards behave like the shell: they do not match hidden
    /// entries, so `./*` never picks up `.git`. A pattern matching
    /// nothing yields zero results.
    pub fn resolve(
        &self,
        src_root: &Path,
        dest_root: &Path,
    ) -> Result<Vec<RawSyncFilesItem>, SyncError> {
        self.resolve_inner(src_root, dest_root, false)
    }

    /// Like [`SyncFilesItem::resolve`], but a pattern matching nothing is
    /// an error. Used by configuration validation.
    pub fn resolve_strict(
        &self,
        src_root: &Path,
        dest_root: &Path,
    ) -> Result<Vec<RawSyncFilesItem>, SyncError> {
        self.resolve_inner(src_root, dest_root, true)
    }

    fn resolve_inner(
        &self,
        src_root: &Path,
        dest_root: &Path,
        strict: bool,
    ) -> Result<Vec<RawSyncFilesItem>, SyncError> {
        let dest = dest_root.join(&self.dest);
        let mut raw = Vec::new();

        for pattern in &self.src {
            if !has_wildcard(pattern) && !pattern.ends_with('/') {
                raw.push(RawSyncFilesItem {
                    src: src_root.join(pattern),
                    dest: dest.clone(),
                });
                continue;
            }

            let expanded = if pattern.ends_with('/') {
                format!("{pattern}*")
            } else {
                pattern.clone()
            };

            let full = src_root.join(&expanded);
            let full = full.to_string_lossy();
            let options = glob::MatchOptions {
                require_literal_leading_dot: true,
                ..Default::default()
            };
            let matches = glob::glob_with(&full, options).map_err(|e| {
                SyncError::InvalidPattern {
                    pattern: expanded.clone(),
                    message: e.msg.into(),
                }
            })?;

            let before = raw.len();
            for entry in matches {
                let path = entry.map_err(|e| SyncError::Io {
                    path: e.path().to_path_buf(),
                    source: e.into_error(),
                })?;
                raw.push(RawSyncFilesItem {
                    src: path,
                    dest: dest.clone(),
                });
            }

            if strict && raw.len() == before {
                return Err(SyncError::NoMatches {
                    pattern: pattern.clone(),
                });
            }
        }

        Ok(raw)
    }

    /// Resolve and apply in one step, using the item's own `delete` flag
    /// and filters.
    pub fn sync(&self, src_root: &Path, dest_root: &Path) -> Result<(), SyncError> {
        let raw = self.resolve(src_root, dest_root)?;
        apply(&raw, self.delete, &self.filters)
    }
}

/// A fully resolved `(source, destination)` pair - the unit actually copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSyncFilesItem {
    /// Concrete source path.
    pub src: PathBuf,
    /// Concrete destination path (directory or file target).
    pub dest: PathBuf,
}

/// Copy the resolved items, optionally mirroring deletions.
///
/// For each item: a missing source is a [`SyncError::MissingSource`]
/// (only literal patterns can produce one - glob matches exist by
/// construction); files are copied preserving permissions; directories
/// are copied and merged recursively. With `delete`, anything under a
/// destination directory that was not placed there by this pass and is
/// not matched by a filter rule is removed. `protect`-matched paths are
/// never overwritten or deleted at the destination, but are still copied
/// where the destination has nothing yet; `exclude`-matched paths are
/// never copied and are invisible to deletion accounting.
pub fn apply(
    items: &[RawSyncFilesItem],
    delete: bool,
    filters: &[FilterRule],
) -> Result<(), SyncError> {
    // dest directory -> entry names this pass placed there
    let mut placed: BTreeMap<PathBuf, BTreeSet<OsString>> = BTreeMap::new();

    for item in items {
        if !item.src.exists() {
            return Err(SyncError::MissingSource {
                path: item.src.clone(),
            });
        }

        let name = match item.src.file_name() {
            Some(name) => PathBuf::from(name),
            None => continue, // root paths carry no copyable name
        };

        if is_excluded(filters, &name) {
            debug!(path = %item.src.display(), "skipped by exclude filter");
            continue;
        }

        // An existing directory destination receives the entry under its
        // own name; anything else is a direct file/dir target.
        let dest_is_dir = item.dest.is_dir();
        let target = if dest_is_dir {
            item.dest.join(&name)
        } else {
            item.dest.clone()
        };

        // Protected paths are copied where the destination has nothing
        // yet, but an existing destination is never overwritten.
        if is_protected(filters, &name) && target.exists() {
            debug!(path = %target.display(), "left protected destination untouched");
            continue;
        }

        if item.src.is_dir() {
            sync_dir(&item.src, &target, &name, delete, filters)?;
        } else {
            copy_file(&item.src, &target)?;
        }

        if dest_is_dir {
            placed
                .entry(item.dest.clone())
                .or_default()
                .insert(name.into_os_string());
        }
    }

    if delete {
        for (dir, names) in &placed {
            mirror_deletions(dir, names, filters)?;
        }
    }

    Ok(())
}

/// Recursively copy `src` into `dest`, merging with existing content.
///
/// `rel` is the path of `src` relative to the sync root, used for filter
/// matching of nested entries.
fn sync_dir(
    src: &Path,
    dest: &Path,
    rel: &Path,
    delete: bool,
    filters: &[FilterRule],
) -> Result<(), SyncError> {
    fs::create_dir_all(dest).map_err(|e| SyncError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let mut kept: BTreeSet<OsString> = BTreeSet::new();

    let entries = fs::read_dir(src).map_err(|e| SyncError::Io {
        path: src.to_path_buf(),
        source: e,
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| SyncError::Io {
            path: src.to_path_buf(),
            source: e,
        })?;
        let name = entry.file_name();
        let entry_rel = rel.join(&name);

        if is_excluded(filters, &entry_rel) {
            continue;
        }

        let entry_src = entry.path();
        let entry_dest = dest.join(&name);
        if is_protected(filters, &entry_rel) && entry_dest.exists() {
            continue;
        }
        kept.insert(name.clone());

        if entry_src.is_dir() {
            sync_dir(&entry_src, &entry_dest, &entry_rel, delete, filters)?;
        } else {
            copy_file(&entry_src, &entry_dest)?;
        }
    }

    if delete {
        mirror_deletions(dest, &kept, filters)?;
    }

    Ok(())
}

/// Remove entries of `dir` that are not in `keep` and not protected.
fn mirror_deletions(
    dir: &Path,
    keep: &BTreeSet<OsString>,
    filters: &[FilterRule],
) -> Result<(), SyncError> {
    let entries = fs::read_dir(dir).map_err(|e| SyncError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| SyncError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let name = entry.file_name();
        if keep.contains(&name) {
            continue;
        }
        // Protected entries survive; excluded entries are invisible to
        // deletion accounting and survive as well.
        let rel = PathBuf::from(&name);
        if first_match(filters, &rel).is_some() {
            debug!(path = %entry.path().display(), "kept by filter");
            continue;
        }

        let path = entry.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| SyncError::Io { path, source: e })?;
    }

    Ok(())
}

/// Copy one file, creating parent directories.
///
/// `fs::copy` carries permission bits over, which is all the metadata the
/// packaging subtree cares about.
fn copy_file(src: &Path, dest: &Path) -> Result<(), SyncError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::copy(src, dest).map_err(|e| SyncError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// First filter rule matching the path, in declaration order.
fn first_match<'a>(filters: &'a [FilterRule], path: &Path) -> Option<&'a FilterRule> {
    filters.iter().find(|rule| rule.pattern().matches_path(path))
}

fn is_excluded(filters: &[FilterRule], path: &Path) -> bool {
    matches!(first_match(filters, path), Some(FilterRule::Exclude(_)))
}

fn is_protected(filters: &[FilterRule], path: &Path) -> bool {
    matches!(first_match(filters, path), Some(FilterRule::Protect(_)))
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}
