//! core::trailers
//!
//! Provenance trailers embedded in commit messages.
//!
//! Synchronization provenance lives in the commit messages themselves, as
//! `Key: value` trailer lines in the message footer. This keeps the
//! "which dist-git patch came from which source-git commit" mapping (and
//! its inverse) answerable from the repositories alone, without an
//! external database.
//!
//! # Recognized keys
//!
//! - `Patch-name` - downstream patch file name for this commit
//! - `Patch-id` - numeric position in the generated patch series
//! - `Patch-status` - free-form status carried over from the patch header
//! - `From-dist-git-commit` - dist-git commit this commit was created from
//! - `From-source-git-commit` - source-git commit this commit was created from
//!
//! Unknown keys are preserved verbatim on decode so that trailers written
//! by newer versions survive a round-trip through older ones.
//!
//! # Example
//!
//! ```
//! use sgsync::core::trailers::{decode, encode, find_trailer, Trailer};
//!
//! let block = encode(&[
//!     Trailer::new("Patch-name", "0001-fix.patch"),
//!     Trailer::new("Patch-id", "1"),
//! ]);
//! let message = format!("Fix the frobnicator\n\n{block}\n");
//!
//! assert_eq!(
//!     find_trailer(&message, "Patch-name").as_deref(),
//!     Some("0001-fix.patch")
//! );
//! assert_eq!(decode(&message).len(), 2);
//! ```

/// Trailer key: downstream patch file name.
pub const PATCH_NAME: &str = "Patch-name";
/// Trailer key: numeric position in the patch series.
pub const PATCH_ID: &str = "Patch-id";
/// Trailer key: free-form patch status.
pub const PATCH_STATUS: &str = "Patch-status";
/// Trailer key: dist-git commit a source-git commit was created from.
pub const FROM_DIST_GIT_COMMIT: &str = "From-dist-git-commit";
/// Trailer key: source-git commit a dist-git commit was created from.
pub const FROM_SOURCE_GIT_COMMIT: &str = "From-source-git-commit";

/// The closed set of trailer keys the engine interprets.
///
/// Every other syntactically valid trailer key maps to [`TrailerKey::Other`]
/// and is carried through encode/decode untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrailerKey {
    PatchName,
    PatchId,
    PatchStatus,
    FromDistGitCommit,
    FromSourceGitCommit,
    /// Unrecognized key, preserved verbatim.
    Other(String),
}

impl TrailerKey {
    /// Classify a raw key string.
    ///
    /// Keys are case-sensitive; `patch-name` is [`TrailerKey::Other`],
    /// not [`TrailerKey::PatchName`].
    pub fn parse(key: &str) -> Self {
        match key {
            PATCH_NAME => TrailerKey::PatchName,
            PATCH_ID => TrailerKey::PatchId,
            PATCH_STATUS => TrailerKey::PatchStatus,
            FROM_DIST_GIT_COMMIT => TrailerKey::FromDistGitCommit,
            FROM_SOURCE_GIT_COMMIT => TrailerKey::FromSourceGitCommit,
            other => TrailerKey::Other(other.to_string()),
        }
    }

    /// Get the wire representation of the key.
    pub fn as_str(&self) -> &str {
        match self {
            TrailerKey::PatchName => PATCH_NAME,
            TrailerKey::PatchId => PATCH_ID,
            TrailerKey::PatchStatus => PATCH_STATUS,
            TrailerKey::FromDistGitCommit => FROM_DIST_GIT_COMMIT,
            TrailerKey::FromSourceGitCommit => FROM_SOURCE_GIT_COMMIT,
            TrailerKey::Other(key) => key,
        }
    }
}

/// A single `Key: value` trailer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    pub key: String,
    pub value: String,
}

impl Trailer {
    /// Create a trailer from a key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Classify this trailer's key.
    pub fn kind(&self) -> TrailerKey {
        TrailerKey::parse(&self.key)
    }
}

/// Render trailers as a message-footer block.
///
/// One `Key: value` line per trailer, in the given order, no trailing
/// newline. `decode` is the left inverse of this function.
pub fn encode(trailers: &[Trailer]) -> String {
    trailers
        .iter()
        .map(|t| format!("{}: {}", t.key, t.value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract the trailer block from a commit message.
///
/// Only the trailing contiguous block of `Key: value` lines is scanned,
/// bottom up; the first line that does not parse as a trailer terminates
/// the block. Returned trailers are in their original top-to-bottom
/// order. A message with no trailer block decodes to an empty list.
pub fn decode(message: &str) -> Vec<Trailer> {
    let lines: Vec<&str> = message.trim_end().lines().collect();

    let mut block = Vec::new();
    for line in lines.iter().rev() {
        match parse_trailer_line(line) {
            Some(trailer) => block.push(trailer),
            None => break,
        }
    }

    block.reverse();
    block
}

/// Find the value of a trailer key in a commit message.
///
/// Returns the **last** occurrence if the key repeats: commits get
/// amended during iterative development before they are pushed, and the
/// most recent write is the one that counts.
pub fn find_trailer(message: &str, key: &str) -> Option<String> {
    decode(message)
        .into_iter()
        .rev()
        .find(|t| t.key == key)
        .map(|t| t.value)
}

/// Append a trailer block to a commit message.
///
/// The message body is separated from the block by a blank line, the way
/// `git commit --trailer` lays messages out.
pub fn append_trailers(message: &str, trailers: &[Trailer]) -> String {
    if trailers.is_empty() {
        return message.to_string();
    }
    format!("{}\n\n{}", message.trim_end(), encode(trailers))
}

/// Parse a single line as `Key: value`.
///
/// A key starts with an ASCII letter and continues with letters, digits,
/// or `-`. The separator is `: `; the value is the rest of the line,
/// trimmed.
fn parse_trailer_line(line: &str) -> Option<Trailer> {
    let (key, value) = line.split_once(": ")?;

    if key.is_empty() || !key.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return None;
    }

    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    Some(Trailer::new(key, value))
}
