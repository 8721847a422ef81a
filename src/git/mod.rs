//! git
//!
//! Version-control adapter built on git2.

pub mod interface;

pub use interface::{CommitInfo, Git, GitError, Identity, WorktreeStatus};
