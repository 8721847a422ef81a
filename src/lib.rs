//! sgsync - keeps source-git and dist-git repositories synchronized
//!
//! A source-git repository carries the upstream project's full history
//! plus downstream packaging as regular commits; its dist-git
//! counterpart carries the spec file, numbered patch files, and source
//! archives. This crate converts between the two representations and
//! tracks what is pending on each side.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engines)
//! - [`core`] - Domain types, configuration, and the provenance trailer protocol
//! - [`git`] - Single interface for all Git operations
//! - [`patches`] - Patch engine: commit ranges to numbered patch series
//! - [`status`] - Synchronization status from commit-graph traversal
//! - [`bootstrap`] - One-shot source-git creation from upstream + dist-git
//! - [`sync`] - Declarative file copying between the repositories
//! - [`report`] - Concurrent best-effort status aggregation
//! - [`external`] - Narrow interfaces to external collaborators
//!
//! # Correctness Invariants
//!
//! 1. Synchronization provenance lives in commit messages (trailers),
//!    never in external state
//! 2. Existing history is never rewritten in place; new commits are
//!    appended or recreated on throwaway branches
//! 3. Provenance problems are fatal; only the status report aggregation
//!    downgrades errors

pub mod bootstrap;
pub mod cli;
pub mod core;
pub mod external;
pub mod git;
pub mod patches;
pub mod report;
pub mod status;
pub mod sync;
