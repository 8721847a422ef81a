//! external
//!
//! Narrow interfaces to the engine's external collaborators.
//!
//! The synchronization core never talks to build farms, update systems,
//! or forges directly. It consumes two seams: a [`CommandRunner`] for
//! "run an external tool and capture its output", and a
//! [`RemoteProject`] handle exposing read-only status queries against
//! the hosting service. Callers supply concrete implementations; tests
//! supply fakes.

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors from running an external command.
///
/// `Failed` (the tool crashed or exited non-zero) is deliberately
/// distinct from `NoOutput` (the tool succeeded but the expected
/// artifact is absent), so callers can tell the two apart.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("cannot spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed with status {status}\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    Failed {
        program: String,
        status: i32,
        stdout: String,
        stderr: String,
    },

    #[error("{program} succeeded but produced no output")]
    NoOutput { program: String },
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Get stdout, treating emptiness as [`CommandError::NoOutput`].
    pub fn require_stdout(self, program: &str) -> Result<String, CommandError> {
        if self.stdout.trim().is_empty() {
            return Err(CommandError::NoOutput {
                program: program.to_string(),
            });
        }
        Ok(self.stdout)
    }
}

/// The "run external command" primitive.
pub trait CommandRunner {
    /// Run `program` with `args` in `cwd`, capturing output.
    ///
    /// # Errors
    ///
    /// - [`CommandError::Spawn`] if the program cannot be started
    /// - [`CommandError::Failed`] on a non-zero exit, with captured
    ///   stdout/stderr
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput, CommandError>;
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Default)]
pub struct LocalCommandRunner;

impl CommandRunner for LocalCommandRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput, CommandError> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| CommandError::Spawn {
                program: program.to_string(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(CommandError::Failed {
                program: program.to_string(),
                status: output.status.code().unwrap_or(-1),
                stdout,
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

/// Error from a remote status query.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RemoteError(pub String);

/// A pull request, as reported by the hosting service.
#[derive(Debug, Clone, Serialize)]
pub struct PullRequestInfo {
    pub id: u64,
    pub title: String,
    pub url: String,
}

/// A downstream branch and the package version it carries.
#[derive(Debug, Clone, Serialize)]
pub struct BranchVersion {
    pub branch: String,
    pub version: String,
}

/// An upstream release.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseInfo {
    pub tag: String,
    pub url: String,
}

/// A build-farm result.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub build_id: u64,
    pub status: String,
}

/// A published-update state.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateInfo {
    pub alias: String,
    pub status: String,
}

/// A static-analysis scan result.
#[derive(Debug, Clone, Serialize)]
pub struct ScanInfo {
    pub scan_id: u64,
    pub status: String,
}

/// Read-only handle to the remote project hosting this package.
///
/// All six queries are independent; the report aggregator runs them
/// concurrently and tolerates individual failures.
#[async_trait]
pub trait RemoteProject: Send + Sync {
    async fn pull_requests(&self) -> Result<Vec<PullRequestInfo>, RemoteError>;
    async fn branch_versions(&self) -> Result<Vec<BranchVersion>, RemoteError>;
    async fn releases(&self) -> Result<Vec<ReleaseInfo>, RemoteError>;
    async fn builds(&self) -> Result<Vec<BuildInfo>, RemoteError>;
    async fn updates(&self) -> Result<Vec<UpdateInfo>, RemoteError>;
    async fn scans(&self) -> Result<Vec<ScanInfo>, RemoteError>;
}
