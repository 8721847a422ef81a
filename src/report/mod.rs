//! report
//!
//! Best-effort, concurrent status reporting.
//!
//! The six status queries (pull requests, branch versions, upstream
//! releases, build-farm results, update states, scan results) are
//! independent and read-only, so they run concurrently. Each query is
//! individually fault-isolated: a failure is logged and resolves to an
//! empty result instead of cancelling the others or aborting the
//! aggregate. The aggregate blocks until all six have resolved and
//! assembles results in declaration order, not completion order.
//!
//! This is the one call site allowed to downgrade errors: its contract
//! is best-effort reporting, not commit-history truth.

use serde::Serialize;
use tracing::warn;

use crate::external::{
    BranchVersion, BuildInfo, PullRequestInfo, ReleaseInfo, RemoteError, RemoteProject, ScanInfo,
    UpdateInfo,
};

/// Aggregated project status.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub pull_requests: Vec<PullRequestInfo>,
    pub branch_versions: Vec<BranchVersion>,
    pub releases: Vec<ReleaseInfo>,
    pub builds: Vec<BuildInfo>,
    pub updates: Vec<UpdateInfo>,
    pub scans: Vec<ScanInfo>,
}

/// Gather the full status report from the remote project.
///
/// Never fails: each failing query yields its empty section.
pub async fn gather(project: &dyn RemoteProject) -> StatusReport {
    let (pull_requests, branch_versions, releases, builds, updates, scans) = tokio::join!(
        project.pull_requests(),
        project.branch_versions(),
        project.releases(),
        project.builds(),
        project.updates(),
        project.scans(),
    );

    StatusReport {
        pull_requests: or_empty(pull_requests, "pull requests"),
        branch_versions: or_empty(branch_versions, "branch versions"),
        releases: or_empty(releases, "releases"),
        builds: or_empty(builds, "builds"),
        updates: or_empty(updates, "updates"),
        scans: or_empty(scans, "scans"),
    }
}

fn or_empty<T>(result: Result<Vec<T>, RemoteError>, what: &str) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(error) => {
            warn!(query = what, %error, "status query failed, reporting empty section");
            Vec::new()
        }
    }
}
