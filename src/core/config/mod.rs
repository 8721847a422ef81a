//! core::config
//!
//! Package configuration loading and resolution.
//!
//! The synchronization engine never reads configuration files ad hoc: a
//! [`ConfigFile`] is parsed once, validated, and resolved - with job >
//! package > default precedence - into an immutable [`PackageConfig`]
//! that the engines consume read-only.

pub mod schema;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use schema::{ConfigFile, JobConfig, OneOrMany, SyncItemConfig};

use crate::sync::{FilterRule, SyncFilesItem};

/// Name of the package configuration file.
pub const CONFIG_FILE_NAME: &str = ".sgsync.toml";

/// Reserved directory inside source-git holding the packaging subtree.
pub const DISTRO_DIR: &str = ".distro";

/// Default zero-padding width for patch numbers.
pub const DEFAULT_PATCH_ID_DIGITS: usize = 4;

/// Errors from configuration handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config at {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("missing required config field: {0}")]
    MissingField(&'static str),

    #[error("no such job: {0}")]
    NoSuchJob(String),
}

/// The effective, immutable package configuration.
///
/// Resolved once per operation; the engines only ever read this value.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageConfig {
    /// Path of the spec file, relative to the source-git root.
    pub specfile_path: PathBuf,

    /// Paths excluded from generated patch diffs.
    pub patch_generation_ignore_paths: Vec<PathBuf>,

    /// Zero-padding width of patch numbers.
    pub patch_generation_patch_id_digits: usize,

    /// Squash commits into one patch per `Patch-name` by default.
    pub patch_generation_squash_commits: bool,

    /// Files to copy between the repositories, in declaration order.
    pub files_to_sync: Vec<SyncFilesItem>,
}

impl ConfigFile {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the effective configuration for an optional job.
    ///
    /// Field precedence: job-level > package-level > built-in default.
    ///
    /// # Errors
    ///
    /// - `ConfigError::NoSuchJob` if `job` names no configured job
    /// - `ConfigError::MissingField` if `specfile_path` is set nowhere
    pub fn resolve(&self, job: Option<&str>) -> Result<PackageConfig, ConfigError> {
        let overrides = match job {
            Some(name) => Some(
                self.jobs
                    .iter()
                    .find(|j| j.job == name)
                    .ok_or_else(|| ConfigError::NoSuchJob(name.to_string()))?,
            ),
            None => None,
        };

        let specfile_path = overrides
            .and_then(|j| j.specfile_path.clone())
            .or_else(|| self.specfile_path.clone())
            .ok_or(ConfigError::MissingField("specfile_path"))?;

        let patch_generation_ignore_paths = overrides
            .and_then(|j| j.patch_generation_ignore_paths.clone())
            .or_else(|| self.patch_generation_ignore_paths.clone())
            .unwrap_or_else(|| vec![PathBuf::from(DISTRO_DIR)]);

        let patch_generation_patch_id_digits = overrides
            .and_then(|j| j.patch_generation_patch_id_digits)
            .or(self.patch_generation_patch_id_digits)
            .unwrap_or(DEFAULT_PATCH_ID_DIGITS);

        let patch_generation_squash_commits = overrides
            .and_then(|j| j.patch_generation_squash_commits)
            .or(self.patch_generation_squash_commits)
            .unwrap_or(false);

        let raw_items = overrides
            .and_then(|j| j.files_to_sync.clone())
            .or_else(|| self.files_to_sync.clone())
            .unwrap_or_default();

        let mut files_to_sync = Vec::with_capacity(raw_items.len());
        for item in raw_items {
            files_to_sync.push(resolve_sync_item(item)?);
        }

        Ok(PackageConfig {
            specfile_path,
            patch_generation_ignore_paths,
            patch_generation_patch_id_digits,
            patch_generation_squash_commits,
            files_to_sync,
        })
    }
}

/// Convert a parsed sync entry into the engine's `SyncFilesItem`.
fn resolve_sync_item(item: SyncItemConfig) -> Result<SyncFilesItem, ConfigError> {
    let mut filters = Vec::with_capacity(item.filters.len());
    for rule in &item.filters {
        filters.push(
            FilterRule::parse(rule).map_err(|e| ConfigError::InvalidValue(e.to_string()))?,
        );
    }

    Ok(SyncFilesItem {
        src: item.src.into_vec(),
        dest: item.dest,
        delete: item.delete,
        filters,
    })
}
