//! core::config::schema
//!
//! Configuration file schema types.
//!
//! The package configuration lives in `.sgsync.toml` at the root of the
//! source-git repository. Package-level fields can be overridden per job;
//! resolution precedence is job > package > built-in default, computed
//! once into an immutable [`super::PackageConfig`].
//!
//! # Example
//!
//! ```toml
//! specfile_path = ".distro/acme.spec"
//! patch_generation_ignore_paths = [".distro"]
//! patch_generation_patch_id_digits = 4
//!
//! [[files_to_sync]]
//! src = [".distro/"]
//! dest = "."
//! delete = true
//! filters = ["protect .git*", "protect sources", "exclude .gitignore"]
//!
//! [[jobs]]
//! job = "release"
//! patch_generation_patch_id_digits = 5
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::sync::FilterRule;

/// The on-disk configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Path of the spec file, relative to the source-git root.
    pub specfile_path: Option<PathBuf>,

    /// Paths excluded from generated patch diffs (the packaging subtree
    /// itself, generated files).
    pub patch_generation_ignore_paths: Option<Vec<PathBuf>>,

    /// Zero-padding width of patch numbers in file names and specfile
    /// declarations.
    pub patch_generation_patch_id_digits: Option<usize>,

    /// Squash commits into one patch per `Patch-name` by default.
    pub patch_generation_squash_commits: Option<bool>,

    /// Files to copy between the repositories.
    pub files_to_sync: Option<Vec<SyncItemConfig>>,

    /// Per-job overrides of the package-level fields.
    pub jobs: Vec<JobConfig>,
}

impl ConfigFile {
    /// Validate cross-field constraints after parsing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(digits) = self.patch_generation_patch_id_digits {
            if digits == 0 {
                return Err(ConfigError::InvalidValue(
                    "patch_generation_patch_id_digits must be at least 1".into(),
                ));
            }
        }

        if let Some(items) = &self.files_to_sync {
            for item in items {
                item.validate()?;
            }
        }

        for job in &self.jobs {
            job.validate()?;
        }

        Ok(())
    }
}

/// Per-job override block.
///
/// Any field left unset falls through to the package-level value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    /// Job name this block applies to.
    pub job: String,

    pub specfile_path: Option<PathBuf>,
    pub patch_generation_ignore_paths: Option<Vec<PathBuf>>,
    pub patch_generation_patch_id_digits: Option<usize>,
    pub patch_generation_squash_commits: Option<bool>,
    pub files_to_sync: Option<Vec<SyncItemConfig>>,
}

impl JobConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.job.is_empty() {
            return Err(ConfigError::InvalidValue(
                "job name cannot be empty".into(),
            ));
        }
        if let Some(items) = &self.files_to_sync {
            for item in items {
                item.validate()?;
            }
        }
        Ok(())
    }
}

/// One `[[files_to_sync]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SyncItemConfig {
    /// Source pattern(s); a bare string means a single pattern.
    pub src: OneOrMany,

    /// Destination path, relative to the destination root.
    #[serde(default = "default_dest")]
    pub dest: PathBuf,

    /// Mirror deletions under `dest`.
    #[serde(default)]
    pub delete: bool,

    /// Filter rules (`protect <glob>` / `exclude <glob>`), in order.
    #[serde(default)]
    pub filters: Vec<String>,
}

impl SyncItemConfig {
    /// Check the filter rules parse.
    fn validate(&self) -> Result<(), ConfigError> {
        for rule in &self.filters {
            FilterRule::parse(rule)
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        }
        Ok(())
    }
}

fn default_dest() -> PathBuf {
    PathBuf::from(".")
}

/// A single string or a list of strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Normalize to a list.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}
