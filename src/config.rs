//! Merge configuration.
//!
//! The planner never sees raw arguments. Everything it needs arrives in a
//! [`MergeConfig`]: cleaned paths, parsed exclusion patterns, and normalized
//! extensions, already checked by [`MergeConfig::validate`].
//!
//! ## Layering
//!
//! Values come from two places, combined by [`MergeConfig::build`]:
//!
//! 1. An optional TOML file (`--config shard-merge.toml`)
//! 2. Command-line flags
//!
//! ```toml
//! # All keys are optional
//!
//! destinations = ["/srv/store"]        # first entry receives new files
//! exclude = [".git", "node_modules"]   # path fragments, matched per segment
//! extensions = ["jpg", "png"]          # leading dot optional, any case
//! preserve_file_names = false          # keep names verbatim instead of sanitizing
//! ```
//!
//! Destinations given on the command line replace the file's list; exclusions
//! and extensions from both layers are concatenated; `preserve_file_names` is
//! on when either layer turns it on. With no destination anywhere the current
//! directory is used.
//!
//! Unknown keys are rejected to catch typos early.

use crate::paths;
use crate::scan::ExclusionPattern;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Contents of a `shard-merge.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub destinations: Vec<String>,
    pub exclude: Vec<String>,
    pub extensions: Vec<String>,
    pub preserve_file_names: bool,
}

/// Raw merge options as collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    pub source: PathBuf,
    pub destinations: Vec<PathBuf>,
    pub exclude: Vec<String>,
    pub extensions: Vec<String>,
    pub preserve_file_names: bool,
}

/// Validated configuration for one planning run.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    /// Root of the tree being merged.
    pub source: PathBuf,
    /// Destination stores; the first one receives new files.
    pub destinations: Vec<PathBuf>,
    /// Path fragments pruned from the source walk.
    pub exclusions: Vec<ExclusionPattern>,
    /// Extensions to merge, each with a leading dot.
    pub extensions: Vec<String>,
    /// Use original file names verbatim instead of sanitizing them.
    pub preserve_file_names: bool,
}

impl MergeConfig {
    /// Combine command-line options with an optional config file.
    pub fn build(options: MergeOptions, file: Option<FileConfig>) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();

        let destinations: Vec<PathBuf> = if !options.destinations.is_empty() {
            options.destinations
        } else if !file.destinations.is_empty() {
            file.destinations.iter().map(PathBuf::from).collect()
        } else {
            vec![PathBuf::from(".")]
        };

        let exclude: Vec<String> = file.exclude.into_iter().chain(options.exclude).collect();
        let extensions = file
            .extensions
            .iter()
            .chain(options.extensions.iter())
            .map(|e| normalize_extension(e))
            .collect();

        let config = Self {
            source: paths::clean(&options.source),
            destinations: destinations.iter().map(|d| paths::clean(d)).collect(),
            exclusions: parse_exclusions(&exclude)?,
            extensions,
            preserve_file_names: options.preserve_file_names || file.preserve_file_names,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a merge.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.destinations.is_empty() {
            return Err(ConfigError::Validation(
                "at least one destination is required".into(),
            ));
        }
        // Destinations are rendered into shell text
        if let Some(bad) = self.destinations.iter().find(|d| d.to_str().is_none()) {
            return Err(ConfigError::Validation(format!(
                "destination {} is not valid UTF-8",
                bad.display()
            )));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "no extensions given; pass one or more with -e (run `shard-merge exts` to list them)"
                    .into(),
            ));
        }
        Ok(())
    }

    /// The store new files are placed into.
    pub fn primary_destination(&self) -> &Path {
        &self.destinations[0]
    }
}

/// Load a config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Parse exclusion patterns, rejecting ones with no path segments.
pub fn parse_exclusions(raw: &[String]) -> Result<Vec<ExclusionPattern>, ConfigError> {
    raw.iter()
        .map(|p| {
            ExclusionPattern::parse(p).ok_or_else(|| {
                ConfigError::Validation(format!("exclusion pattern {p:?} has no path segments"))
            })
        })
        .collect()
}

/// Ensure an extension carries its leading dot: `jpg` → `.jpg`.
///
/// An empty string stays empty and selects files without an extension.
pub fn normalize_extension(ext: &str) -> String {
    if ext.is_empty() || ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

/// A documented `shard-merge.toml` with every key at its default.
pub fn stock_config_toml() -> &'static str {
    r#"# shard-merge configuration
#
# Command-line flags are layered on top of these values:
# destinations given with -d replace this list, while -x and -e
# add to the lists below.

# Destination stores. New files go into the first one; the others are
# only searched for content that is already stored.
destinations = ["."]

# Path fragments to leave out of the source walk. A fragment matches
# whole path segments, so "a/b" skips x/a/b/c but not x/ab/c.
exclude = []

# File extensions to merge. The leading dot is optional and matching
# ignores case.
extensions = []

# Keep original file names instead of the shortened, cleaned-up form.
preserve_file_names = false
"#
}
