//! The merge planner.
//!
//! Turns a source tree into a [`Plan`]: one decision per matching file, plus
//! the shard directories that have to exist before the plan can run. Nothing
//! on disk is modified here.
//!
//! ## Decisions
//!
//! Each source goes `scanned → fingerprinted → resolved → decided`:
//!
//! | Lookup result                      | Source is that file? | Action   |
//! |------------------------------------|----------------------|----------|
//! | decided earlier in this run        | yes                  | `keep`   |
//! | decided earlier in this run        | no                   | `remove` |
//! | existing store file (verified)     | yes                  | `keep`   |
//! | existing store file (verified)     | no                   | `remove` |
//! | nothing                            | —                    | `move`   |
//!
//! A `move` targets `<primary>/<fp[..2]>/<fp>__<name>`. Because the first
//! source to claim a fingerprint also claims its destination, identical
//! files always end up pointing at the same place, and every later copy is a
//! `remove`.
//!
//! "Is that file" compares paths, not inodes: equal spellings, or equal once
//! both are made absolute and cleaned. A relative source path therefore
//! still recognizes itself in an absolute destination.
//!
//! ## Failure
//!
//! Any scan, hash, or store lookup error aborts the run. There is no partial plan.

use crate::config::MergeConfig;
use crate::fingerprint::{self, FingerprintError};
use crate::index::{self, DestinationEntry, DestinationIndex, IndexError, Resolution};
use crate::naming::NamePatterns;
use crate::paths;
use crate::scan::{self, ScanError};
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PlanError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("Cannot inspect {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What to do with one source file.
///
/// The declaration order is the output order: keeps, then moves, then
/// removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// Already at its destination.
    Keep,
    /// Relocate to its destination.
    Move,
    /// Redundant: its destination already holds the same content.
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Keep => "keep",
            Action::Move => "move",
            Action::Remove => "remove",
        })
    }
}

/// A scanned file with its fingerprint and display name, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintedSource {
    pub path: PathBuf,
    pub fingerprint: String,
    pub name: String,
}

/// A source file with its final decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub fingerprint: String,
    /// Name used after `<fp>__` when the file is moved into the store.
    pub name: String,
    /// Index into [`Plan::destinations`].
    pub destination: usize,
    pub action: Action,
}

/// The complete outcome of a planning run.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Decided sources, in scan order.
    pub sources: Vec<SourceEntry>,
    /// One entry per distinct fingerprint.
    pub destinations: Vec<DestinationEntry>,
    /// Shard directories that must be created, first-seen order.
    pub mkdirs: Vec<PathBuf>,
}

impl Plan {
    /// The destination a source resolved to.
    pub fn destination_of(&self, source: &SourceEntry) -> &DestinationEntry {
        &self.destinations[source.destination]
    }

    /// Sources ordered by action (keep, move, remove), scan order within
    /// each action.
    pub fn ordered(&self) -> Vec<&SourceEntry> {
        let mut ordered: Vec<&SourceEntry> = self.sources.iter().collect();
        ordered.sort_by_key(|s| s.action);
        ordered
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary {
            mkdirs: self.mkdirs.len(),
            ..Default::default()
        };
        for source in &self.sources {
            match source.action {
                Action::Keep => summary.keep += 1,
                Action::Move => summary.moves += 1,
                Action::Remove => summary.remove += 1,
            }
        }
        summary
    }
}

/// Action counts for a plan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub keep: usize,
    pub moves: usize,
    pub remove: usize,
    pub mkdirs: usize,
}

impl PlanSummary {
    pub fn total(&self) -> usize {
        self.keep + self.moves + self.remove
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} kept, {} moved, {} removed ({} total), {} directories to create",
            self.keep,
            self.moves,
            self.remove,
            self.total(),
            self.mkdirs
        )
    }
}

/// Decides sources one at a time against a growing [`DestinationIndex`].
pub struct MergePlanner<'a> {
    config: &'a MergeConfig,
    patterns: &'a NamePatterns,
    index: DestinationIndex,
}

impl<'a> MergePlanner<'a> {
    pub fn new(config: &'a MergeConfig, patterns: &'a NamePatterns) -> Self {
        Self {
            config,
            patterns,
            index: DestinationIndex::new(config.destinations.clone()),
        }
    }

    /// Hash a scanned file and derive its store name.
    pub fn fingerprint(&self, path: PathBuf) -> Result<FingerprintedSource, PlanError> {
        let fingerprint = fingerprint::hash_file(&path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = if self.config.preserve_file_names {
            file_name
        } else {
            self.patterns.sanitize(&file_name)
        };
        Ok(FingerprintedSource {
            path,
            fingerprint,
            name,
        })
    }

    /// Resolve a fingerprinted source and assign its action.
    pub fn decide(&mut self, source: FingerprintedSource) -> Result<SourceEntry, PlanError> {
        let (destination, action) = match self.index.resolve(&source.fingerprint)? {
            Resolution::InMemory(i) => {
                let existing = &self.index.entries()[i].path;
                (i, keep_or_remove(&source.path, existing))
            }
            Resolution::OnDisk(found) => {
                let action = keep_or_remove(&source.path, &found);
                (self.index.insert(&source.fingerprint, found), action)
            }
            Resolution::Missing => {
                let target = index::canonical_path(
                    self.config.primary_destination(),
                    &source.fingerprint,
                    &source.name,
                );
                (self.index.insert(&source.fingerprint, target), Action::Move)
            }
        };

        debug!(
            path = %source.path.display(),
            fingerprint = %source.fingerprint,
            %action,
            "decided"
        );

        Ok(SourceEntry {
            path: source.path,
            fingerprint: source.fingerprint,
            name: source.name,
            destination,
            action,
        })
    }

    /// Close the run: work out the missing shard directories and hand back
    /// the plan.
    pub fn finish(self, sources: Vec<SourceEntry>) -> Result<Plan, PlanError> {
        let destinations = self.index.into_entries();
        let mkdirs = missing_dirs(
            self.config.primary_destination(),
            &sources,
            &destinations,
        )?;
        Ok(Plan {
            sources,
            destinations,
            mkdirs,
        })
    }
}

fn keep_or_remove(source: &Path, destination: &Path) -> Action {
    if paths::same_file(source, destination) {
        Action::Keep
    } else {
        Action::Remove
    }
}

/// Shard directories of new placements under `primary` that do not exist
/// yet, each listed once.
fn missing_dirs(
    primary: &Path,
    sources: &[SourceEntry],
    destinations: &[DestinationEntry],
) -> Result<Vec<PathBuf>, PlanError> {
    let mut seen = HashSet::new();
    let mut mkdirs = Vec::new();
    for source in sources.iter().filter(|s| s.action == Action::Move) {
        let target = &destinations[source.destination].path;
        let Some(shard) = target.parent() else {
            continue;
        };
        if !paths::is_under(target, primary).map_err(io_error(target))? {
            continue;
        }
        if seen.contains(shard) {
            continue;
        }
        seen.insert(shard.to_path_buf());
        if !shard.try_exists().map_err(io_error(shard))? {
            mkdirs.push(shard.to_path_buf());
        }
    }
    Ok(mkdirs)
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PlanError + use<> {
    let path = path.to_path_buf();
    move |source| PlanError::Io { path, source }
}

/// Plan a merge of `config.source` into `config.destinations`.
pub fn plan(config: &MergeConfig, patterns: &NamePatterns) -> Result<Plan, PlanError> {
    info!(
        source = %config.source.display(),
        primary = %config.primary_destination().display(),
        "planning merge"
    );

    let mut planner = MergePlanner::new(config, patterns);
    let mut sources = Vec::new();
    for path in scan::walk_files(&config.source, &config.exclusions) {
        let path = path?;
        if !scan::has_extension(&path, &config.extensions) {
            continue;
        }
        let path = scan::ensure_utf8(path)?;
        let fingerprinted = planner.fingerprint(path)?;
        sources.push(planner.decide(fingerprinted)?);
    }

    let plan = planner.finish(sources)?;
    info!("{}", plan.summary());
    Ok(plan)
}
