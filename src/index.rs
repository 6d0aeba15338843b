//! Fingerprint → destination lookup.
//!
//! The index answers one question: "where does content with this fingerprint
//! already live?" It is filled lazily while planning:
//!
//! 1. **In memory**: destinations already decided earlier in this run.
//! 2. **On disk**: each destination root's shard directory
//!    (`<root>/<fp[..2]>/`) is listed for a file named `<fp>__*`. The first
//!    root with a hit wins, so the primary store is preferred.
//!
//! A file found on disk is re-hashed before it is trusted. A store file whose
//! content no longer matches its name, or two store files claiming the same
//! fingerprint in one shard, mean the store is damaged; both stop the run.
//!
//! Probing never registers anything. The planner decides what to record via
//! [`DestinationIndex::insert`].

use crate::fingerprint::{self, FingerprintError};
use crate::paths;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Cannot read shard directory {}: {source}", path.display())]
    Shard {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
    #[error(
        "File {} has a non-matching fingerprint ({actual}, expected {expected})",
        path.display()
    )]
    FingerprintMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error(
        "Several files in {} claim fingerprint {fingerprint}: {}",
        shard.display(),
        list_paths(candidates)
    )]
    AmbiguousMatch {
        shard: PathBuf,
        fingerprint: String,
        candidates: Vec<PathBuf>,
    },
}

fn list_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A location in the destination store holding (or about to hold) some
/// content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationEntry {
    pub path: PathBuf,
    pub fingerprint: String,
}

/// Where a lookup found its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Already decided earlier in this run; carries the entry index.
    InMemory(usize),
    /// An existing store file, verified against the fingerprint.
    OnDisk(PathBuf),
    /// Nothing anywhere.
    Missing,
}

/// Destination entries of one planning run, indexed by fingerprint.
#[derive(Debug)]
pub struct DestinationIndex {
    roots: Vec<PathBuf>,
    entries: Vec<DestinationEntry>,
    by_fingerprint: HashMap<String, usize>,
}

impl DestinationIndex {
    /// Create an empty index over `roots` (searched in the given order).
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            entries: Vec::new(),
            by_fingerprint: HashMap::new(),
        }
    }

    pub fn entries(&self) -> &[DestinationEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<DestinationEntry> {
        self.entries
    }

    pub fn get(&self, index: usize) -> Option<&DestinationEntry> {
        self.entries.get(index)
    }

    /// Entry index for `fingerprint` among entries created this run.
    pub fn find_in_memory(&self, fingerprint: &str) -> Option<usize> {
        self.by_fingerprint.get(fingerprint).copied()
    }

    /// Resolve a fingerprint: memory first, then the on-disk stores.
    pub fn resolve(&self, fingerprint: &str) -> Result<Resolution, IndexError> {
        if let Some(i) = self.find_in_memory(fingerprint) {
            return Ok(Resolution::InMemory(i));
        }
        match self.find_on_disk(fingerprint)? {
            Some(path) => Ok(Resolution::OnDisk(path)),
            None => Ok(Resolution::Missing),
        }
    }

    /// Search every destination root's shard directory for `fingerprint`.
    ///
    /// The match is re-hashed and must agree with `fingerprint`.
    pub fn find_on_disk(&self, fingerprint: &str) -> Result<Option<PathBuf>, IndexError> {
        for root in &self.roots {
            if let Some(found) = search_shard(root, fingerprint)? {
                let actual = fingerprint::hash_file(&found)?;
                if actual != fingerprint {
                    return Err(IndexError::FingerprintMismatch {
                        path: found,
                        expected: fingerprint.to_string(),
                        actual,
                    });
                }
                tracing::debug!(path = %found.display(), "found existing store file");
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Record a destination for `fingerprint` and return its index.
    ///
    /// First writer wins: if the fingerprint is already present, the existing
    /// index is returned and `path` is ignored.
    pub fn insert(&mut self, fingerprint: &str, path: PathBuf) -> usize {
        if let Some(i) = self.find_in_memory(fingerprint) {
            return i;
        }
        let i = self.entries.len();
        self.entries.push(DestinationEntry {
            path,
            fingerprint: fingerprint.to_string(),
        });
        self.by_fingerprint.insert(fingerprint.to_string(), i);
        i
    }
}

/// The shard directory for `fingerprint` under `root`, cleaned so a root of
/// `.` yields `ab` rather than `./ab`.
pub fn shard_dir(root: &Path, fingerprint: &str) -> PathBuf {
    paths::clean(&root.join(fingerprint::shard_of(fingerprint)))
}

/// The canonical store path for content named `name`.
pub fn canonical_path(root: &Path, fingerprint: &str, name: &str) -> PathBuf {
    let file_name = format!("{}{}", fingerprint::stored_prefix(fingerprint), name);
    shard_dir(root, fingerprint).join(file_name)
}

/// List one shard directory for files named `<fingerprint>__*`.
///
/// A shard that does not exist (or is not a directory) simply has no match.
fn search_shard(root: &Path, fingerprint: &str) -> Result<Option<PathBuf>, IndexError> {
    let shard = shard_dir(root, fingerprint);
    let wrap = |source| IndexError::Shard {
        path: shard.clone(),
        source,
    };

    let listing = match fs::read_dir(&shard) {
        Ok(listing) => listing,
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
            ) =>
        {
            return Ok(None);
        }
        Err(err) => return Err(wrap(err)),
    };

    let prefix = fingerprint::stored_prefix(fingerprint);
    let mut candidates = Vec::new();
    for entry in listing {
        let entry = entry.map_err(wrap)?;
        if entry.file_type().map_err(wrap)?.is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            candidates.push(entry.path());
        }
    }

    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.pop()),
        _ => {
            candidates.sort();
            Err(IndexError::AmbiguousMatch {
                shard,
                fingerprint: fingerprint.to_string(),
                candidates,
            })
        }
    }
}
