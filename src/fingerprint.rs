//! Content fingerprints.
//!
//! A fingerprint is the SHA-256 of a file's bytes, rendered as 64 lowercase
//! hex characters. It is the identity key of the destination store: two files
//! with the same fingerprint are treated as the same content, and the first
//! two characters name the shard directory the file lives in.
//!
//! Files are streamed through the hasher in a single buffered pass, so memory
//! use stays flat regardless of file size.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 64;

/// Length of the fingerprint prefix that names a shard directory.
pub const SHARD_PREFIX_LEN: usize = 2;

#[derive(Error, Debug)]
#[error("Cannot fingerprint {path}: {source}")]
pub struct FingerprintError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// SHA-256 of a file's contents, returned as a lowercase hex string.
pub fn hash_file(path: &Path) -> Result<String, FingerprintError> {
    let wrap = |source| FingerprintError {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(wrap)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(wrap)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// The shard directory name for a fingerprint (its first two hex characters).
pub fn shard_of(fingerprint: &str) -> &str {
    &fingerprint[..SHARD_PREFIX_LEN.min(fingerprint.len())]
}

/// The filename prefix every stored copy of this content starts with.
pub fn stored_prefix(fingerprint: &str) -> String {
    format!("{fingerprint}__")
}
