//! Shared test utilities for the shard-merge test suite.
//!
//! Builds small source trees and pre-populated stores inside temp
//! directories.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let store = TempDir::new().unwrap();
//! let stored = store_file(store.path(), b"bytes", "photo.jpg");
//! assert!(stored.ends_with(format!("{}__photo.jpg", sha256_hex(b"bytes"))));
//! ```

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::index::canonical_path;
use crate::paths;

/// Write `bytes` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: impl AsRef<Path>, bytes: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Place `bytes` in `store` at its canonical location under `name`.
pub fn store_file(store: &Path, bytes: &[u8], name: &str) -> PathBuf {
    let path = canonical_path(store, &sha256_hex(bytes), name);
    let rel = path.strip_prefix(store).unwrap().to_path_buf();
    write_file(store, rel, bytes)
}

/// `target` spelled relative to `base` with `..` hops.
pub fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target = paths::absolute(target).unwrap();
    let base = paths::absolute(base).unwrap();
    let common = target
        .components()
        .zip(base.components())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = PathBuf::new();
    for _ in base.components().skip(common) {
        out.push("..");
    }
    for c in target.components().skip(common) {
        out.push(c);
    }
    out
}
