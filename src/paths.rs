//! Lexical path helpers.
//!
//! Everything here works on path text only: nothing resolves symlinks or
//! touches the filesystem, so a relative path and its absolute spelling
//! compare equal without either having to exist.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path.
///
/// - `a/./b` → `a/b`
/// - `a/b/../c` → `a/c`
/// - `a/b/` → `a/b`
/// - `/../a` → `/a` (cannot climb above the root)
/// - `../a` → `../a` (leading parent references are kept on relative paths)
/// - `` → `.`
pub fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Absolute, cleaned form of `path`, anchored at the current directory.
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
    Ok(clean(&std::path::absolute(path)?))
}

/// Whether two paths name the same file.
///
/// Equal spellings always match; otherwise both are made absolute and
/// compared after cleaning. An error resolving either side counts as
/// "different".
pub fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (absolute(a), absolute(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Whether `path` lies strictly below `root` (component-wise, after both are
/// made absolute). `root` itself is not "under" `root`.
pub fn is_under(path: &Path, root: &Path) -> io::Result<bool> {
    let path = absolute(path)?;
    let root = absolute(root)?;
    Ok(path != root && path.starts_with(&root))
}
