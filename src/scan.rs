//! Source tree traversal.
//!
//! Walks a source root depth-first and yields every file that survives the
//! exclusion rules. Directory entries are visited in file-name order so the
//! same tree always produces the same sequence, whatever order the
//! filesystem hands entries back in.
//!
//! ## Exclusions
//!
//! An exclusion pattern is a path fragment such as `.git` or `cache/tmp`. It
//! matches a candidate when its segments appear contiguously, in order,
//! somewhere in the candidate's segments. Matching is per segment, never per
//! substring:
//!
//! ```text
//! pattern  a/b
//! x/a/b/c   excluded   (segments x, [a, b], c)
//! x/ab/c    kept       ("ab" is not "a")
//! ```
//!
//! A matching directory is pruned together with everything below it; a
//! matching file is skipped. The root itself is tested too.
//!
//! ## Errors
//!
//! Any I/O error while reading a directory ends the walk. A plan built from a
//! partial listing cannot be trusted, so nothing tries to skip past it.
//!
//! Names that are not valid UTF-8 are walked like any other. Only a path that
//! is actually selected for the plan has to pass [`ensure_utf8`], since it
//! ends up in shell text.

use crate::naming::split_extension;
use crate::paths;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Scan failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("Found no filename extensions in {}", .0.display())]
    NoExtensions(PathBuf),
}

/// A path fragment whose segments exclude any path containing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionPattern {
    segments: Vec<String>,
}

impl ExclusionPattern {
    /// Parse a pattern like `node_modules` or `photos/raw`.
    ///
    /// Returns `None` when the pattern has no segments at all (empty, or only
    /// separators), since such a pattern would match nothing meaningful.
    pub fn parse(pattern: &str) -> Option<Self> {
        let segments = segments_of(Path::new(pattern));
        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }

    /// Whether this pattern's segments occur contiguously inside `path`.
    pub fn matches(&self, path: &Path) -> bool {
        let candidate = segments_of(path);
        candidate
            .windows(self.segments.len())
            .any(|window| window == self.segments.as_slice())
    }
}

impl std::fmt::Display for ExclusionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Split a path into its named segments. Root and drive prefixes carry no
/// name and are dropped; `.` and `..` are kept as literal segments.
fn segments_of(path: &Path) -> Vec<String> {
    path.components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

fn is_excluded(exclusions: &[ExclusionPattern], path: &Path) -> bool {
    exclusions.iter().any(|pattern| pattern.matches(path))
}

/// Lazily walk `root`, yielding every non-directory entry not excluded.
///
/// Excluded directories are never descended into. The first I/O error is
/// yielded as an `Err`; callers are expected to stop there.
pub fn walk_files<'a>(
    root: &Path,
    exclusions: &'a [ExclusionPattern],
) -> impl Iterator<Item = Result<PathBuf, ScanError>> + 'a {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| !is_excluded(exclusions, entry.path()))
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => None,
            // Cleaned so a walk rooted at `.` yields `notes.txt`, not `./notes.txt`
            Ok(entry) => Some(Ok(paths::clean(entry.path()))),
            Err(err) => Some(Err(ScanError::Walk(err))),
        })
}

/// Accept `path` only if it is valid UTF-8.
///
/// Selected paths are rendered into shell text; a name that cannot be
/// represented faithfully stops the run instead of being mangled.
pub fn ensure_utf8(path: PathBuf) -> Result<PathBuf, ScanError> {
    if path.to_str().is_none() {
        return Err(ScanError::NonUtf8Path(path));
    }
    Ok(path)
}

/// The extension of a path's file name, dot included (`""` when none).
///
/// Follows last-dot semantics on the file name, so `.bashrc` has extension
/// `.bashrc` and `archive.tar.gz` has `.gz`. Invalid UTF-8 in the name is
/// replaced with U+FFFD.
pub fn extension_of(path: &Path) -> Cow<'_, str> {
    match path.file_name().map(|name| name.to_string_lossy()) {
        Some(Cow::Borrowed(name)) => Cow::Borrowed(split_extension(name).1),
        Some(Cow::Owned(name)) => Cow::Owned(split_extension(&name).1.to_string()),
        None => Cow::Borrowed(""),
    }
}

/// Whether `path` carries one of `extensions` (ASCII case-insensitive).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let ext = extension_of(path);
    extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
}

/// Collect the distinct, non-empty extensions found under `root`.
///
/// Extensions that are not valid UTF-8 are left out, as they could not be
/// selected with `-e`. An empty result is an error: there is nothing to offer
/// the user.
pub fn list_extensions(
    root: &Path,
    exclusions: &[ExclusionPattern],
) -> Result<BTreeSet<String>, ScanError> {
    let mut exts = BTreeSet::new();
    for path in walk_files(root, exclusions) {
        let path = path?;
        let ext = extension_of(&path);
        if !ext.is_empty() && !ext.contains(char::REPLACEMENT_CHARACTER) {
            exts.insert(ext.into_owned());
        }
    }
    if exts.is_empty() {
        return Err(ScanError::NoExtensions(root.to_path_buf()));
    }
    Ok(exts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{relative_to, write_file};
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn patterns(raw: &[&str]) -> Vec<ExclusionPattern> {
        raw.iter()
            .map(|p| ExclusionPattern::parse(p).unwrap())
            .collect()
    }

    fn rel_names(root: &Path, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect()
    }

    // =========================================================================
    // Exclusion patterns
    // =========================================================================

    #[test]
    fn pattern_matches_contiguous_segments() {
        let p = ExclusionPattern::parse("a/b").unwrap();
        assert!(p.matches(Path::new("x/a/b/c")));
        assert!(p.matches(Path::new("/x/a/b")));
    }

    #[test]
    fn pattern_is_segment_exact() {
        let p = ExclusionPattern::parse("a/b").unwrap();
        assert!(!p.matches(Path::new("x/ab/c")));
        assert!(!p.matches(Path::new("x/a/bb")));
        assert!(!p.matches(Path::new("x/a/c/b")));
    }

    #[test]
    fn pattern_shorter_candidate_does_not_match() {
        let p = ExclusionPattern::parse("a/b/c").unwrap();
        assert!(!p.matches(Path::new("a/b")));
    }

    #[test]
    fn pattern_ignores_empty_segments() {
        let p = ExclusionPattern::parse("/cache//tmp/").unwrap();
        assert!(p.matches(Path::new("proj/cache/tmp/x.txt")));
        assert_eq!(p.to_string(), "cache/tmp");
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert!(ExclusionPattern::parse("").is_none());
        assert!(ExclusionPattern::parse("///").is_none());
    }

    // =========================================================================
    // Walking
    // =========================================================================

    #[test]
    fn walk_is_depth_first_in_name_order() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "b.txt", b"b");
        write_file(tmp.path(), "a/z.txt", b"z");
        write_file(tmp.path(), "a/y.txt", b"y");
        write_file(tmp.path(), "c/x.txt", b"x");

        let files: Vec<PathBuf> = walk_files(tmp.path(), &[])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            rel_names(tmp.path(), &files),
            vec!["a/y.txt", "a/z.txt", "b.txt", "c/x.txt"]
        );
    }

    #[test]
    fn excluded_directory_is_pruned() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "keep/a.txt", b"a");
        write_file(tmp.path(), ".git/objects/x.txt", b"x");

        let exclusions = patterns(&[".git"]);
        let files: Vec<PathBuf> = walk_files(tmp.path(), &exclusions)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rel_names(tmp.path(), &files), vec!["keep/a.txt"]);
    }

    #[test]
    fn excluded_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.txt", b"a");
        write_file(tmp.path(), "secret.txt", b"s");

        let exclusions = patterns(&["secret.txt"]);
        let files: Vec<PathBuf> = walk_files(tmp.path(), &exclusions)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rel_names(tmp.path(), &files), vec!["a.txt"]);
    }

    #[test]
    fn multi_segment_exclusion_prunes_only_exact_run() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "x/a/b/c.txt", b"1");
        write_file(tmp.path(), "x/ab/c.txt", b"2");

        let exclusions = patterns(&["a/b"]);
        let files: Vec<PathBuf> = walk_files(tmp.path(), &exclusions)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rel_names(tmp.path(), &files), vec!["x/ab/c.txt"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let first = walk_files(&tmp.path().join("nope"), &[]).next();
        assert!(matches!(first, Some(Err(ScanError::Walk(_)))));
    }

    #[test]
    fn walk_yields_clean_relative_paths() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "notes.txt", b"n");
        let cwd = std::env::current_dir().unwrap();
        let relative = relative_to(tmp.path(), &cwd);

        let files: Vec<PathBuf> = walk_files(&Path::new(".").join(&relative).join("."), &[])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(files, vec![relative.join("notes.txt")]);
    }

    #[test]
    fn walk_root_spelled_with_dots_is_cleaned() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "sub/notes.txt", b"n");

        let root = tmp.path().join(".").join("sub").join("..");
        let files: Vec<PathBuf> = walk_files(&root, &[])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(files, vec![tmp.path().join("sub/notes.txt")]);
    }

    // =========================================================================
    // Non-UTF-8 names
    // =========================================================================

    #[cfg(target_os = "linux")]
    fn latin1_name(root: &Path, bytes: &[u8]) -> PathBuf {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        let path = root.join(OsStr::from_bytes(bytes));
        std::fs::write(&path, b"latin-1").unwrap();
        path
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_are_walked() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.txt", b"a");
        let odd = latin1_name(tmp.path(), b"caf\xe9.bin");

        let files: Vec<PathBuf> = walk_files(tmp.path(), &[])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(files, vec![tmp.path().join("a.txt"), odd.clone()]);
        assert!(has_extension(&odd, &[".bin".to_string()]));
        assert!(!has_extension(&odd, &[".txt".to_string()]));
        assert!(matches!(ensure_utf8(odd), Err(ScanError::NonUtf8Path(_))));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn list_extensions_tolerates_non_utf8_names() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.txt", b"a");
        latin1_name(tmp.path(), b"caf\xe9.bin");
        latin1_name(tmp.path(), b"data.\xff");

        let exts = list_extensions(tmp.path(), &[]).unwrap();
        assert_eq!(
            exts.into_iter().collect::<Vec<_>>(),
            vec![".bin".to_string(), ".txt".to_string()]
        );
    }

    #[test]
    fn utf8_paths_pass_through() {
        let path = PathBuf::from("photos/café.jpg");
        assert_eq!(ensure_utf8(path.clone()).unwrap(), path);
    }

    // =========================================================================
    // Extensions
    // =========================================================================

    #[test]
    fn extension_of_uses_last_dot() {
        assert_eq!(extension_of(Path::new("dir.d/archive.tar.gz")), ".gz");
        assert_eq!(extension_of(Path::new("dir/.bashrc")), ".bashrc");
        assert_eq!(extension_of(Path::new("dir.d/README")), "");
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        let exts = vec![".jpg".to_string()];
        assert!(has_extension(Path::new("a/IMG.JPG"), &exts));
        assert!(has_extension(Path::new("a/img.jpg"), &exts));
        assert!(!has_extension(Path::new("a/img.jpeg"), &exts));
    }

    #[test]
    fn extension_filter_over_walk() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.txt", b"a");
        write_file(tmp.path(), "b.md", b"b");
        write_file(tmp.path(), "sub/c.TXT", b"c");

        let exts = vec![".txt".to_string()];
        let files: Vec<PathBuf> = walk_files(tmp.path(), &[])
            .map(Result::unwrap)
            .filter(|p| has_extension(p, &exts))
            .collect();
        assert_eq!(rel_names(tmp.path(), &files), vec!["a.txt", "sub/c.TXT"]);
    }

    #[test]
    fn list_extensions_collects_distinct() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.txt", b"a");
        write_file(tmp.path(), "b.txt", b"b");
        write_file(tmp.path(), "c.md", b"c");
        write_file(tmp.path(), "noext", b"n");
        write_file(tmp.path(), "skip/d.rs", b"d");

        let exts = list_extensions(tmp.path(), &patterns(&["skip"])).unwrap();
        assert_eq!(
            exts.into_iter().collect::<Vec<_>>(),
            vec![".md".to_string(), ".txt".to_string()]
        );
    }

    #[test]
    fn list_extensions_empty_is_error() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "Makefile", b"all:");

        let result = list_extensions(tmp.path(), &[]);
        assert!(matches!(result, Err(ScanError::NoExtensions(_))));
    }

    proptest! {
        #[test]
        fn pattern_matches_when_embedded(
            prefix in proptest::collection::vec("[a-z]{1,4}", 0..3),
            pattern in proptest::collection::vec("[a-z]{1,4}", 1..3),
            suffix in proptest::collection::vec("[a-z]{1,4}", 0..3),
        ) {
            let p = ExclusionPattern::parse(&pattern.join("/")).unwrap();
            let candidate = [prefix, pattern.clone(), suffix].concat().join("/");
            prop_assert!(p.matches(Path::new(&candidate)));
        }

        #[test]
        fn glued_segments_never_match(a in "[a-z]{1,4}", b in "[a-z]{1,4}") {
            let p = ExclusionPattern::parse(&format!("{a}/{b}")).unwrap();
            let candidate = format!("x/{a}{b}/y");
            prop_assert!(!p.matches(Path::new(&candidate)));
        }
    }
}
