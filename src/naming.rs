//! Destination filename sanitizing.
//!
//! Stored files are named `<fingerprint>__<name>`. The fingerprint already
//! makes the name unique, so `<name>` only has to carry enough readable
//! context for a human browsing the store: words from the original filename
//! and its extension, nothing that needs quoting, and a hard cap on length.
//!
//! ## Algorithm
//!
//! 1. Split the filename at its last dot into base and extension
//!    (`"notes (draft).txt"` → `"notes (draft)"` + `".txt"`).
//! 2. Collapse every run of characters outside `[A-Za-z0-9*~!@#$%^&]` in the
//!    base to a single `_` → `"notes_draft_"`.
//! 3. Split on `_` and keep, from each piece, the shortest prefix that ends in
//!    a run of three or more letters (the run itself taken whole). Pieces that
//!    never reach three letters in a row are dropped → `"notes_draft"`.
//! 4. Fit base and extension into [`MAX_NAME_LEN`] characters, favouring the
//!    extension but never cutting the base below [`MIN_BASE_LEN`].
//!
//! Examples:
//! - `"notes (draft).txt"` → `"notes_draft.txt"`
//! - `"IMG_0042.JPG"` → `"IMG.JPG"`
//! - `"2021-03-04 holiday.jpeg"` → `"holiday.jpeg"`
//! - `"42.png"` → `".png"`

use regex::Regex;

/// Upper bound on a sanitized name, extension included, in characters.
pub const MAX_NAME_LEN: usize = 32;

/// The base never shrinks below this many characters to make room for a long
/// extension (unless it was shorter to begin with).
pub const MIN_BASE_LEN: usize = 8;

/// Compiled patterns used by [`NamePatterns::sanitize`].
///
/// Built once at startup and shared by reference; nothing mutates them.
#[derive(Debug, Clone)]
pub struct NamePatterns {
    disallowed: Regex,
    wordish: Regex,
}

impl NamePatterns {
    pub fn new() -> Self {
        Self {
            disallowed: Regex::new(r"[^A-Za-z0-9*~!@#$%^&]+").expect("static pattern"),
            wordish: Regex::new(r"^.*?[A-Za-z]{3,}").expect("static pattern"),
        }
    }

    /// Derive the bounded, filesystem-safe display name for `file_name`.
    pub fn sanitize(&self, file_name: &str) -> String {
        let (base, ext) = split_extension(file_name);
        let collapsed = self.disallowed.replace_all(base, "_");

        let kept: Vec<&str> = collapsed
            .split('_')
            .filter_map(|piece| self.wordish.find(piece).map(|m| m.as_str()))
            .filter(|piece| !piece.is_empty())
            .collect();

        fit_to_budget(&kept.join("_"), ext)
    }
}

impl Default for NamePatterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a filename at its last dot.
///
/// - `"a.b.txt"` → `("a.b", ".txt")`
/// - `"README"` → `("README", "")`
/// - `".bashrc"` → `("", ".bashrc")`
/// - `"trailing."` → `("trailing", ".")`
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(dot) => file_name.split_at(dot),
        None => (file_name, ""),
    }
}

/// Fit `name + ext` into [`MAX_NAME_LEN`] characters.
///
/// ```text
/// a_really_long_name_with_no_extension              → name cut to 32
/// a_really_long_name_with.extension                 → name cut, ext kept
/// a_really_long_name_with.a_really_long_extension   → name 8, ext 24
/// a_name.with_a_really_long_extension_here          → name kept, ext cut
/// .a_really_long_extension_with_no_name_at_all      → ext cut to 32
/// ```
pub fn fit_to_budget(name: &str, ext: &str) -> String {
    let name_len = name.chars().count();
    let ext_len = ext.chars().count();

    if name_len + ext_len <= MAX_NAME_LEN {
        return format!("{name}{ext}");
    }
    if name_len == 0 {
        return take_chars(ext, MAX_NAME_LEN).to_string();
    }
    if ext_len == 0 {
        return take_chars(name, MAX_NAME_LEN).to_string();
    }

    let mut name_budget = MAX_NAME_LEN.saturating_sub(ext_len);
    let mut ext_budget = ext_len;
    if name_budget < MIN_BASE_LEN {
        name_budget = name_len.min(MIN_BASE_LEN);
        ext_budget = MAX_NAME_LEN - name_budget;
    }

    format!(
        "{}{}",
        take_chars(name, name_budget),
        take_chars(ext, ext_budget)
    )
}

/// The first `n` characters of `s` (all of `s` if it is shorter).
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
