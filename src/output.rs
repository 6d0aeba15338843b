//! CLI output formatting.
//!
//! # Plan protocol
//!
//! A plan is printed as shell text, one directive per line, in this order:
//!
//! ```text
//! mkdir '<shard dir>'
//! mv '<source>'	'<destination>'
//! rm '<source>'	# '<destination>'
//! ```
//!
//! `mkdir` lines come first so every `mv` finds its directory. Sources are
//! listed keep → move → remove, scan order within each group; keeps produce
//! no line at all. On an `rm` line the destination is only a comment: it
//! names the surviving copy that makes the removed file redundant.
//!
//! Every path is single-quoted. An embedded `'` closes the quote, adds a
//! double-quoted `'`, and reopens: `it's` → `'it'"'"'s'`. The output can be
//! piped straight into `sh`.
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::plan::{Action, Plan};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;

/// Number of extensions per line in the `exts` listing.
const EXTENSIONS_PER_LINE: usize = 8;

/// Quote `s` for POSIX shells.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r#"'"'"'"#))
}

fn quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

// ============================================================================
// Plan
// ============================================================================

/// Render a plan as shell directives.
pub fn format_plan(plan: &Plan) -> Vec<String> {
    let mut lines: Vec<String> = plan
        .mkdirs
        .iter()
        .map(|dir| format!("mkdir {}", quote_path(dir)))
        .collect();

    for source in plan.ordered() {
        let destination = &plan.destination_of(source).path;
        match source.action {
            Action::Keep => {}
            Action::Move => lines.push(format!(
                "mv {}\t{}",
                quote_path(&source.path),
                quote_path(destination)
            )),
            Action::Remove => lines.push(format!(
                "rm {}\t# {}",
                quote_path(&source.path),
                quote_path(destination)
            )),
        }
    }
    lines
}

/// Write a rendered plan to `out`, one directive per line.
pub fn write_plan(plan: &Plan, out: &mut impl Write) -> io::Result<()> {
    for line in format_plan(plan) {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

/// Print a rendered plan to stdout.
pub fn print_plan(plan: &Plan) -> io::Result<()> {
    write_plan(plan, &mut io::stdout().lock())
}

// ============================================================================
// Extension discovery
// ============================================================================

/// Format the `exts` listing.
///
/// ```text
/// Found the following extensions (photos):
///
/// .jpg,.png,.txt,
///
/// Select one or more to merge (e.g.: -e ".txt")
/// ```
pub fn format_extensions(root: &Path, extensions: &BTreeSet<String>) -> Vec<String> {
    let mut lines = vec![
        format!("Found the following extensions ({}):", root.display()),
        String::new(),
    ];

    let all: Vec<&str> = extensions.iter().map(String::as_str).collect();
    for chunk in all.chunks(EXTENSIONS_PER_LINE) {
        lines.push(chunk.iter().map(|e| format!("{e},")).collect());
    }

    if let Some(example) = all.last() {
        lines.push(String::new());
        lines.push(format!(
            "Select one or more to merge (e.g.: -e \"{example}\")"
        ));
    }
    lines
}

/// Print the `exts` listing to stdout.
pub fn print_extensions(root: &Path, extensions: &BTreeSet<String>) {
    for line in format_extensions(root, extensions) {
        println!("{}", line);
    }
}
