//! # shard-merge
//!
//! Plans the merge of a source file tree into one or more content-addressed
//! destination stores. For every matching source file it decides whether the
//! content is already stored (keep), has to be moved in under its canonical
//! name (move), or duplicates something already stored (remove). The result
//! is printed as `mkdir`/`mv`/`rm` shell directives; this crate never changes
//! anything on disk itself.
//!
//! # Store Layout
//!
//! A destination store keeps every file under its SHA-256 fingerprint,
//! sharded by the first two hex characters:
//!
//! ```text
//! store/
//! ├── 3f/
//! │   └── 3fc4ccfe…a5__holiday.jpg
//! └── 76/
//!     └── 7692c3ad…4c__notes_draft.txt
//! ```
//!
//! The part after `__` is a short, shell-safe name derived from the original
//! filename (see [`naming`]), or the original name verbatim when
//! `preserve_file_names` is set.
//!
//! # Pipeline
//!
//! ```text
//! scan  →  fingerprint + naming  →  plan (↔ index)  →  output
//! ```
//!
//! Data moves strictly left to right. Each stage is synchronous and handles
//! one file at a time; the destination index is the only state that grows
//! during a run.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the source root with segment-wise exclusions and extension filters |
//! | [`fingerprint`] | Streams a file through SHA-256 |
//! | [`naming`] | Derives the bounded, sanitized store name |
//! | [`index`] | Fingerprint → destination lookup, in memory then on disk |
//! | [`plan`] | The decision engine: keep, move, or remove |
//! | [`output`] | Orders and renders the plan as shell-quoted directives |
//! | [`config`] | Validated merge configuration and optional TOML file layer |
//! | [`paths`] | Lexical path cleaning and same-file comparison |
//! | [`logging`] | `tracing` subscriber setup for the binary |
//!
//! # Design Decisions
//!
//! ## Plan, Don't Execute
//!
//! The output is a shell script, not a side effect. It can be reviewed,
//! edited, diffed, or piped into `sh`. Nothing guarantees the store is
//! unchanged between planning and running the script.
//!
//! ## Stop on Doubt
//!
//! Every error is fatal. A file that cannot be read, a directory that cannot
//! be listed, or a store file whose content no longer matches its name all
//! end the run without output. A plan built on incomplete information could
//! delete the last copy of something.

pub mod config;
pub mod fingerprint;
pub mod index;
pub mod logging;
pub mod naming;
pub mod output;
pub mod paths;
pub mod plan;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
