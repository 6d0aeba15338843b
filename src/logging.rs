//! Diagnostic logging for the command-line tool.
//!
//! Stdout is reserved for the plan itself, so all diagnostics go to stderr.
//! The filter comes from `SHARD_MERGE_LOG` (standard `EnvFilter` syntax) and
//! falls back to a level chosen by the `-v` count.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding an explicit filter directive.
pub const LOG_ENV: &str = "SHARD_MERGE_LOG";

/// Default filter directive for a given `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber. Safe to call once per process.
pub fn init_logger(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}
