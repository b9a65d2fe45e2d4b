//! Core types - pure abstractions shared across the codebase.

mod url;

pub use url::{AssetPath, is_external, is_root_relative, join_url};

/// Origin identifier of the caller's own (self-hosted) origin.
///
/// When it is the primary origin, resolution never probes. Inside a probe
/// order it is skipped, and answers only after every pass failed.
pub const LOCAL_ORIGIN: &str = "local";

/// Current time as Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Format a count with its noun: `plural_count(1, "file")` -> `"1 file"`.
pub fn plural_count(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, if count == 1 { "" } else { "s" })
}
