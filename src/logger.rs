//! Logging utilities with colored output.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro gated by the global verbose flag
//! - `StatusLine` for single-line outcome display (✓ / ✗ / ⚠)
//!
//! # Example
//!
//! ```ignore
//! // Simple logging
//! log!("cdn"; "resolved {} via {}", path, origin);
//!
//! // Only printed with --verbose or `enable_detailed_logging`
//! debug!("probe"; "{} failed after {}ms", origin, elapsed);
//! ```

use crossterm::{
    execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use std::{
    io::{Write, stdout},
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose or `enable_detailed_logging`)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when verbose output is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "cdn" => prefix.bright_blue().bold().to_string(),
        "loader" => prefix.bright_green().bold().to_string(),
        "inject" => prefix.bright_magenta().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Status Line
// ============================================================================

/// Single-line outcome display used by the CLI reports.
///
/// # Example
///
/// ```ignore
/// StatusLine::success("/css/app.css → https://cdn.example/css/app.css");
/// StatusLine::warning("/img/logo.png fell back to local");
/// StatusLine::error("/js/app.js", "no source could be loaded");
/// ```
pub struct StatusLine;

impl StatusLine {
    /// Display success message (✓ prefix, green).
    pub fn success(message: &str) {
        Self::display(format!("{}", "✓".green()), message);
    }

    /// Display warning message (⚠ prefix, yellow).
    pub fn warning(message: &str) {
        Self::display(format!("{}", "⚠".yellow()), message);
    }

    /// Display error message (✗ prefix, red) with optional detail.
    pub fn error(summary: &str, detail: &str) {
        let message = if detail.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}: {}", detail.dimmed())
        };
        Self::display(format!("{}", "✗".red()), &message);
    }

    fn display(symbol: String, message: &str) {
        let mut stdout = stdout().lock();
        writeln!(stdout, "{symbol} {message}").ok();
        stdout.flush().ok();
    }
}

// ============================================================================
// Tests
// ============================================================================
