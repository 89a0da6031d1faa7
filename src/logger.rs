//! Structured logging with visual formatting.
//!
//! The macros below produce the box-drawing output style used across the
//! binary: `log_version!` opens the run, `log_block_start!` begins a new
//! conceptual block, `log_decorated!`/`log_indented!` continue it, and
//! `log_end!` closes the run. The leveled macros (`log_error!` through
//! `log_debug!`) carry a `[LEVEL]` prefix and are filtered by the runtime
//! minimum severity.
//!
//! Hardware components never call the macros directly. Each receives a
//! [`LogSink`] at construction and reports through it; [`MacroSink`] is the
//! production sink that routes back into the macros, and tests substitute a
//! capturing sink to assert on emitted messages.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Info as u8);

/// Log severity, ordered from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl Severity {
    /// Parse a CLI level name. Accepts the four level names, case-insensitive.
    pub fn parse(name: &str) -> Option<Severity> {
        match name.to_ascii_lowercase().as_str() {
            "error" => Some(Severity::Error),
            "warning" | "warn" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            "debug" => Some(Severity::Debug),
            _ => None,
        }
    }
}

/// Main logging interface: runtime enable/disable and severity filtering.
pub struct Log;

impl Log {
    /// Enable or disable all log output. Useful for quiet operation in tests.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Set the minimum severity that leveled macros will emit.
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::SeqCst);
    }

    /// Whether a message at `severity` passes the enable and level filters.
    pub fn severity_enabled(severity: Severity) -> bool {
        Self::is_enabled() && severity as u8 <= MIN_SEVERITY.load(Ordering::SeqCst)
    }
}

// Routes formatted lines to stdout (needed by the macros).
pub fn write_output(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

/// Leveled log sink handed to hardware components at construction.
///
/// The display writer, sensor reader and light sensor report through this
/// capability instead of reaching for the global macros, so tests can capture
/// and assert on their output.
pub trait LogSink: Send + Sync {
    fn log(&self, severity: Severity, message: &str);
}

/// Production sink: forwards to the leveled logging macros.
pub struct MacroSink;

impl LogSink for MacroSink {
    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => crate::log_error!("{message}"),
            Severity::Warning => crate::log_warning!("{message}"),
            Severity::Info => crate::log_info!("{message}"),
            Severity::Debug => crate::log_debug!("{message}"),
        }
    }
}

// # Logging Macros

/// Log a decorated message, typically as part of an existing block.
#[macro_export]
macro_rules! log_decorated {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let message = format!($fmt $($arg)*);
            $crate::logger::write_output(&format!("┣ {message}\n"));
        }
    }};
}

/// Log an indented message for sub-items or details within a block.
#[macro_export]
macro_rules! log_indented {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let message = format!($fmt $($arg)*);
            $crate::logger::write_output(&format!("┃   {message}\n"));
        }
    }};
}

/// Log a visual pipe separator for vertical spacing.
#[macro_export]
macro_rules! log_pipe {
    () => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            $crate::logger::write_output("┃\n");
        }
    }};
}

/// Log a block start message, initiating a new conceptual block.
#[macro_export]
macro_rules! log_block_start {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let message = format!($fmt $($arg)*);
            $crate::logger::write_output(&format!("┃\n┣ {message}\n"));
        }
    }};
}

/// Log the application version header.
#[macro_export]
macro_rules! log_version {
    () => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let version = env!("CARGO_PKG_VERSION");
            $crate::logger::write_output(&format!("┏ temphum-clock v{version} ━━╸\n"));
        }
    }};
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            $crate::logger::write_output("╹\n");
        }
    }};
}

/// Log an error message with pipe prefix and red-colored level tag.
#[macro_export]
macro_rules! log_error {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::{Log, Severity};
        if Log::severity_enabled(Severity::Error) {
            let message = format!($fmt $($arg)*);
            $crate::logger::write_output(&format!("┣[\x1b[31mERROR\x1b[0m] {message}\n"));
        }
    }};
}

/// Log a warning message with pipe prefix and yellow-colored level tag.
#[macro_export]
macro_rules! log_warning {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::{Log, Severity};
        if Log::severity_enabled(Severity::Warning) {
            let message = format!($fmt $($arg)*);
            $crate::logger::write_output(&format!("┣[\x1b[33mWARNING\x1b[0m] {message}\n"));
        }
    }};
}

/// Log an informational message with pipe prefix and green-colored level tag.
#[macro_export]
macro_rules! log_info {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::{Log, Severity};
        if Log::severity_enabled(Severity::Info) {
            let message = format!($fmt $($arg)*);
            $crate::logger::write_output(&format!("┣[\x1b[32mINFO\x1b[0m] {message}\n"));
        }
    }};
}

/// Log a debug message with pipe prefix and green-colored level tag.
#[macro_export]
macro_rules! log_debug {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::{Log, Severity};
        if Log::severity_enabled(Severity::Debug) {
            let message = format!($fmt $($arg)*);
            $crate::logger::write_output(&format!("┣[\x1b[32mDEBUG\x1b[0m] {message}\n"));
        }
    }};
}
