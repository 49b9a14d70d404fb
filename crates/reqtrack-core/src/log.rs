//! Kernel-style leveled logging for reqtrack
//!
//! Thread-safe line output with an optional `[seconds] [thread]` prefix and a
//! pluggable sink. Stderr is used until a sink is installed.
//!
//! # Environment Variables
//!
//! - `REQTRACK_FLUSH_EPRINT=1` - Flush stderr after each line
//! - `REQTRACK_LOG_LEVEL=<level>` - 0=off, 1=error, 2=warn, 3=info, 4=debug, 5=trace
//! - `REQTRACK_LOG_TIME=1` - Prefix lines with uptime and thread name
//!
//! # Usage
//!
//! ```ignore
//! use reqtrack_core::{hinfo, hwarn, hdebug};
//!
//! hinfo!("worker started");
//! hwarn!("request {} removed while leased", key);
//! hdebug!("cycle took {:?}", elapsed);
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Instant;

/// Log levels (matches common conventions)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Parse a level name or digit, as accepted by `REQTRACK_LOG_LEVEL`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "1" => Some(LogLevel::Error),
            "warn" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Trace => "[TRACE]",
        }
    }
}

/// Destination for formatted log lines
///
/// `level` is `LogLevel::Off` for unleveled `hprintln!` output.
pub trait LogSink: Send + Sync {
    fn write_line(&self, level: LogLevel, line: &str);
}

// Global configuration (initialized once)
static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);
static TIME_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static INITIALIZED: AtomicBool = AtomicBool::new(false);
static SINK: RwLock<Option<Arc<dyn LogSink>>> = RwLock::new(None);
static START: OnceLock<Instant> = OnceLock::new();

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Initialize logging from environment variables
///
/// Called automatically on first log, but can be called explicitly for
/// deterministic initialization.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    START.get_or_init(Instant::now);

    if let Some(flush) = env_flag("REQTRACK_FLUSH_EPRINT") {
        FLUSH_ENABLED.store(flush, Ordering::Relaxed);
    }
    if let Some(time) = env_flag("REQTRACK_LOG_TIME") {
        TIME_ENABLED.store(time, Ordering::Relaxed);
    }
    if let Ok(val) = std::env::var("REQTRACK_LOG_LEVEL") {
        let level = LogLevel::parse(&val).unwrap_or(LogLevel::Info);
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }
}

#[inline]
fn ensure_init() {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
}

/// Check if flush is enabled
#[inline]
pub fn flush_enabled() -> bool {
    ensure_init();
    FLUSH_ENABLED.load(Ordering::Relaxed)
}

/// Get current log level
#[inline]
pub fn log_level() -> LogLevel {
    ensure_init();
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set log level programmatically
pub fn set_log_level(level: LogLevel) {
    ensure_init();
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Set flush mode programmatically
pub fn set_flush_enabled(enabled: bool) {
    ensure_init();
    FLUSH_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Enable the `[uptime] [thread]` line prefix
pub fn set_time_enabled(enabled: bool) {
    ensure_init();
    TIME_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Route all output to `sink` instead of stderr
pub fn set_sink(sink: Arc<dyn LogSink>) {
    *SINK.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
}

/// Restore stderr output
pub fn clear_sink() {
    *SINK.write().unwrap_or_else(PoisonError::into_inner) = None;
}

/// Check if a log level is enabled
#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level as u8 <= log_level() as u8
}

fn format_line(level: LogLevel, args: std::fmt::Arguments<'_>) -> String {
    let mut line = String::new();
    if level != LogLevel::Off {
        line.push_str(level.prefix());
        line.push(' ');
    }
    if TIME_ENABLED.load(Ordering::Relaxed) {
        let uptime = START.get_or_init(Instant::now).elapsed();
        let current = std::thread::current();
        let thread = current.name().unwrap_or("?");
        line.push_str(&format!("[{:>5}.{:06}] [{}] ", uptime.as_secs(), uptime.subsec_micros(), thread));
    }
    line.push_str(&args.to_string());
    line
}

fn emit(level: LogLevel, line: &str) {
    let sink = SINK
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(Arc::clone);

    match sink {
        Some(sink) => sink.write_line(level, line),
        None => {
            let stderr = std::io::stderr();
            let mut handle = stderr.lock(); // Mutex lock for atomic output
            let _ = handle.write_all(line.as_bytes());
            let _ = handle.write_all(b"\n");
            if flush_enabled() {
                let _ = handle.flush();
            }
        }
    }
}

/// Internal: unleveled line
#[doc(hidden)]
pub fn _hprintln_impl(args: std::fmt::Arguments<'_>) {
    ensure_init();
    emit(LogLevel::Off, &format_line(LogLevel::Off, args));
}

/// Internal: leveled line
#[doc(hidden)]
pub fn _hlog_impl(level: LogLevel, args: std::fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    emit(level, &format_line(level, args));
}

// ============================================================================
// Public Macros
// ============================================================================

/// Print a line regardless of log level
#[macro_export]
macro_rules! hprintln {
    () => {{
        $crate::log::_hprintln_impl(format_args!(""));
    }};
    ($($arg:tt)*) => {{
        $crate::log::_hprintln_impl(format_args!($($arg)*));
    }};
}

/// Error level log (always shown unless logging is off)
#[macro_export]
macro_rules! herror {
    ($($arg:tt)*) => {{
        $crate::log::_hlog_impl($crate::log::LogLevel::Error, format_args!($($arg)*));
    }};
}

/// Warning level log
#[macro_export]
macro_rules! hwarn {
    ($($arg:tt)*) => {{
        $crate::log::_hlog_impl($crate::log::LogLevel::Warn, format_args!($($arg)*));
    }};
}

/// Info level log
#[macro_export]
macro_rules! hinfo {
    ($($arg:tt)*) => {{
        $crate::log::_hlog_impl($crate::log::LogLevel::Info, format_args!($($arg)*));
    }};
}

/// Debug level log
#[macro_export]
macro_rules! hdebug {
    ($($arg:tt)*) => {{
        $crate::log::_hlog_impl($crate::log::LogLevel::Debug, format_args!($($arg)*));
    }};
}

/// Trace level log (most verbose)
#[macro_export]
macro_rules! htrace {
    ($($arg:tt)*) => {{
        $crate::log::_hlog_impl($crate::log::LogLevel::Trace, format_args!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse(" WARN "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("0"), Some(LogLevel::Off));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(LogLevel::from_u8(99), LogLevel::Trace);
    }

    #[test]
    fn test_format_line_prefix() {
        let line = format_line(LogLevel::Warn, format_args!("x={}", 7));
        assert!(line.starts_with("[WARN]"));
        assert!(line.ends_with("x=7"));

        let raw = format_line(LogLevel::Off, format_args!("plain"));
        assert!(raw.ends_with("plain"));
        assert!(!raw.contains("[INFO]"));
    }

    #[test]
    fn test_macros_compile() {
        // Output goes to stderr (or whatever sink another test installed)
        hprintln!();
        hprintln!("test {}", 42);
        herror!("error {}", "msg");
        hwarn!("warn");
        hinfo!("info");
        hdebug!("debug");
        htrace!("trace");
    }
}
