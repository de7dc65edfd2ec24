//! Leveled debug logging for the pool
//!
//! Thread-safe, optionally-flushing stderr output. Every line is prefixed
//! with the elapsed time since the first log call, so interleavings between
//! dispatchers, workers and the destroyer can be read off directly.
//!
//! # Environment Variables
//!
//! - `SPINDLE_LOG_LEVEL=<level>` - 0=off, 1=error, 2=warn, 3=info, 4=debug, 5=trace (default: off)
//! - `SPINDLE_FLUSH=1` - Flush stderr after each line (useful when debugging hangs)

use core::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// Log levels, lowest to most verbose
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
    fn prefix(self) -> &'static str {
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

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Off as u8);
static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);
static INITIALIZED: AtomicBool = AtomicBool::new(false);
static START: OnceLock<Instant> = OnceLock::new();

/// Initialize logging from environment variables
///
/// Called automatically on first use; call explicitly for deterministic
/// initialization of the elapsed-time origin.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    START.get_or_init(Instant::now);

    if let Ok(val) = std::env::var("SPINDLE_LOG_LEVEL") {
        let level = match val.to_lowercase().as_str() {
            "off" | "0" => LogLevel::Off,
            "error" | "1" => LogLevel::Error,
            "warn" | "2" => LogLevel::Warn,
            "info" | "3" => LogLevel::Info,
            "debug" | "4" => LogLevel::Debug,
            "trace" | "5" => LogLevel::Trace,
            _ => LogLevel::Off,
        };
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }

    if let Ok(val) = std::env::var("SPINDLE_FLUSH") {
        let flush = matches!(val.as_str(), "1" | "true" | "yes" | "on");
        FLUSH_ENABLED.store(flush, Ordering::Relaxed);
    }
}

/// Override the log level programmatically
pub fn set_log_level(level: LogLevel) {
    init();
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

#[inline]
pub fn enabled(level: LogLevel) -> bool {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    level as u8 <= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Write one log line. Use via the `sp_*!` macros rather than directly.
pub fn log(level: LogLevel, args: fmt::Arguments<'_>) {
    if !enabled(level) {
        return;
    }
    let elapsed = START.get_or_init(Instant::now).elapsed();
    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    let _ = writeln!(
        out,
        "{:03}.{:06}:{} {}",
        elapsed.as_secs(),
        elapsed.subsec_micros(),
        level.prefix(),
        args
    );
    if FLUSH_ENABLED.load(Ordering::Relaxed) {
        let _ = out.flush();
    }
}

#[macro_export]
macro_rules! sp_error {
    ($($arg:tt)*) => {
        $crate::dlog::log($crate::dlog::LogLevel::Error, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! sp_warn {
    ($($arg:tt)*) => {
        $crate::dlog::log($crate::dlog::LogLevel::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! sp_info {
    ($($arg:tt)*) => {
        $crate::dlog::log($crate::dlog::LogLevel::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! sp_debug {
    ($($arg:tt)*) => {
        $crate::dlog::log($crate::dlog::LogLevel::Debug, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! sp_trace {
    ($($arg:tt)*) => {
        $crate::dlog::log($crate::dlog::LogLevel::Trace, format_args!($($arg)*))
    };
}
