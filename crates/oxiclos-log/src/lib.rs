//! A small, zero-dependency logging crate for the `OxiCLOS` runtime.
//!
//! Messages are tagged with the module path of the call site and written to
//! stderr. The minimum level and an optional module-prefix filter are held in
//! a process-wide logger, so the object runtime can log class finalization
//! and dispatch decisions without threading a logger through every call.
//!
//! # Example
//!
//! ```
//! use oxiclos_log::{debug, info, Level};
//!
//! oxiclos_log::set_level(Level::Debug);
//!
//! info!("runtime ready: {} classes", 24);
//! debug!("cpl = {:?}", ["<point>", "<object>", "<top>"]);
//! ```

use std::fmt::Arguments;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{OnceLock, RwLock};

/// Severity of a log record.
///
/// Lower numeric values are more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Failures the runtime cannot hide from the caller.
    Error = 0,
    /// Suspicious but recoverable situations.
    Warn = 1,
    /// Lifecycle events (runtime bootstrap, configuration).
    Info = 2,
    /// Metaobject changes (class finalization, method replacement).
    Debug = 3,
    /// Per-call detail (dispatch decisions).
    Trace = 4,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    /// Returns the upper-case name of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }

    /// Parses a level name, ignoring case.
    ///
    /// # Example
    ///
    /// ```
    /// use oxiclos_log::Level;
    ///
    /// assert_eq!(Level::from_str("debug"), Ok(Level::Debug));
    /// assert!(Level::from_str("loud").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a message naming the input when it is not a level name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Level::Error),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "TRACE" => Ok(Level::Trace),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

/// Process-wide logger state.
///
/// The level is atomic; the module filter is behind a `RwLock` because it is
/// written once at startup and read on every enabled record.
pub struct Logger {
    level: AtomicU8,
    filter: RwLock<Option<String>>,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
            filter: RwLock::new(None),
        }
    }

    /// Sets the minimum level that will be written.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    /// Returns the current minimum level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Checks whether records at `level` pass the level threshold.
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }

    /// Restricts output to modules whose path starts with `prefix`.
    ///
    /// Passing `None` removes the restriction.
    pub fn set_filter(&self, prefix: Option<&str>) {
        if let Ok(mut filter) = self.filter.write() {
            *filter = prefix.map(str::to_owned);
        }
    }

    /// Checks whether `target` passes the module filter.
    pub fn accepts(&self, target: &str) -> bool {
        match self.filter.read() {
            Ok(filter) => filter
                .as_deref()
                .is_none_or(|prefix| target.starts_with(prefix)),
            Err(_) => true,
        }
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Returns the global logger, creating it at `Level::Warn` on first use.
pub fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(Level::Warn))
}

/// Sets the minimum level of the global logger.
pub fn set_level(level: Level) {
    get_logger().set_level(level);
}

/// Sets the minimum level of the global logger from a level name.
///
/// # Errors
///
/// Returns an error if `s` is not a level name.
pub fn set_level_from_str(s: &str) -> Result<(), String> {
    set_level(Level::from_str(s)?);
    Ok(())
}

/// Restricts the global logger to one module subtree.
pub fn set_filter(prefix: Option<&str>) {
    get_logger().set_filter(prefix);
}

/// Formats one record. Separated from the writer so it can be tested.
#[doc(hidden)]
pub fn __format_record(level: Level, target: &str, args: Arguments) -> String {
    const RESET: &str = "\x1b[0m";
    format!(
        "{}[{}]{RESET} {target}: {args}",
        level.color_code(),
        level.as_str()
    )
}

#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments) {
    let logger = get_logger();
    if !logger.enabled(level) || !logger.accepts(target) {
        return;
    }
    let line = __format_record(level, target, args);
    let _ = writeln!(std::io::stderr().lock(), "{line}");
}

/// Logs a message at an explicit level.
///
/// ```
/// use oxiclos_log::{log, Level};
///
/// log!(level: Level::Info, "allocated {} instances", 3);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {{
        if $crate::get_logger().enabled($level) {
            $crate::__log_with_target($level, module_path!(), format_args!($($arg)*));
        }
    }};
}

/// Logs at `Level::Error`.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Error, $($arg)*) };
}

/// Logs at `Level::Warn`.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Warn, $($arg)*) };
}

/// Logs at `Level::Info`.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Info, $($arg)*) };
}

/// Logs at `Level::Debug`.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Debug, $($arg)*) };
}

/// Logs at `Level::Trace`.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Trace, $($arg)*) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Info < Level::Debug);
        assert!(Level::Debug < Level::Trace);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!(Level::from_str("error"), Ok(Level::Error));
        assert_eq!(Level::from_str(" Warning "), Ok(Level::Warn));
        assert_eq!(Level::from_str("TRACE"), Ok(Level::Trace));
        assert!(Level::from_str("verbose").is_err());
    }

    #[test]
    fn test_logger_level_filtering() {
        let logger = Logger::new(Level::Info);
        assert!(logger.enabled(Level::Warn));
        assert!(!logger.enabled(Level::Debug));

        logger.set_level(Level::Trace);
        assert!(logger.enabled(Level::Trace));
        assert_eq!(logger.level(), Level::Trace);
    }

    #[test]
    fn test_module_filter() {
        let logger = Logger::new(Level::Info);
        assert!(logger.accepts("oxiclos::runtime::dispatch"));

        logger.set_filter(Some("oxiclos::runtime::class"));
        assert!(logger.accepts("oxiclos::runtime::class"));
        assert!(!logger.accepts("oxiclos::runtime::dispatch"));

        logger.set_filter(None);
        assert!(logger.accepts("anything"));
    }

    #[test]
    fn test_format_record() {
        let line = __format_record(Level::Debug, "oxiclos::cpl", format_args!("merged {}", 3));
        assert!(line.contains("[DEBUG]"));
        assert!(line.ends_with("oxiclos::cpl: merged 3"));
    }

    #[test]
    fn test_macros_compile_at_every_level() {
        error!("error {}", 1);
        warn!("warn {}", 2);
        info!("info {}", 3);
        debug!("debug {}", 4);
        trace!("trace {}", 5);
    }
}
