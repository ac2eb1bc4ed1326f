use std::sync::{Arc, OnceLock};

/// A log sink implemented by the host (e.g. forwarding to the framework's debug log).
///
/// Install it once with [`set_logger`]; every `log` record emitted by sitetrack is then
/// forwarded to it.
///
/// ```rust
/// use sitetrack::primitives::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Records one message at the given level.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing output.
    Trace,
    /// Debugging information.
    Debug,
    /// Normal progress, such as an upgrade step completing.
    Info,
    /// Something unexpected that the core recovered from.
    Warn,
    /// A failure, such as a record that could not be persisted.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// `log::Log` implementation forwarding to the host [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        is_forwarded(metadata.level(), metadata.target())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace output from dependencies is dropped; everything else is forwarded.
fn is_forwarded(level: log::Level, target: &str) -> bool {
    level <= log::Level::Info || target.starts_with("sitetrack")
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs the host logger.
///
/// Only the first call takes effect; later calls are ignored.
#[allow(clippy::module_name_repetitions)]
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    static LOGGER: ForeignLogger = ForeignLogger;
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    } else {
        eprintln!("Another log implementation is already installed");
    }
}

/// Logs a trace-level message, prefixed with the current [`LogContext`] if any
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::trace!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::trace!($($arg)*)
        }
    };
}

/// Logs a debug-level message, prefixed with the current [`LogContext`] if any
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::debug!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::debug!($($arg)*)
        }
    };
}

/// Logs an info-level message, prefixed with the current [`LogContext`] if any
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::info!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::info!($($arg)*)
        }
    };
}

/// Logs a warning, prefixed with the current [`LogContext`] if any
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::warn!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::warn!($($arg)*)
        }
    };
}

/// Logs an error, prefixed with the current [`LogContext`] if any
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::error!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::error!($($arg)*)
        }
    };
}

/// Scoped logging context.
pub mod context;
pub use context::{get_context, LogContext};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(LogLevel::from(log::Level::Error), LogLevel::Error);
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warn);
        assert_eq!(LogLevel::from(log::Level::Info), LogLevel::Info);
        assert_eq!(LogLevel::from(log::Level::Debug), LogLevel::Debug);
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Trace);
    }

    #[test]
    fn test_dependency_debug_output_is_dropped() {
        assert!(is_forwarded(log::Level::Debug, "sitetrack::upgrade"));
        assert!(is_forwarded(log::Level::Warn, "serde_json"));
        assert!(!is_forwarded(log::Level::Debug, "uniffi::ffi"));
        assert!(!is_forwarded(log::Level::Trace, "serde_json"));
    }
}
