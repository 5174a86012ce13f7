//! Logging macros
//!
//! Thin wrappers over [`Logger::log`](crate::Logger::log) with `format!`
//! style interpolation and automatic call-site location capture.
//!
//! # Examples
//!
//! ```
//! use logtree::{get_logger, info, warning};
//!
//! let logger = get_logger("app");
//! info!(logger, "server started");
//!
//! let port = 8080;
//! warning!(logger, "port {} already in use, picking another", port);
//! ```

/// Log at an explicit level with `format!` interpolation.
///
/// # Examples
///
/// ```
/// use logtree::{get_logger, log, Level};
///
/// let logger = get_logger("app");
/// log!(logger, Level::Error, "request failed with status {}", 502);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        if $logger.enabled_for($level) {
            $logger.log_located($level, format!($($arg)+), file!(), line!(), module_path!())
        }
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Critical, $($arg)+)
    };
}
