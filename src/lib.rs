//! # logtree
//!
//! A hierarchical logging framework: named loggers arranged in a
//! dot-separated tree, records flowing through per-logger and per-handler
//! filter chains into a family of handlers (streams, files with rotation,
//! sockets, syslog, mail, HTTP), with an optional queue to move slow sinks
//! off the calling thread.
//!
//! ## Quick start
//!
//! ```
//! use logtree::{get_logger, info, Level};
//! use logtree::handlers::StreamHandler;
//! use std::sync::Arc;
//!
//! let root = logtree::root();
//! root.add_handler(Arc::new(StreamHandler::stderr()));
//!
//! let logger = get_logger("app.startup");
//! logger.set_level(Some(Level::Info));
//! info!(logger, "listening on port {}", 8080);
//! ```
//!
//! ## Hierarchy
//!
//! `get_logger("a.b.c")` is a child of `"a.b"`, which is a child of `"a"`,
//! which is a child of the root. A logger without an explicit level inherits
//! the nearest ancestor's, and records propagate to ancestor handlers until
//! a logger with `propagate` off is reached.

pub mod core;
pub mod handlers;
pub mod macros;

pub mod prelude {
    pub use crate::core::{
        get_logger, root, set_error_hook, FieldValue, Fields, Filter, Formatter, Handler, Level,
        LogError, LogRecord, Logger, Result, TemplateStyle,
    };
    pub use crate::handlers::{FileHandler, StreamHandler};
}

pub use crate::core::{
    get_logger, manager, root, report_error, reset_error_hook, set_error_hook, Clock, FieldValue,
    Fields, Filter, FilterChain, Formatter, Handler, HandlerCore, Level, LogError, LogRecord,
    Logger, ManualClock, Manager, NameFilter, Result, SystemClock, TemplateStyle, RESERVED_FIELDS,
};
