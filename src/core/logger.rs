//! Named logger nodes and record dispatch

use super::fields::{FieldValue, Fields};
use super::filter::{Filter, FilterChain};
use super::handler::{report_error, Handler};
use super::level::Level;
use super::manager::manager;
use super::record::LogRecord;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A named node in the logger hierarchy.
///
/// A logger owns its level (or inherits one), an ordered list of attached
/// handlers, a filter chain, and a propagate flag. Loggers are created
/// through [`get_logger`](crate::get_logger) and live in the process-wide
/// registry; the parent link is a name resolved through the registry, not an
/// ownership edge.
///
/// # Examples
///
/// ```
/// use logtree::{get_logger, Level};
///
/// let logger = get_logger("net.client");
/// logger.set_level(Some(Level::Debug));
/// logger.info("connection established");
/// ```
pub struct Logger {
    name: String,
    level: RwLock<Option<Level>>,
    handlers: RwLock<Vec<Arc<dyn Handler>>>,
    filters: RwLock<FilterChain>,
    propagate: AtomicBool,
    disabled: AtomicBool,
    /// `None` only for root; `Some("")` means the parent is root.
    parent: RwLock<Option<String>>,
    /// Packed effective-level cache: `(generation << 8) | level_value`.
    /// Zero means empty; compared lazily against the manager's generation.
    cached_effective: AtomicU64,
}

impl Logger {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: RwLock::new(None),
            handlers: RwLock::new(Vec::new()),
            filters: RwLock::new(FilterChain::new()),
            propagate: AtomicBool::new(true),
            disabled: AtomicBool::new(false),
            parent: RwLock::new(Some(String::new())),
            cached_effective: AtomicU64::new(0),
        }
    }

    pub(crate) fn new_root(level: Level) -> Self {
        Self {
            name: String::new(),
            level: RwLock::new(Some(level)),
            handlers: RwLock::new(Vec::new()),
            filters: RwLock::new(FilterChain::new()),
            propagate: AtomicBool::new(true),
            disabled: AtomicBool::new(false),
            parent: RwLock::new(None),
            cached_effective: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// This logger's own level; `None` means inherit from the ancestors.
    pub fn level(&self) -> Option<Level> {
        *self.level.read()
    }

    /// Set or unset this logger's own level. Invalidates the effective-level
    /// cache of every descendant via the manager's generation counter.
    pub fn set_level(&self, level: Option<Level>) {
        *self.level.write() = level;
        manager().bump_generation();
    }

    /// Own level if set, else the nearest ancestor's set level, else the
    /// root default. Cached; any level change anywhere invalidates lazily.
    pub fn effective_level(&self) -> Level {
        let generation = manager().generation();
        let packed = self.cached_effective.load(Ordering::Relaxed);
        if packed >> 8 == generation {
            if let Some(level) = Level::from_value((packed & 0xff) as u8) {
                return level;
            }
        }

        let level = self.compute_effective();
        self.cached_effective
            .store((generation << 8) | u64::from(level.value()), Ordering::Relaxed);
        level
    }

    fn compute_effective(&self) -> Level {
        if let Some(level) = *self.level.read() {
            return level;
        }
        let mut parent = self.parent.read().clone();
        while let Some(name) = parent {
            let ancestor = manager().logger_or_root(&name);
            if let Some(level) = ancestor.level() {
                return level;
            }
            parent = ancestor.parent.read().clone();
        }
        // Unreachable in practice: root always carries a level.
        Level::Warning
    }

    /// Would a record at `level` be processed here at all?
    pub fn enabled_for(&self, level: Level) -> bool {
        if level == Level::Off || self.disabled.load(Ordering::Relaxed) {
            return false;
        }
        if let Some(floor) = manager().disable_floor() {
            if level <= floor {
                return false;
            }
        }
        level >= self.effective_level()
    }

    /// Attach a handler. Idempotent: attaching the same handler twice keeps
    /// a single entry. Insertion order is invocation order.
    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        let mut handlers = self.handlers.write();
        if !handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            handlers.push(handler);
        }
    }

    /// Detach a handler, matched by pointer identity. Idempotent.
    pub fn remove_handler(&self, handler: &Arc<dyn Handler>) {
        self.handlers.write().retain(|h| !Arc::ptr_eq(h, handler));
    }

    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        self.handlers.read().clone()
    }

    pub fn add_filter(&self, filter: Arc<dyn Filter>) {
        self.filters.write().add_filter(filter);
    }

    pub fn remove_filter(&self, filter: &Arc<dyn Filter>) {
        self.filters.write().remove_filter(filter);
    }

    pub fn propagate(&self) -> bool {
        self.propagate.load(Ordering::Relaxed)
    }

    pub fn set_propagate(&self, propagate: bool) {
        self.propagate.store(propagate, Ordering::Relaxed);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Relaxed);
    }

    /// Nearest real ancestor, or `None` for root itself.
    pub fn parent(&self) -> Option<Arc<Logger>> {
        // Drop the parent-name guard before touching the registry; the
        // registry takes these locks in the opposite order.
        let name = self.parent.read().clone();
        name.map(|name| manager().logger_or_root(&name))
    }

    pub(crate) fn parent_name(&self) -> Option<String> {
        self.parent.read().clone()
    }

    pub(crate) fn set_parent(&self, parent: Option<String>) {
        *self.parent.write() = parent;
        manager().bump_generation();
    }

    /// Log a pre-rendered message.
    pub fn log(&self, level: Level, message: impl Into<String>) {
        if !self.enabled_for(level) {
            return;
        }
        self.dispatch(LogRecord::new(&self.name, level, message.into()));
    }

    /// Log a message template with positional arguments and optional extra
    /// fields. Never raises: a reserved-key collision in `extra` is reported
    /// through the error hook and the record is not emitted.
    pub fn log_with(
        &self,
        level: Level,
        message: impl Into<String>,
        args: Vec<FieldValue>,
        extra: Option<Fields>,
    ) {
        if !self.enabled_for(level) {
            return;
        }
        let mut record = LogRecord::new(&self.name, level, message.into()).with_args(args);
        if let Some(extra) = extra {
            record = match record.with_extra(extra) {
                Ok(record) => record,
                Err(e) => {
                    report_error(&self.name, &e);
                    return;
                }
            };
        }
        self.dispatch(record);
    }

    /// Log with call-site location attached. The logging macros route here.
    pub fn log_located(
        &self,
        level: Level,
        message: impl Into<String>,
        file: &str,
        line: u32,
        module_path: &str,
    ) {
        if !self.enabled_for(level) {
            return;
        }
        self.dispatch(
            LogRecord::new(&self.name, level, message.into())
                .with_location(file, line, module_path),
        );
    }

    /// Log at `Error` with attached exception/stack text.
    pub fn exception(&self, message: impl Into<String>, exception: impl Into<String>) {
        if !self.enabled_for(Level::Error) {
            return;
        }
        self.dispatch(
            LogRecord::new(&self.name, Level::Error, message.into()).with_exception(exception),
        );
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    #[inline]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(Level::Warning, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    #[inline]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(Level::Critical, message);
    }

    /// Run the logger's own filter chain, then hand the record to handlers
    /// here and up the ancestor chain.
    fn dispatch(&self, record: LogRecord) {
        if !self.filters.read().allow(&record) {
            return;
        }
        self.call_handlers(&record);
    }

    /// Invoke every attached handler at this node, then walk ancestors up to
    /// and including root, stopping at a node with `propagate = false`.
    /// Each handler's own level and filters gate it independently.
    fn call_handlers(&self, record: &LogRecord) {
        // Snapshot the list so emits run without holding the lock and
        // readers never observe a partially updated list.
        let handlers = self.handlers.read().clone();
        for handler in &handlers {
            handler.handle(record);
        }
        if !self.propagate() {
            return;
        }

        let mut parent = self.parent.read().clone();
        while let Some(name) = parent {
            let ancestor = manager().logger_or_root(&name);
            let handlers = ancestor.handlers.read().clone();
            for handler in &handlers {
                handler.handle(record);
            }
            if !ancestor.propagate() {
                return;
            }
            parent = ancestor.parent.read().clone();
        }
    }

    /// Flush every handler attached to this logger.
    pub fn flush(&self) {
        for handler in self.handlers.read().iter() {
            if let Err(e) = handler.flush() {
                report_error(handler.name(), &e);
            }
        }
    }
}
