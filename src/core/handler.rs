//! Handler trait and shared handler state
//!
//! A handler is a sink for log records: it owns a level threshold, a filter
//! chain, and an optional formatter, and knows how to emit a formatted
//! record somewhere. Concrete handlers embed a `HandlerCore` for the shared
//! state and serialize their own I/O with a per-handler lock, so independent
//! handlers never contend.
//!
//! Emit failures never propagate into the caller's control flow; `handle`
//! reports them through the process-wide error hook and continues.

use super::error::{LogError, Result};
use super::filter::{Filter, FilterChain};
use super::format::Formatter;
use super::level::Level;
use super::record::LogRecord;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type ErrorHook = Box<dyn Fn(&str, &LogError) + Send + Sync>;

fn default_error_hook(handler: &str, error: &LogError) {
    eprintln!("[LOGTREE ERROR] handler '{}': {}", handler, error);
}

static ERROR_HOOK: Lazy<RwLock<ErrorHook>> =
    Lazy::new(|| RwLock::new(Box::new(default_error_hook)));

/// Replace the process-wide emit-failure hook.
///
/// The hook receives the failing handler's name and the error. The default
/// hook writes one line to stderr and continues; logging failures must never
/// crash the calling application.
pub fn set_error_hook(hook: impl Fn(&str, &LogError) + Send + Sync + 'static) {
    *ERROR_HOOK.write() = Box::new(hook);
}

/// Restore the default stderr-reporting hook.
pub fn reset_error_hook() {
    *ERROR_HOOK.write() = Box::new(default_error_hook);
}

/// Report a handler failure through the current hook.
pub fn report_error(handler: &str, error: &LogError) {
    (ERROR_HOOK.read())(handler, error);
}

static DEFAULT_FORMATTER: Lazy<Formatter> = Lazy::new(Formatter::default);

/// Shared state embedded by every concrete handler: level threshold, filter
/// chain, optional formatter, and the closed flag.
pub struct HandlerCore {
    name: String,
    level: RwLock<Level>,
    filters: RwLock<FilterChain>,
    formatter: RwLock<Option<Formatter>>,
    closed: AtomicBool,
}

impl HandlerCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: RwLock::new(Level::Debug),
            filters: RwLock::new(FilterChain::new()),
            formatter: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        *self.level.read()
    }

    pub fn set_level(&self, level: Level) {
        *self.level.write() = level;
    }

    pub fn set_formatter(&self, formatter: Formatter) {
        *self.formatter.write() = Some(formatter);
    }

    pub fn add_filter(&self, filter: Arc<dyn Filter>) {
        self.filters.write().add_filter(filter);
    }

    pub fn remove_filter(&self, filter: &Arc<dyn Filter>) {
        self.filters.write().remove_filter(filter);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark closed; returns `true` only on the first call, making `close`
    /// idempotent for every handler built on this core.
    pub fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Gate a record on closed flag, level threshold, and filter chain.
    pub fn passes(&self, record: &LogRecord) -> bool {
        if self.is_closed() {
            return false;
        }
        let level = self.level();
        if level == Level::Off || record.level < level {
            return false;
        }
        self.filters.read().allow(record)
    }

    /// Render with the configured formatter, or the crate default.
    pub fn format(&self, record: &LogRecord) -> String {
        match *self.formatter.read() {
            Some(ref formatter) => formatter.format(record),
            None => DEFAULT_FORMATTER.format(record),
        }
    }
}

/// A sink for log records.
///
/// Implementors provide `core()` and `emit()`; everything else has gating
/// and bookkeeping defaults. `emit` may fail on I/O; callers go through
/// `handle`, which contains the failure at the handler boundary.
pub trait Handler: Send + Sync {
    fn core(&self) -> &HandlerCore;

    /// Format and write one record. Handler-specific.
    fn emit(&self, record: &LogRecord) -> Result<()>;

    /// Push any buffered output out. No-op for unbuffered handlers.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Flush and release resources. Idempotent: double close is a no-op.
    fn close(&self) {
        if self.core().mark_closed() {
            let _ = self.flush();
        }
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn level(&self) -> Level {
        self.core().level()
    }

    fn set_level(&self, level: Level) {
        self.core().set_level(level);
    }

    fn set_formatter(&self, formatter: Formatter) {
        self.core().set_formatter(formatter);
    }

    fn add_filter(&self, filter: Arc<dyn Filter>) {
        self.core().add_filter(filter);
    }

    fn remove_filter(&self, filter: &Arc<dyn Filter>) {
        self.core().remove_filter(filter);
    }

    /// Dispatch entry point: gate on level/filters/closed, then emit,
    /// reporting any failure through the error hook instead of raising.
    fn handle(&self, record: &LogRecord) {
        if !self.core().passes(record) {
            return;
        }
        if let Err(e) = self.emit(record) {
            report_error(self.core().name(), &e);
        }
    }
}
