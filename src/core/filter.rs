//! Record filters and the shared filter chain
//!
//! A filter is a predicate over a `LogRecord`. Both loggers and handlers
//! embed a `FilterChain` by value, so filtering behaves identically at both
//! attachment points without a shared supertype.

use super::record::LogRecord;
use std::sync::Arc;

/// Predicate over a log record: `true` allows, `false` denies.
pub trait Filter: Send + Sync {
    fn allow(&self, record: &LogRecord) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&LogRecord) -> bool + Send + Sync,
{
    fn allow(&self, record: &LogRecord) -> bool {
        self(record)
    }
}

/// Allows records from the named logger and its dot-separated descendants.
///
/// A `NameFilter` for `"a.b"` allows `"a.b"` and `"a.b.c"` but not `"a.bc"`.
/// The empty name allows everything.
#[derive(Debug, Clone)]
pub struct NameFilter {
    name: String,
}

impl NameFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Filter for NameFilter {
    fn allow(&self, record: &LogRecord) -> bool {
        if self.name.is_empty() {
            return true;
        }
        match record.name.strip_prefix(&self.name) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }
}

/// Ordered sequence of filters, evaluated short-circuit on first deny.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    pub fn add_filter(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Remove a previously added filter, matched by pointer identity.
    /// Removing a filter that was never added is a no-op.
    pub fn remove_filter(&mut self, filter: &Arc<dyn Filter>) {
        self.filters.retain(|f| !Arc::ptr_eq(f, filter));
    }

    /// `true` iff every filter allows the record.
    pub fn allow(&self, record: &LogRecord) -> bool {
        self.filters.iter().all(|f| f.allow(record))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }
}
