//! In-memory buffering handler
//!
//! Holds records until a trigger fires, then forwards the whole buffer in
//! arrival order to a downstream target. Useful for "keep quiet unless
//! something goes wrong" setups: buffer debug output, flush it all when an
//! error arrives.

use crate::core::error::Result;
use crate::core::handler::{Handler, HandlerCore};
use crate::core::level::Level;
use crate::core::record::LogRecord;
use parking_lot::Mutex;
use std::sync::Arc;

/// Buffers records and flushes them to a target handler when the buffer
/// fills, when a record at or above the trigger level arrives, or on an
/// explicit `flush`/`close`.
///
/// # Examples
///
/// ```
/// use logtree::handlers::{BufferingHandler, NullHandler};
/// use logtree::Level;
/// use std::sync::Arc;
///
/// let target = Arc::new(NullHandler::new());
/// let buffering = BufferingHandler::new(100, Level::Error, target);
/// ```
pub struct BufferingHandler {
    core: HandlerCore,
    capacity: usize,
    flush_level: Level,
    target: Arc<dyn Handler>,
    buffer: Mutex<Vec<LogRecord>>,
}

impl BufferingHandler {
    pub fn new(capacity: usize, flush_level: Level, target: Arc<dyn Handler>) -> Self {
        Self {
            core: HandlerCore::new("buffering"),
            capacity: capacity.max(1),
            flush_level,
            target,
            buffer: Mutex::new(Vec::new()),
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Forward everything buffered, in arrival order, then clear. Each
    /// forwarded record still goes through the target's own gate.
    fn flush_buffer(&self, buffer: &mut Vec<LogRecord>) {
        for record in buffer.drain(..) {
            self.target.handle(&record);
        }
    }
}

impl Handler for BufferingHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let mut buffer = self.buffer.lock();
        buffer.push(record.clone());
        if record.level >= self.flush_level || buffer.len() >= self.capacity {
            self.flush_buffer(&mut buffer);
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut buffer = self.buffer.lock();
        self.flush_buffer(&mut buffer);
        self.target.flush()
    }

    fn close(&self) {
        if self.core.mark_closed() {
            let _ = self.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handler::HandlerCore;

    struct Collector {
        core: HandlerCore,
        seen: Mutex<Vec<String>>,
    }

    impl Collector {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                core: HandlerCore::new("collector"),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn messages(&self) -> Vec<String> {
            self.seen.lock().clone()
        }
    }

    impl Handler for Collector {
        fn core(&self) -> &HandlerCore {
            &self.core
        }

        fn emit(&self, record: &LogRecord) -> Result<()> {
            self.seen.lock().push(record.rendered_message());
            Ok(())
        }
    }

    fn record(level: Level, message: &str) -> LogRecord {
        LogRecord::new("test", level, message)
    }

    #[test]
    fn test_buffer_holds_until_capacity() {
        let target = Collector::new();
        let handler = BufferingHandler::new(3, Level::Error, target.clone());

        handler.handle(&record(Level::Info, "one"));
        handler.handle(&record(Level::Info, "two"));
        assert!(target.messages().is_empty());
        assert_eq!(handler.buffered(), 2);

        // The third record reaches capacity and triggers the flush.
        handler.handle(&record(Level::Info, "three"));
        assert_eq!(target.messages(), vec!["one", "two", "three"]);
        assert_eq!(handler.buffered(), 0);
    }

    #[test]
    fn test_trigger_level_flushes_immediately() {
        let target = Collector::new();
        let handler = BufferingHandler::new(100, Level::Error, target.clone());

        handler.handle(&record(Level::Debug, "context"));
        handler.handle(&record(Level::Error, "boom"));
        assert_eq!(target.messages(), vec!["context", "boom"]);
    }

    #[test]
    fn test_close_drains_buffer() {
        let target = Collector::new();
        let handler = BufferingHandler::new(100, Level::Critical, target.clone());

        handler.handle(&record(Level::Info, "pending"));
        handler.close();
        assert_eq!(target.messages(), vec!["pending"]);
    }
}
