//! Shared test handlers
#![allow(dead_code)]

use logtree::{Handler, HandlerCore, LogRecord, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Collects every emitted record in memory.
pub struct CollectingHandler {
    core: HandlerCore,
    records: Mutex<Vec<LogRecord>>,
}

impl CollectingHandler {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            core: HandlerCore::new(name),
            records: Mutex::new(Vec::new()),
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|r| r.rendered_message())
            .collect()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }
}

impl Handler for CollectingHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Pushes `tag:message` onto a sequence shared between handlers, so a test
/// can assert cross-handler dispatch order.
pub struct SequenceHandler {
    core: HandlerCore,
    tag: String,
    sequence: Arc<Mutex<Vec<String>>>,
}

impl SequenceHandler {
    pub fn new(tag: &str, sequence: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            core: HandlerCore::new(format!("seq:{}", tag)),
            tag: tag.to_string(),
            sequence,
        })
    }
}

impl Handler for SequenceHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        self.sequence
            .lock()
            .push(format!("{}:{}", self.tag, record.rendered_message()));
        Ok(())
    }
}
