//! Handler that discards everything

use crate::core::error::Result;
use crate::core::handler::{Handler, HandlerCore};
use crate::core::record::LogRecord;

/// Accepts every record and does nothing with it.
///
/// Libraries attach this to their top-level logger so that logging calls
/// made before the application configures handlers produce no output and no
/// "no handler" noise.
pub struct NullHandler {
    core: HandlerCore,
}

impl NullHandler {
    pub fn new() -> Self {
        Self {
            core: HandlerCore::new("null"),
        }
    }
}

impl Default for NullHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for NullHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, _record: &LogRecord) -> Result<()> {
        Ok(())
    }
}
