//! Stream handler writing formatted lines to an owned `Write` sink

use crate::core::error::{LogError, Result};
use crate::core::handler::{Handler, HandlerCore};
use crate::core::record::LogRecord;
use parking_lot::Mutex;
use std::io::Write;

#[cfg(feature = "console")]
use colored::Colorize;

enum Sink {
    Stdout,
    Stderr,
    Custom(Box<dyn Write + Send>),
}

/// Writes each formatted record plus a line terminator to a byte stream and
/// flushes after every emit.
///
/// # Examples
///
/// ```
/// use logtree::handlers::StreamHandler;
/// use logtree::get_logger;
/// use std::sync::Arc;
///
/// let logger = get_logger("app");
/// logger.add_handler(Arc::new(StreamHandler::stderr()));
/// logger.warning("configuration file missing, using defaults");
/// ```
pub struct StreamHandler {
    core: HandlerCore,
    sink: Mutex<Sink>,
    #[cfg(feature = "console")]
    colored: bool,
}

impl StreamHandler {
    pub fn stdout() -> Self {
        Self::with_sink("stream:stdout", Sink::Stdout)
    }

    pub fn stderr() -> Self {
        Self::with_sink("stream:stderr", Sink::Stderr)
    }

    /// Write to an arbitrary sink, e.g. an in-memory buffer in tests.
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self::with_sink("stream", Sink::Custom(sink))
    }

    fn with_sink(name: &str, sink: Sink) -> Self {
        Self {
            core: HandlerCore::new(name),
            sink: Mutex::new(sink),
            #[cfg(feature = "console")]
            colored: false,
        }
    }

    /// Colorize the formatted line by record level. Only sensible for
    /// terminal sinks.
    #[cfg(feature = "console")]
    #[must_use]
    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.colored = enabled;
        self
    }

    fn render(&self, record: &LogRecord) -> String {
        let line = self.core.format(record);
        #[cfg(feature = "console")]
        if self.colored {
            return line.color(record.level.color_code()).to_string();
        }
        line
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut sink = self.sink.lock();
        match *sink {
            Sink::Stdout => {
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                writeln!(out, "{}", line)?;
                out.flush()
            }
            Sink::Stderr => {
                let stderr = std::io::stderr();
                let mut out = stderr.lock();
                writeln!(out, "{}", line)?;
                out.flush()
            }
            Sink::Custom(ref mut w) => {
                writeln!(w, "{}", line)?;
                w.flush()
            }
        }
    }
}

impl Handler for StreamHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let line = self.render(record);
        self.write_line(&line)
            .map_err(|e| LogError::io_operation("writing to stream", "write failed", e))
    }

    fn flush(&self) -> Result<()> {
        let mut sink = self.sink.lock();
        match *sink {
            Sink::Stdout => std::io::stdout().flush()?,
            Sink::Stderr => std::io::stderr().flush()?,
            Sink::Custom(ref mut w) => w.flush()?,
        }
        Ok(())
    }
}
