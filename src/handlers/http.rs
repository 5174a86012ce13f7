//! HTTP handler
//!
//! One POST per record, body is the record serialized to JSON. Blocking
//! client with an explicit request timeout so a slow endpoint cannot stall
//! the caller indefinitely.

use crate::core::error::{LogError, Result};
use crate::core::handler::{Handler, HandlerCore};
use crate::core::record::LogRecord;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// POSTs each record as JSON to a fixed endpoint.
///
/// # Examples
///
/// ```no_run
/// use logtree::handlers::HttpHandler;
///
/// let handler = HttpHandler::new("https://logs.example.com/ingest")?;
/// # Ok::<(), logtree::LogError>(())
/// ```
pub struct HttpHandler {
    core: HandlerCore,
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpHandler {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LogError::transport(&url, format!("cannot build client: {}", e)))?;
        Ok(Self {
            core: HandlerCore::new(format!("http:{}", url)),
            url,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Handler for HttpHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(record)
            .send()
            .map_err(|e| LogError::transport(&self.url, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(LogError::transport(
                &self.url,
                format!("endpoint returned {}", response.status()),
            ));
        }
        Ok(())
    }
}
