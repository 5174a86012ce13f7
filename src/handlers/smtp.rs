//! SMTP handler
//!
//! One mail per record. Actual mail submission happens through an injected
//! [`MailTransport`]; the handler only assembles the message and contains
//! transport failures at the handler boundary. Typically combined with a
//! [`BufferingHandler`](super::BufferingHandler) or a high level threshold
//! so a misbehaving service does not flood a mailbox.

use crate::core::error::Result;
use crate::core::handler::{Handler, HandlerCore};
use crate::core::record::LogRecord;
use std::sync::Arc;

/// An assembled mail message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Submits one message to a mail system. Implementations must bound their
/// own submission time; `send` must not block indefinitely.
pub trait MailTransport: Send + Sync {
    fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Sends each record as a mail message through the injected transport.
pub struct SmtpHandler {
    core: HandlerCore,
    from: String,
    to: Vec<String>,
    subject: String,
    transport: Arc<dyn MailTransport>,
}

impl SmtpHandler {
    pub fn new(
        from: impl Into<String>,
        to: Vec<String>,
        subject: impl Into<String>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            core: HandlerCore::new("smtp"),
            from: from.into(),
            to,
            subject: subject.into(),
            transport,
        }
    }

    fn build_message(&self, record: &LogRecord) -> MailMessage {
        MailMessage {
            from: self.from.clone(),
            to: self.to.clone(),
            // The level and logger name make triage possible from the
            // subject line alone.
            subject: format!(
                "{} [{}] {}",
                self.subject,
                record.level,
                record.name
            ),
            body: self.core.format(record),
        }
    }
}

impl Handler for SmtpHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        self.transport.send(&self.build_message(record))
    }
}
