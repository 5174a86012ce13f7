//! Syslog handler
//!
//! Sends RFC 3164 formatted datagrams over UDP: a `<PRI>` header where
//! `PRI = facility * 8 + severity`, then the tag and the formatted message.

use crate::core::error::{LogError, Result};
use crate::core::handler::{Handler, HandlerCore};
use crate::core::record::LogRecord;
use parking_lot::Mutex;
use std::net::UdpSocket;

/// Syslog facility codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facility {
    #[default]
    User,
    Daemon,
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
}

impl Facility {
    pub fn code(self) -> u8 {
        match self {
            Facility::User => 1,
            Facility::Daemon => 3,
            Facility::Local0 => 16,
            Facility::Local1 => 17,
            Facility::Local2 => 18,
            Facility::Local3 => 19,
            Facility::Local4 => 20,
            Facility::Local5 => 21,
            Facility::Local6 => 22,
            Facility::Local7 => 23,
        }
    }
}

/// UDP syslog handler.
///
/// # Examples
///
/// ```
/// use logtree::handlers::{Facility, SyslogHandler};
///
/// let handler = SyslogHandler::new("127.0.0.1:514", Facility::Local0)
///     .with_tag("myapp");
/// ```
pub struct SyslogHandler {
    core: HandlerCore,
    address: String,
    facility: Facility,
    tag: String,
    socket: Mutex<Option<UdpSocket>>,
}

impl SyslogHandler {
    pub fn new(address: impl Into<String>, facility: Facility) -> Self {
        let address = address.into();
        Self {
            core: HandlerCore::new(format!("syslog:{}", address)),
            address,
            facility,
            tag: "logtree".to_string(),
            socket: Mutex::new(None),
        }
    }

    /// Tag prepended to every message, conventionally the program name.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn facility(&self) -> Facility {
        self.facility
    }

    fn priority(&self, record: &LogRecord) -> u8 {
        self.facility.code() * 8 + record.level.syslog_severity()
    }
}

impl Handler for SyslogHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let datagram = format!(
            "<{}>{}: {}",
            self.priority(record),
            self.tag,
            self.core.format(record)
        );

        let mut socket = self.socket.lock();
        if socket.is_none() {
            let bound = UdpSocket::bind("0.0.0.0:0").map_err(|e| {
                LogError::transport(&self.address, format!("bind failed: {}", e))
            })?;
            *socket = Some(bound);
        }
        if let Some(socket) = socket.as_ref() {
            socket
                .send_to(datagram.as_bytes(), &self.address)
                .map_err(|e| {
                    LogError::transport(&self.address, format!("send failed: {}", e))
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::Level;

    #[test]
    fn test_priority_encoding() {
        let handler = SyslogHandler::new("127.0.0.1:514", Facility::Local0);
        // local0 (16) * 8 + error severity (3) = 131
        let record = LogRecord::new("app", Level::Error, "boom");
        assert_eq!(handler.priority(&record), 131);

        let handler = SyslogHandler::new("127.0.0.1:514", Facility::User);
        // user (1) * 8 + info severity (6) = 14
        let record = LogRecord::new("app", Level::Info, "ok");
        assert_eq!(handler.priority(&record), 14);
    }

    #[test]
    fn test_datagram_shape() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = receiver.local_addr().unwrap();

        let handler = SyslogHandler::new(addr.to_string(), Facility::Daemon).with_tag("testapp");
        handler
            .emit(&LogRecord::new("app", Level::Warning, "disk nearly full"))
            .unwrap();

        let mut buf = [0u8; 2048];
        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        let text = std::str::from_utf8(&buf[..n]).unwrap();
        // daemon (3) * 8 + warning severity (4) = 28
        assert!(text.starts_with("<28>testapp: "));
        assert!(text.contains("disk nearly full"));
    }
}
