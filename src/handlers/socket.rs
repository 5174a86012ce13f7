//! Network handlers
//!
//! `SocketHandler` ships each record to a TCP collector as JSON framed with
//! a 4-byte big-endian length prefix. `DatagramHandler` sends one JSON
//! payload per UDP datagram, unframed.

use crate::core::error::{LogError, Result};
use crate::core::handler::{Handler, HandlerCore};
use crate::core::record::LogRecord;
use parking_lot::Mutex;
use std::io::Write;
use std::net::{TcpStream, UdpSocket};
use std::time::{Duration, Instant};

const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const BACKOFF_BASE: Duration = Duration::from_millis(500);
const BACKOFF_CAP: Duration = Duration::from_secs(30);

struct SocketState {
    stream: Option<TcpStream>,
    consecutive_failures: u32,
    retry_after: Option<Instant>,
}

/// TCP handler with bounded reconnection.
///
/// The connection is opened lazily on the first emit. On a write failure the
/// handler drops the connection, tries one immediate reconnect-and-resend,
/// and on a second failure backs off exponentially (capped). While backed
/// off, emits fail fast through the error hook instead of blocking the
/// caller on a dead collector.
pub struct SocketHandler {
    core: HandlerCore,
    address: String,
    state: Mutex<SocketState>,
}

impl SocketHandler {
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            core: HandlerCore::new(format!("socket:{}", address)),
            address,
            state: Mutex::new(SocketState {
                stream: None,
                consecutive_failures: 0,
                retry_after: None,
            }),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn connect(&self) -> Result<TcpStream> {
        let stream = TcpStream::connect(&self.address).map_err(|e| {
            LogError::transport(&self.address, format!("connect failed: {}", e))
        })?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT)).map_err(|e| {
            LogError::transport(&self.address, format!("cannot set timeout: {}", e))
        })?;
        stream.set_nodelay(true).map_err(|e| {
            LogError::transport(&self.address, format!("cannot set nodelay: {}", e))
        })?;
        Ok(stream)
    }

    fn record_failure(&self, state: &mut SocketState) {
        state.stream = None;
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        let exponent = state.consecutive_failures.saturating_sub(1).min(16);
        let delay = BACKOFF_BASE
            .saturating_mul(1u32 << exponent)
            .min(BACKOFF_CAP);
        state.retry_after = Some(Instant::now() + delay);
    }

    fn record_success(&self, state: &mut SocketState) {
        state.consecutive_failures = 0;
        state.retry_after = None;
    }
}

/// Length-prefixed frame: 4-byte big-endian payload length, then the JSON.
fn frame(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(payload.len() + 4);
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(payload);
    framed
}

impl Handler for SocketHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let payload = serde_json::to_vec(record)?;
        let framed = frame(&payload);

        let mut state = self.state.lock();
        if state.stream.is_none() {
            if let Some(retry_after) = state.retry_after {
                if Instant::now() < retry_after {
                    return Err(LogError::transport(
                        &self.address,
                        "backing off after repeated connection failures",
                    ));
                }
            }
            match self.connect() {
                Ok(stream) => state.stream = Some(stream),
                Err(e) => {
                    self.record_failure(&mut state);
                    return Err(e);
                }
            }
        }

        // Checked or established above.
        let write_result = match state.stream.as_mut() {
            Some(stream) => stream.write_all(&framed),
            None => return Err(LogError::transport(&self.address, "not connected")),
        };
        match write_result {
            Ok(()) => {
                self.record_success(&mut state);
                Ok(())
            }
            Err(first_err) => {
                // One immediate reconnect-and-resend before backing off; a
                // collector restart then costs at most one duplicate dial.
                state.stream = None;
                match self.connect() {
                    Ok(mut stream) => match stream.write_all(&framed) {
                        Ok(()) => {
                            state.stream = Some(stream);
                            self.record_success(&mut state);
                            Ok(())
                        }
                        Err(e) => {
                            self.record_failure(&mut state);
                            Err(LogError::transport(
                                &self.address,
                                format!("resend failed: {} (first: {})", e, first_err),
                            ))
                        }
                    },
                    Err(e) => {
                        self.record_failure(&mut state);
                        Err(e)
                    }
                }
            }
        }
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(stream) = state.stream.as_mut() {
            stream
                .flush()
                .map_err(|e| LogError::transport(&self.address, format!("flush failed: {}", e)))?;
        }
        Ok(())
    }

    fn close(&self) {
        if self.core.mark_closed() {
            self.state.lock().stream = None;
        }
    }
}

/// Default ceiling for a single datagram payload.
pub const DEFAULT_MAX_DATAGRAM: usize = 8192;

/// UDP handler: one JSON payload per datagram, no framing.
///
/// Payloads larger than the configured maximum are truncated to fit; the
/// receiver sees a cut-off JSON document in that case. Fire-and-forget by
/// nature, so there is no reconnect machinery.
pub struct DatagramHandler {
    core: HandlerCore,
    address: String,
    max_datagram: usize,
    socket: Mutex<Option<UdpSocket>>,
}

impl DatagramHandler {
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            core: HandlerCore::new(format!("datagram:{}", address)),
            address,
            max_datagram: DEFAULT_MAX_DATAGRAM,
            socket: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_max_datagram(mut self, bytes: usize) -> Self {
        self.max_datagram = bytes.max(1);
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn send(&self, payload: &[u8]) -> Result<()> {
        let mut socket = self.socket.lock();
        if socket.is_none() {
            let bound = UdpSocket::bind("0.0.0.0:0").map_err(|e| {
                LogError::transport(&self.address, format!("bind failed: {}", e))
            })?;
            *socket = Some(bound);
        }
        if let Some(socket) = socket.as_ref() {
            socket.send_to(payload, &self.address).map_err(|e| {
                LogError::transport(&self.address, format!("send failed: {}", e))
            })?;
        }
        Ok(())
    }
}

impl Handler for DatagramHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let mut payload = serde_json::to_vec(record)?;
        payload.truncate(self.max_datagram);
        self.send(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::Level;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    fn record(message: &str) -> LogRecord {
        LogRecord::new("net", Level::Info, message)
    }

    #[test]
    fn test_frame_layout() {
        let framed = frame(b"abc");
        assert_eq!(&framed[..4], &3u32.to_be_bytes());
        assert_eq!(&framed[4..], b"abc");
    }

    #[test]
    fn test_socket_handler_sends_framed_json() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut len_buf = [0u8; 4];
            conn.read_exact(&mut len_buf).unwrap();
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut payload = vec![0u8; len];
            conn.read_exact(&mut payload).unwrap();
            payload
        });

        let handler = SocketHandler::new(addr.to_string());
        handler.emit(&record("over the wire")).unwrap();
        handler.close();

        let payload = server.join().unwrap();
        let decoded: LogRecord = serde_json::from_slice(&payload).unwrap();
        assert_eq!(decoded.message, "over the wire");
        assert_eq!(decoded.name, "net");
    }

    #[test]
    fn test_socket_handler_backs_off_after_failures() {
        // Grab a port and release it so connects fail fast.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let handler = SocketHandler::new(addr.to_string());
        assert!(handler.emit(&record("no listener")).is_err());
        // Second emit lands inside the backoff window and fails fast.
        let err = handler.emit(&record("still down")).unwrap_err();
        assert!(err.to_string().contains("backing off"));
    }

    #[test]
    fn test_datagram_handler_truncates_payload() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = receiver.local_addr().unwrap();

        let handler = DatagramHandler::new(addr.to_string()).with_max_datagram(32);
        handler
            .emit(&record("a message that serializes to far more than 32 bytes"))
            .unwrap();

        let mut buf = [0u8; 1024];
        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(n, 32);
    }

    #[test]
    fn test_datagram_handler_delivers_json() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = receiver.local_addr().unwrap();

        let handler = DatagramHandler::new(addr.to_string());
        handler.emit(&record("dgram")).unwrap();

        let mut buf = [0u8; 65536];
        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        let decoded: LogRecord = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(decoded.message, "dgram");
    }
}
