//! Handler implementations

pub mod file;
pub mod memory;
pub mod null;
pub mod queue;
pub mod rotating;
pub mod smtp;
pub mod socket;
pub mod stream;
pub mod syslog;

#[cfg(feature = "http")]
pub mod http;

pub use file::{FileHandler, OpenMode, WatchedFileHandler};
pub use memory::BufferingHandler;
pub use null::NullHandler;
pub use queue::{queue_pair, FullQueuePolicy, QueueHandler, QueueListener};
pub use rotating::{RotatingFileHandler, RotationPolicy, RotationWhen};
pub use smtp::{MailMessage, MailTransport, SmtpHandler};
pub use socket::{DatagramHandler, SocketHandler};
pub use stream::StreamHandler;
pub use syslog::{Facility, SyslogHandler};

#[cfg(feature = "http")]
pub use http::HttpHandler;

// Re-export the trait so `use logtree::handlers::*` brings the contract in.
pub use crate::core::Handler;
