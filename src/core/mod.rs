//! Core types: levels, records, filters, formatting, the handler contract,
//! and the logger hierarchy.

pub mod clock;
pub mod error;
pub mod fields;
pub mod filter;
pub mod format;
pub mod handler;
pub mod level;
pub mod logger;
pub mod manager;
pub mod record;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LogError, Result};
pub use fields::{FieldValue, Fields};
pub use filter::{Filter, FilterChain, NameFilter};
pub use format::{Formatter, TemplateStyle};
pub use handler::{report_error, reset_error_hook, set_error_hook, Handler, HandlerCore};
pub use level::Level;
pub use logger::Logger;
pub use manager::{get_logger, manager, root, Manager};
pub use record::{LogRecord, RESERVED_FIELDS};
