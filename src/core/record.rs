//! Log record structure
//!
//! A `LogRecord` is an immutable-after-creation snapshot of one logging
//! event. It is created exactly once per log call and read by filters,
//! formatters, and handlers.

use super::error::{LogError, Result};
use super::fields::{FieldValue, Fields};
use super::level::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// Field names reserved for the record itself; `extra` must not shadow them.
pub const RESERVED_FIELDS: &[&str] = &[
    "name",
    "level",
    "levelname",
    "message",
    "asctime",
    "thread",
    "threadName",
    "process",
    "file",
    "line",
    "module",
    "exception",
];

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if cache.is_none() {
            *cache = Some(format!("{:?}", std::thread::current().id()));
        }
        cache
            .as_ref()
            .expect("thread_id cache initialized in previous line")
            .clone()
    })
}

fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if cache.is_none() {
            *cache = Some(std::thread::current().name().map(String::from));
        }
        cache
            .as_ref()
            .expect("thread_name cache initialized in previous line")
            .clone()
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Name of the logger that produced this record
    pub name: String,
    pub level: Level,
    /// Message template; `{}` placeholders are substituted from `args`
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub args: Vec<FieldValue>,
    pub timestamp: DateTime<Utc>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub module_path: Option<String>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    pub process_id: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exception: Option<String>,
    #[serde(skip_serializing_if = "Fields::is_empty", default)]
    pub extra: Fields,
}

impl LogRecord {
    /// Sanitize the message template to prevent log injection
    ///
    /// Newlines, carriage returns, and tabs are replaced with escape
    /// sequences so a crafted message cannot forge extra log lines.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(name: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level,
            message: Self::sanitize_message(&message.into()),
            args: Vec::new(),
            timestamp: Utc::now(),
            file: None,
            line: None,
            module_path: None,
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
            process_id: std::process::id(),
            exception: None,
            extra: Fields::new(),
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<FieldValue>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_location(mut self, file: &str, line: u32, module_path: &str) -> Self {
        self.file = Some(file.to_string());
        self.line = Some(line);
        self.module_path = Some(module_path.to_string());
        self
    }

    #[must_use]
    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// Attach caller-supplied structured fields.
    ///
    /// # Errors
    ///
    /// Fails fast if any key collides with a reserved record field name.
    pub fn with_extra(mut self, extra: Fields) -> Result<Self> {
        for key in extra.keys() {
            if RESERVED_FIELDS.contains(&key) {
                return Err(LogError::config(
                    "LogRecord",
                    format!("extra field '{}' shadows a reserved record field", key),
                ));
            }
        }
        self.extra = extra;
        Ok(self)
    }

    /// Render the message with positional arguments substituted.
    ///
    /// Each `{}` in the template consumes one argument, left to right. An
    /// arity mismatch never fails: it degrades to a diagnostic string so a
    /// broken log line cannot crash the caller.
    pub fn rendered_message(&self) -> String {
        if self.args.is_empty() {
            return self.message.clone();
        }

        let placeholders = self.message.matches("{}").count();
        if placeholders != self.args.len() {
            return format!(
                "<formatting error: message {:?} expects {} argument(s), got {}>",
                self.message,
                placeholders,
                self.args.len()
            );
        }

        let mut rendered = String::with_capacity(self.message.len() + 16 * self.args.len());
        let mut rest = self.message.as_str();
        for arg in &self.args {
            // Placeholder count was verified above, so find always succeeds.
            if let Some(pos) = rest.find("{}") {
                rendered.push_str(&rest[..pos]);
                rendered.push_str(&arg.to_string());
                rest = &rest[pos + 2..];
            }
        }
        rendered.push_str(rest);
        rendered
    }

    /// Collapse the record into its fully rendered form.
    ///
    /// Used by the queue handler before enqueueing, so the consumer never
    /// re-renders in a different execution context.
    #[must_use]
    pub fn into_prepared(mut self) -> Self {
        if !self.args.is_empty() {
            self.message = self.rendered_message();
            self.args = Vec::new();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_args(message: &str, args: Vec<FieldValue>) -> LogRecord {
        LogRecord::new("test", Level::Info, message).with_args(args)
    }

    #[test]
    fn test_rendered_message_no_args() {
        let record = LogRecord::new("test", Level::Info, "plain message");
        assert_eq!(record.rendered_message(), "plain message");
    }

    #[test]
    fn test_rendered_message_substitution() {
        let record = record_with_args(
            "user {} performed {}",
            vec![FieldValue::from(42), FieldValue::from("login")],
        );
        assert_eq!(record.rendered_message(), "user 42 performed login");
    }

    #[test]
    fn test_rendered_message_arity_mismatch_is_fallback() {
        let record = record_with_args("expects {} and {}", vec![FieldValue::from(1)]);
        let rendered = record.rendered_message();
        assert!(!rendered.is_empty());
        assert!(rendered.contains("formatting error"));
        assert!(rendered.contains("expects 2 argument(s), got 1"));
    }

    #[test]
    fn test_message_sanitization() {
        let record = LogRecord::new("test", Level::Info, "line1\nline2\tend");
        assert_eq!(record.message, "line1\\nline2\\tend");
    }

    #[test]
    fn test_extra_reserved_key_rejected() {
        let record = LogRecord::new("test", Level::Info, "msg");
        let result = record.with_extra(Fields::new().with_field("levelname", "FAKE"));
        assert!(result.is_err());
    }

    #[test]
    fn test_extra_accepted() {
        let record = LogRecord::new("test", Level::Info, "msg")
            .with_extra(Fields::new().with_field("request_id", "abc-123"))
            .unwrap();
        assert_eq!(
            record.extra.get("request_id"),
            Some(&FieldValue::from("abc-123"))
        );
    }

    #[test]
    fn test_into_prepared_renders_once() {
        let record = record_with_args("value: {}", vec![FieldValue::from(7)]).into_prepared();
        assert_eq!(record.message, "value: 7");
        assert!(record.args.is_empty());
        assert_eq!(record.rendered_message(), "value: 7");
    }

    #[test]
    fn test_record_serializes_to_json() {
        let record = LogRecord::new("net.client", Level::Warning, "slow response");
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"name\":\"net.client\""));
        assert!(json.contains("\"Warning\""));
    }
}
