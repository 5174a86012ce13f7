//! Error types for the logging framework

pub type Result<T> = std::result::Result<T, LogError>;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Format template error
    #[error("Format template error: {0}")]
    Template(String),

    /// File handler error with path
    #[error("File handler error for '{path}': {message}")]
    File { path: String, message: String },

    /// File rotation error
    #[error("Rotation failed for '{path}': {message}")]
    Rotation { path: String, message: String },

    /// Network or mail transport error
    #[error("Transport error for '{endpoint}': {message}")]
    Transport { endpoint: String, message: String },

    /// Queue full, record dropped
    #[error("Log queue full: record dropped (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// Queue already stopped, new records rejected
    #[error("Log queue stopped: record rejected")]
    QueueStopped,

    /// Handler permanently disabled after an unrecoverable failure
    #[error("Handler '{0}' is disabled")]
    HandlerDisabled(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LogError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LogError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a format template error
    pub fn template(message: impl Into<String>) -> Self {
        LogError::Template(message.into())
    }

    /// Create a file handler error
    pub fn file(path: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::File {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a rotation error
    pub fn rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::Rotation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LogError::Other(msg.into())
    }
}
