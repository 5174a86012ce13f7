//! Log level definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity level of a log record.
///
/// Levels form a total order; a logger or handler only processes records at
/// or above its configured level. `Off` is the disable-all sentinel: a logger
/// or handler set to `Off` emits nothing, and no record is created at `Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Debug = 10,
    Info = 20,
    Warning = 30,
    Error = 40,
    Critical = 50,
    /// Disable-all sentinel; never used on records.
    Off = 100,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Off => "OFF",
        }
    }

    /// Numeric value used for ordering and for the effective-level cache.
    pub(crate) fn value(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_value(value: u8) -> Option<Self> {
        match value {
            10 => Some(Level::Debug),
            20 => Some(Level::Info),
            30 => Some(Level::Warning),
            40 => Some(Level::Error),
            50 => Some(Level::Critical),
            100 => Some(Level::Off),
            _ => None,
        }
    }

    /// Map to an RFC 3164 syslog severity code.
    pub fn syslog_severity(&self) -> u8 {
        match self {
            Level::Debug => 7,
            Level::Info => 6,
            Level::Warning => 4,
            Level::Error => 3,
            Level::Critical => 2,
            // Off never reaches a syslog sink; debug is the harmless default.
            Level::Off => 7,
        }
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            Level::Debug => Blue,
            Level::Info => Green,
            Level::Warning => Yellow,
            Level::Error => Red,
            Level::Critical => BrightRed,
            Level::Off => BrightBlack,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Level {
    type Err = crate::core::error::LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARN" | "WARNING" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" | "FATAL" => Ok(Level::Critical),
            "OFF" => Ok(Level::Off),
            _ => Err(crate::core::error::LogError::config(
                "Level",
                format!("invalid log level: '{}'", s),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Critical);
        assert!(Level::Critical < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("debug".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("Warning".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("critical".parse::<Level>().unwrap(), Level::Critical);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Info.to_string(), "INFO");
        assert_eq!(Level::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn test_value_round_trip() {
        for level in [
            Level::Debug,
            Level::Info,
            Level::Warning,
            Level::Error,
            Level::Critical,
            Level::Off,
        ] {
            assert_eq!(Level::from_value(level.value()), Some(level));
        }
        assert_eq!(Level::from_value(99), None);
    }

    #[test]
    fn test_syslog_severity() {
        assert_eq!(Level::Debug.syslog_severity(), 7);
        assert_eq!(Level::Info.syslog_severity(), 6);
        assert_eq!(Level::Warning.syslog_severity(), 4);
        assert_eq!(Level::Error.syslog_severity(), 3);
        assert_eq!(Level::Critical.syslog_severity(), 2);
    }
}
