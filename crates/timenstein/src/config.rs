//! Construction options for a [`Timeline`](crate::Timeline).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{TimelineError, TimelineResult};

/// Default namespace prefixed onto every entry name.
pub const DEFAULT_NAMESPACE: &str = "timenstein";
/// Default separator between the namespace and the handle.
pub const DEFAULT_NAMESPACE_SEPARATOR: &str = "::";
/// Default delimiter in front of each segment number.
pub const DEFAULT_SEGMENT_DELIMITER: &str = "-";

/// Level at which failed operations are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational
    Log,
    /// Warning
    #[default]
    Warn,
    /// Error
    Error,
}

impl FromStr for LogLevel {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(LogLevel::Log),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(TimelineError::InvalidToken),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            LogLevel::Log => "log",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(token)
    }
}

/// How created entries reach the per-handle series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionMode {
    /// Append right after the store confirms creation.
    #[default]
    Inline,
    /// Append when the store's creation notification is drained.
    Observed,
}

/// Configuration for a timeline instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Prefix isolating this instance's entries in the shared store
    pub namespace: String,
    /// Separator between namespace and handle
    pub namespace_separator: String,
    /// Delimiter in front of each segment number
    pub segment_delimiter: String,
    /// Whether failures are logged
    pub error_logging: bool,
    /// Level used for failure logs
    pub error_log_level: LogLevel,
    /// Ingestion design used by this instance
    pub ingestion: IngestionMode,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            namespace_separator: DEFAULT_NAMESPACE_SEPARATOR.to_string(),
            segment_delimiter: DEFAULT_SEGMENT_DELIMITER.to_string(),
            error_logging: true,
            error_log_level: LogLevel::Warn,
            ingestion: IngestionMode::Inline,
        }
    }
}

impl TimelineConfig {
    /// Create a config with the given namespace and default everything else.
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    /// Set the namespace separator.
    pub fn with_namespace_separator(mut self, separator: &str) -> Self {
        self.namespace_separator = separator.to_string();
        self
    }

    /// Set the segment delimiter.
    pub fn with_segment_delimiter(mut self, delimiter: &str) -> Self {
        self.segment_delimiter = delimiter.to_string();
        self
    }

    /// Enable or disable failure logging.
    pub fn with_error_logging(mut self, enabled: bool) -> Self {
        self.error_logging = enabled;
        self
    }

    /// Set the failure log level.
    pub fn with_error_log_level(mut self, level: LogLevel) -> Self {
        self.error_log_level = level;
        self
    }

    /// Select the ingestion design.
    pub fn with_ingestion(mut self, mode: IngestionMode) -> Self {
        self.ingestion = mode;
        self
    }

    /// Check that the options can produce decodable names.
    pub fn validate(&self) -> TimelineResult<()> {
        if self.namespace.is_empty() {
            return Err(TimelineError::InvalidConfig("namespace is empty".to_string()));
        }
        if self.namespace_separator.is_empty() {
            return Err(TimelineError::InvalidConfig(
                "namespace separator is empty".to_string(),
            ));
        }
        if self.segment_delimiter.is_empty() {
            return Err(TimelineError::InvalidConfig(
                "segment delimiter is empty".to_string(),
            ));
        }
        // Segment numbers are decimal, so a digit delimiter can't be split back out.
        if self.segment_delimiter.chars().any(|c| c.is_ascii_digit()) {
            return Err(TimelineError::InvalidConfig(
                "segment delimiter contains a digit".to_string(),
            ));
        }
        Ok(())
    }
}
