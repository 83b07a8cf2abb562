use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field-keyed view of an entry handed to embedding applications.
pub type LogRecord = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        }
    }

    /// Levels that carry a captured stacktrace.
    pub fn wants_stacktrace(&self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Fatal)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category tag attached to every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogCode {
    None,
    NoUpdatesAvailable,
    UpdateAssetsNotAvailable,
    UpdateServerUnreachable,
    UpdateHasInvalidSignature,
    UpdateCodeSigningError,
    UpdateFailedToLoad,
    AssetsFailedToLoad,
    #[serde(rename = "JSRuntimeError")]
    JsRuntimeError,
    InitializationError,
    Unknown,
}

/// A single decoded log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    pub message: String,
    pub code: LogCode,
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Vec<String>>,
}

impl LogEntry {
    pub fn new(timestamp: u64, message: String, code: LogCode, level: LogLevel) -> Self {
        Self {
            timestamp,
            message,
            code,
            level,
            update_id: None,
            asset_id: None,
            stacktrace: None,
        }
    }

    pub fn with_update_id(mut self, update_id: impl Into<String>) -> Self {
        self.update_id = Some(update_id.into());
        self
    }

    pub fn with_asset_id(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }

    pub fn with_stacktrace(mut self, stacktrace: Vec<String>) -> Self {
        self.stacktrace = Some(stacktrace);
        self
    }

    /// Encode as a single line of JSON. Embedded newlines are escaped by the
    /// encoder, so the result never spans more than one line of the log file.
    pub fn encode(&self) -> String {
        // Plain strings, enums and integers only; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Decode a stored line, treating anything unparseable as absent.
    pub fn decode(line: &str) -> Option<Self> {
        Self::from_json(line).ok()
    }

    pub fn to_record(&self) -> LogRecord {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
