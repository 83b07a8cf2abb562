use crate::error::Result;
use crate::log_entry::{LogCode, LogEntry, LogLevel};
use crate::store::LogStore;
use chrono::Utc;
use std::backtrace::Backtrace;

/// Writes entries to the log store and mirrors them to the `log` facade.
#[derive(Clone)]
pub struct UpdatesLogger {
    store: LogStore,
}

impl UpdatesLogger {
    pub fn new(store: LogStore) -> Self {
        Self { store }
    }

    pub async fn trace(&self, message: impl Into<String>, code: LogCode) -> Result<()> {
        self.log(LogLevel::Trace, message, code, None, None).await
    }

    pub async fn debug(&self, message: impl Into<String>, code: LogCode) -> Result<()> {
        self.log(LogLevel::Debug, message, code, None, None).await
    }

    pub async fn info(&self, message: impl Into<String>, code: LogCode) -> Result<()> {
        self.log(LogLevel::Info, message, code, None, None).await
    }

    pub async fn warn(&self, message: impl Into<String>, code: LogCode) -> Result<()> {
        self.log(LogLevel::Warn, message, code, None, None).await
    }

    pub async fn error(&self, message: impl Into<String>, code: LogCode) -> Result<()> {
        self.log(LogLevel::Error, message, code, None, None).await
    }

    pub async fn fatal(&self, message: impl Into<String>, code: LogCode) -> Result<()> {
        self.log(LogLevel::Fatal, message, code, None, None).await
    }

    /// Stamp and persist one entry. Error and fatal entries carry the
    /// caller's stacktrace.
    pub async fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        code: LogCode,
        update_id: Option<String>,
        asset_id: Option<String>,
    ) -> Result<()> {
        let timestamp = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        let mut entry = LogEntry::new(timestamp, message.into(), code, level);
        entry.update_id = update_id;
        entry.asset_id = asset_id;
        if level.wants_stacktrace() {
            entry.stacktrace = Some(capture_stacktrace());
        }
        self.log_entry(entry).await
    }

    pub async fn log_entry(&self, entry: LogEntry) -> Result<()> {
        log::log!(
            target: "updates",
            facade_level(entry.level),
            "[{:?}] {}",
            entry.code,
            entry.message
        );
        self.store.append_entry(entry.encode()).await
    }
}

fn facade_level(level: LogLevel) -> log::Level {
    match level {
        LogLevel::Trace => log::Level::Trace,
        LogLevel::Debug => log::Level::Debug,
        LogLevel::Info => log::Level::Info,
        LogLevel::Warn => log::Level::Warn,
        LogLevel::Error | LogLevel::Fatal => log::Level::Error,
    }
}

fn capture_stacktrace() -> Vec<String> {
    Backtrace::force_capture()
        .to_string()
        .lines()
        .map(str::trim)
        .filter(|frame| !frame.is_empty())
        .map(str::to_string)
        .collect()
}
