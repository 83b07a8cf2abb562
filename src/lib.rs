//! Append-only diagnostic log file for client applications.
//!
//! [`LogStore`] owns a single newline-delimited file and runs every read,
//! append, filter and clear on one worker task. [`LogReader`] returns a
//! bounded, time-filtered view of the stored entries and purges old ones.

pub mod config;
pub mod error;
pub mod log_entry;
pub mod logger;
pub mod reader;
pub mod store;
mod store_worker;

pub use config::{load_config, StoreConfig};
pub use error::LogStoreError;
pub use log_entry::{LogCode, LogEntry, LogLevel, LogRecord};
pub use logger::UpdatesLogger;
pub use reader::LogReader;
pub use store::LogStore;
