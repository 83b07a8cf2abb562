use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log store worker is not running")]
    StoreClosed,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LogStoreError>;
