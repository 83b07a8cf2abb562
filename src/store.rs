use crate::config::StoreConfig;
use crate::error::{LogStoreError, Result};
use crate::store_worker::StoreWorker;
use log::info;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Predicate deciding whether a stored line survives a filter pass.
pub(crate) type EntryFilter = Box<dyn Fn(&str) -> bool + Send + 'static>;

/// Operations accepted by the store worker
pub(crate) enum StoreCommand {
    Read {
        reply: oneshot::Sender<Result<Vec<String>>>,
    },
    Append {
        line: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Filter {
        filter: EntryFilter,
        reply: oneshot::Sender<Result<()>>,
    },
    Clear {
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Handle to the serialized log file store.
///
/// Every clone submits to the same worker task, which runs operations
/// strictly one at a time in submission order. Two concurrent appends can
/// therefore never interleave their read-modify-write cycles. Create exactly
/// one store per log file; separate stores on the same path are not
/// serialized against each other.
#[derive(Clone)]
pub struct LogStore {
    command_tx: mpsc::Sender<StoreCommand>,
    log_path: Arc<PathBuf>,
}

impl LogStore {
    /// Start the store worker on the current tokio runtime.
    pub fn spawn(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::channel(config.queue_depth);
        let worker = StoreWorker::new(config.log_path.clone(), command_rx);
        tokio::spawn(worker.run());

        info!("Log store opened at {:?}", config.log_path);

        Ok(Self {
            command_tx,
            log_path: Arc::new(config.log_path.clone()),
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Read every stored line, oldest first. A missing file reads as empty.
    pub async fn read_entries(&self) -> Result<Vec<String>> {
        self.submit(|reply| StoreCommand::Read { reply }).await
    }

    /// Append one line to the end of the file.
    pub async fn append_entry(&self, line: impl Into<String>) -> Result<()> {
        let line = line.into();
        if line.contains('\n') {
            return Err(IoError::new(
                ErrorKind::InvalidInput,
                "log entries must not contain newlines",
            )
            .into());
        }
        self.submit(|reply| StoreCommand::Append { line, reply }).await
    }

    /// Keep only the lines for which `filter` returns true. The file is
    /// removed when nothing survives.
    pub async fn filter_entries<F>(&self, filter: F) -> Result<()>
    where
        F: Fn(&str) -> bool + Send + 'static,
    {
        let filter: EntryFilter = Box::new(filter);
        self.submit(|reply| StoreCommand::Filter { filter, reply })
            .await
    }

    /// Delete the log file. Succeeds when it is already absent.
    pub async fn clear_entries(&self) -> Result<()> {
        self.submit(|reply| StoreCommand::Clear { reply }).await
    }

    async fn submit<T>(
        &self,
        make_command: impl FnOnce(oneshot::Sender<Result<T>>) -> StoreCommand,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(make_command(reply_tx))
            .await
            .map_err(|_| LogStoreError::StoreClosed)?;
        reply_rx.await.map_err(|_| LogStoreError::StoreClosed)?
    }
}
