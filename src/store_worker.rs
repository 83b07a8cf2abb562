use crate::error::Result;
use crate::store::{EntryFilter, StoreCommand};
use log::{debug, info, trace, warn};
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Owns the log file and executes store commands one at a time, in the
/// order they were submitted.
pub(crate) struct StoreWorker {
    log_path: PathBuf,
    command_rx: mpsc::Receiver<StoreCommand>,
}

impl StoreWorker {
    pub(crate) fn new(log_path: PathBuf, command_rx: mpsc::Receiver<StoreCommand>) -> Self {
        Self {
            log_path,
            command_rx,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Log store worker started for {:?}", self.log_path);

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                StoreCommand::Read { reply } => {
                    let result = self.read_lines().await;
                    if let Ok(ref lines) = result {
                        debug!("Read {} log lines", lines.len());
                    }
                    let _ = reply.send(result);
                }
                StoreCommand::Append { line, reply } => {
                    let _ = reply.send(self.append(line).await);
                }
                StoreCommand::Filter { filter, reply } => {
                    let _ = reply.send(self.filter(filter).await);
                }
                StoreCommand::Clear { reply } => {
                    debug!("Clearing log file");
                    let _ = reply.send(self.delete_file().await);
                }
            }
        }

        info!("Log store worker stopped for {:?}", self.log_path);
    }

    async fn append(&self, line: String) -> Result<()> {
        let mut lines = self.read_lines().await?;
        lines.push(line);
        debug!("Appending log line, {} lines total", lines.len());
        self.write_lines(&lines).await
    }

    async fn filter(&self, filter: EntryFilter) -> Result<()> {
        let lines = self.read_lines().await?;
        let before = lines.len();
        let kept: Vec<String> = lines
            .into_iter()
            .filter(|line| filter(line.as_str()))
            .collect();
        debug!("Filter kept {} of {} log lines", kept.len(), before);
        self.write_lines(&kept).await
    }

    async fn ensure_file_exists(&self) -> Result<()> {
        if let Some(parent) = non_empty_parent(&self.log_path) {
            fs::create_dir_all(parent).await?;
        }
        let created = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.log_path)
            .await;
        match created {
            Ok(_) => {
                debug!("Created empty log file {:?}", self.log_path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_lines(&self) -> Result<Vec<String>> {
        self.ensure_file_exists().await?;
        let bytes = fs::read(&self.log_path).await?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let contents = String::from_utf8(bytes).map_err(|e| {
            warn!("Log file {:?} is not valid UTF-8: {}", self.log_path, e);
            IoError::new(ErrorKind::InvalidData, e)
        })?;
        Ok(contents.split('\n').map(str::to_string).collect())
    }

    /// Replace the file contents in one step. Empty contents remove the file
    /// so that "empty" and "absent" read back the same way.
    async fn write_lines(&self, lines: &[String]) -> Result<()> {
        if lines.is_empty() {
            return self.delete_file().await;
        }

        let tmp_path = temp_path_for(&self.log_path);
        if let Err(e) = write_and_sync(&tmp_path, lines.join("\n").as_bytes()).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, &self.log_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = sync_parent_dir(&self.log_path).await {
            warn!("Failed to sync directory of {:?}: {}", self.log_path, e);
        }
        trace!("Replaced {:?} with {} lines", self.log_path, lines.len());
        Ok(())
    }

    async fn delete_file(&self) -> Result<()> {
        match fs::remove_file(&self.log_path).await {
            Ok(()) => {
                debug!("Deleted log file {:?}", self.log_path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_and_sync(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    Ok(())
}

/// Flush the directory entry so the rename itself survives a power loss.
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let parent = non_empty_parent(path).unwrap_or_else(|| Path::new("."));
    fs::File::open(parent).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}
