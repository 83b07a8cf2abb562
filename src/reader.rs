use crate::config::{StoreConfig, DEFAULT_MAX_LOOKBACK_SECS};
use crate::error::Result;
use crate::log_entry::{LogEntry, LogRecord};
use crate::store::LogStore;
use chrono::{DateTime, Duration, Utc};
use log::{debug, trace, warn};
use tokio::sync::Mutex;

/// Time-windowed retrieval and age-based purge on top of a [`LogStore`].
///
/// Store failures are logged and then returned to the caller by every
/// operation; none of them substitutes an empty result for an error.
pub struct LogReader {
    store: LogStore,
    max_lookback: Duration,
    serial: Mutex<()>,
}

impl LogReader {
    /// Reader with the default one-day lookback.
    pub fn new(store: LogStore) -> Self {
        Self::with_lookback_secs(store, DEFAULT_MAX_LOOKBACK_SECS)
    }

    /// Reader using the configured lookback. The setting can only narrow the
    /// window; anything above one day is clamped to one day.
    pub fn with_config(store: LogStore, config: &StoreConfig) -> Self {
        Self::with_lookback_secs(store, config.max_lookback_secs)
    }

    fn with_lookback_secs(store: LogStore, lookback_secs: u64) -> Self {
        let secs = lookback_secs.min(DEFAULT_MAX_LOOKBACK_SECS) as i64;
        Self {
            store,
            max_lookback: Duration::seconds(secs),
            serial: Mutex::new(()),
        }
    }

    /// Decoded entries with a timestamp at or after `newer_than`, oldest first.
    /// The window never reaches further back than the configured lookback.
    pub async fn get_entries(&self, newer_than: DateTime<Utc>) -> Result<Vec<LogEntry>> {
        let _guard = self.serial.lock().await;

        let lower_bound = self.lower_bound(newer_than, Utc::now());
        let lines = self.store.read_entries().await.map_err(|e| {
            warn!("Failed to read log entries: {}", e);
            e
        })?;

        let total = lines.len();
        let entries: Vec<LogEntry> = lines
            .iter()
            .filter_map(|line| {
                let entry = LogEntry::decode(line);
                if entry.is_none() {
                    trace!("Skipping undecodable log line: {}", line);
                }
                entry
            })
            .filter(|entry| entry.timestamp >= lower_bound)
            .collect();

        debug!(
            "Returning {} of {} stored log entries newer than {}",
            entries.len(),
            total,
            lower_bound
        );
        Ok(entries)
    }

    /// Same window as [`get_entries`](Self::get_entries), re-encoded as lines.
    pub async fn get_entry_strings(&self, newer_than: DateTime<Utc>) -> Result<Vec<String>> {
        Ok(self
            .get_entries(newer_than)
            .await?
            .iter()
            .map(LogEntry::encode)
            .collect())
    }

    /// Same window as [`get_entries`](Self::get_entries), as field-keyed records.
    /// Absent optional fields are left out of each record.
    pub async fn get_entries_as_records(
        &self,
        newer_than: DateTime<Utc>,
    ) -> Result<Vec<LogRecord>> {
        Ok(self
            .get_entries(newer_than)
            .await?
            .iter()
            .map(LogEntry::to_record)
            .collect())
    }

    /// Remove every entry older than `older_than`. Lines that cannot be
    /// decoded are removed as well. No lookback cap applies here.
    pub async fn purge_entries(&self, older_than: DateTime<Utc>) -> Result<()> {
        let _guard = self.serial.lock().await;

        let threshold = epoch_secs(older_than);
        debug!("Purging log entries older than {}", threshold);

        self.store
            .filter_entries(move |line| {
                LogEntry::decode(line).is_some_and(|entry| entry.timestamp >= threshold)
            })
            .await
            .map_err(|e| {
                warn!("Failed to purge log entries: {}", e);
                e
            })
    }

    fn lower_bound(&self, newer_than: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
        let earliest = now
            .checked_sub_signed(self.max_lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        epoch_secs(newer_than.max(earliest))
    }
}

fn epoch_secs(at: DateTime<Utc>) -> u64 {
    u64::try_from(at.timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_entry::{LogCode, LogLevel};
    use tempfile::TempDir;

    fn reader(dir: &TempDir) -> (LogStore, LogReader) {
        let config = StoreConfig::with_log_path(dir.path().join("logs.txt"));
        let store = LogStore::spawn(&config).unwrap();
        let reader = LogReader::with_config(store.clone(), &config);
        (store, reader)
    }

    fn entry_at(timestamp: DateTime<Utc>, message: &str) -> String {
        LogEntry::new(
            epoch_secs(timestamp),
            message.to_string(),
            LogCode::None,
            LogLevel::Info,
        )
        .encode()
    }

    #[tokio::test]
    async fn lower_bound_is_clamped_to_lookback() {
        let dir = TempDir::new().unwrap();
        let (_store, reader) = reader(&dir);
        let now = Utc::now();

        let week_ago = now - Duration::days(7);
        assert_eq!(
            reader.lower_bound(week_ago, now),
            epoch_secs(now - Duration::days(1))
        );

        let hour_ago = now - Duration::hours(1);
        assert_eq!(reader.lower_bound(hour_ago, now), epoch_secs(hour_ago));
    }

    #[tokio::test]
    async fn configured_lookback_is_capped_at_one_day() {
        let dir = TempDir::new().unwrap();
        let mut config = StoreConfig::with_log_path(dir.path().join("logs.txt"));
        let store = LogStore::spawn(&config).unwrap();
        config.max_lookback_secs = 7 * 86_400;
        let reader = LogReader::with_config(store.clone(), &config);
        let now = Utc::now();

        assert_eq!(
            reader.lower_bound(now - Duration::days(30), now),
            epoch_secs(now - Duration::days(1))
        );

        store
            .append_entry(entry_at(now - Duration::days(3), "3 days"))
            .await
            .unwrap();
        let entries = reader.get_entries(now - Duration::days(30)).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn narrower_lookback_is_honoured() {
        let dir = TempDir::new().unwrap();
        let mut config = StoreConfig::with_log_path(dir.path().join("logs.txt"));
        config.max_lookback_secs = 3_600;
        let store = LogStore::spawn(&config).unwrap();
        let reader = LogReader::with_config(store, &config);
        let now = Utc::now();

        assert_eq!(
            reader.lower_bound(now - Duration::days(1), now),
            epoch_secs(now - Duration::hours(1))
        );
    }

    #[tokio::test]
    async fn get_entries_skips_old_and_corrupt_lines() {
        let dir = TempDir::new().unwrap();
        let (store, reader) = reader(&dir);
        let now = Utc::now();

        store
            .append_entry(entry_at(now - Duration::days(3), "ancient"))
            .await
            .unwrap();
        store
            .append_entry(entry_at(now - Duration::hours(2), "two hours"))
            .await
            .unwrap();
        store.append_entry("not json at all").await.unwrap();
        store
            .append_entry(entry_at(now, "current"))
            .await
            .unwrap();

        let messages: Vec<String> = reader
            .get_entries(now - Duration::days(30))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["two hours", "current"]);

        let recent = reader
            .get_entries(now - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "current");
    }

    #[tokio::test]
    async fn purge_drops_older_and_corrupt_lines() {
        let dir = TempDir::new().unwrap();
        let (store, reader) = reader(&dir);
        let now = Utc::now();
        let cutoff = now - Duration::days(2);

        let old = entry_at(now - Duration::days(5), "old");
        let at_cutoff = entry_at(cutoff, "at cutoff");
        let fresh = entry_at(now, "fresh");
        for line in [old.as_str(), "garbage", at_cutoff.as_str(), fresh.as_str()] {
            store.append_entry(line).await.unwrap();
        }

        reader.purge_entries(cutoff).await.unwrap();

        assert_eq!(store.read_entries().await.unwrap(), vec![at_cutoff, fresh]);
    }

    #[tokio::test]
    async fn purge_of_everything_removes_file() {
        let dir = TempDir::new().unwrap();
        let (store, reader) = reader(&dir);

        store
            .append_entry(entry_at(Utc::now() - Duration::hours(3), "stale"))
            .await
            .unwrap();
        reader.purge_entries(Utc::now()).await.unwrap();

        assert!(!store.log_path().exists());
    }

    #[tokio::test]
    async fn purge_failure_is_propagated() {
        let dir = TempDir::new().unwrap();
        let (store, reader) = reader(&dir);
        let now = Utc::now();
        let stale = entry_at(now - Duration::days(2), "stale");
        let fresh = entry_at(now, "fresh");
        store.append_entry(stale.clone()).await.unwrap();
        store.append_entry(fresh.clone()).await.unwrap();

        std::fs::create_dir(dir.path().join("logs.txt.tmp")).unwrap();

        assert!(reader.purge_entries(now - Duration::days(1)).await.is_err());
        assert_eq!(store.read_entries().await.unwrap(), vec![stale, fresh]);
    }

    #[tokio::test]
    async fn entry_strings_are_reencoded_lines() {
        let dir = TempDir::new().unwrap();
        let (store, reader) = reader(&dir);
        let now = Utc::now();
        let line = entry_at(now, "hello");

        store.append_entry(line.clone()).await.unwrap();

        let strings = reader.get_entry_strings(now).await.unwrap();
        assert_eq!(strings, vec![line]);
    }

    #[tokio::test]
    async fn read_failure_is_propagated() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::with_log_path(dir.path().to_path_buf());
        let store = LogStore::spawn(&config).unwrap();
        let reader = LogReader::new(store);

        assert!(reader.get_entries(Utc::now()).await.is_err());
        assert!(reader.get_entry_strings(Utc::now()).await.is_err());
        assert!(reader.get_entries_as_records(Utc::now()).await.is_err());
    }
}
