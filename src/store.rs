use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};

use crate::error::StoreError;
use crate::models::CacheRecord;

// How many records a store keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    #[default]
    Unbounded,
    // keep only the n highest indices
    KeepLatest(NonZeroUsize),
}

impl Retention {
    pub fn from_max_entries(max: Option<NonZeroUsize>) -> Self {
        max.map_or(Retention::Unbounded, Retention::KeepLatest)
    }

    fn apply(&self, records: &mut BTreeMap<u64, CacheRecord>) -> usize {
        let Retention::KeepLatest(keep) = *self else {
            return 0;
        };
        let mut evicted = 0;
        while records.len() > keep.get() {
            records.pop_first();
            evicted += 1;
        }
        evicted
    }
}

// Storage behind the reply cache, keyed by hour index
#[async_trait]
pub trait ReplyStore: Send + Sync {
    // unreadable data loads as an empty store
    async fn load(&self);
    async fn get(&self, index: u64) -> Option<CacheRecord>;
    // insert if absent, never overwrite
    async fn put(&self, index: u64, record: CacheRecord) -> bool;
    async fn flush(&self) -> Result<(), StoreError>;
    async fn len(&self) -> usize;
}

// In-memory store; nothing survives the process
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<u64, CacheRecord>>,
    retention: Retention,
}

impl MemoryStore {
    pub fn new(retention: Retention) -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            retention,
        }
    }
}

#[async_trait]
impl ReplyStore for MemoryStore {
    async fn load(&self) {}

    async fn get(&self, index: u64) -> Option<CacheRecord> {
        self.records.read().await.get(&index).cloned()
    }

    async fn put(&self, index: u64, record: CacheRecord) -> bool {
        let mut records = self.records.write().await;
        insert_new(&mut records, index, record, self.retention)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

// Whole-file JSON store: {"<index>": {"prompt": ..., "reply": ...}}
// flush rewrites through a sibling temp file; unflushed puts survive a load
pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<FileState>,
    io: Mutex<()>, // serializes file reads and writes
    retention: Retention,
}

#[derive(Default)]
struct FileState {
    records: BTreeMap<u64, CacheRecord>,
    pending: BTreeSet<u64>, // put but not yet flushed
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, retention: Retention) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(FileState::default()),
            io: Mutex::new(()),
            retention,
        }
    }

    async fn read_file(&self) -> Result<BTreeMap<u64, CacheRecord>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ReplyStore for JsonFileStore {
    async fn load(&self) {
        // a reload must not interleave with a flush, or it reinstates a stale file
        let _io = self.io.lock().await;
        let mut loaded = match self.read_file().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cache file unreadable, starting empty");
                BTreeMap::new()
            }
        };

        let mut state = self.state.write().await;
        for index in &state.pending {
            if let Some(record) = state.records.get(index) {
                loaded.entry(*index).or_insert_with(|| record.clone());
            }
        }
        self.retention.apply(&mut loaded);
        state.records = loaded;
    }

    async fn get(&self, index: u64) -> Option<CacheRecord> {
        self.state.read().await.records.get(&index).cloned()
    }

    async fn put(&self, index: u64, record: CacheRecord) -> bool {
        let mut state = self.state.write().await;
        let inserted = insert_new(&mut state.records, index, record, self.retention);
        if inserted {
            state.pending.insert(index);
        }
        inserted
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let _io = self.io.lock().await;
        let (json, flushed) = {
            let state = self.state.read().await;
            (serde_json::to_vec(&state.records)?, state.pending.clone())
        };

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        self.state
            .write()
            .await
            .pending
            .retain(|index| !flushed.contains(index));
        Ok(())
    }

    async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }
}

fn insert_new(
    records: &mut BTreeMap<u64, CacheRecord>,
    index: u64,
    record: CacheRecord,
    retention: Retention,
) -> bool {
    if records.contains_key(&index) {
        return false;
    }
    records.insert(index, record);
    let evicted = retention.apply(records);
    if evicted > 0 {
        tracing::debug!(evicted, "retention evicted old records");
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(prompt: &str, reply: &str) -> CacheRecord {
        CacheRecord {
            prompt: prompt.to_string(),
            reply: reply.to_string(),
        }
    }

    #[tokio::test]
    async fn put_never_overwrites() {
        let store = MemoryStore::default();
        assert!(store.put(1, record("A", "first")).await);
        assert!(!store.put(1, record("A", "second")).await);
        assert_eq!(store.get(1).await, Some(record("A", "first")));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn keep_latest_evicts_lowest_indices() {
        let store = MemoryStore::new(Retention::KeepLatest(NonZeroUsize::new(2).unwrap()));
        for i in 1..=4 {
            store.put(i, record("x", "y")).await;
        }
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get(2).await, None);
        assert!(store.get(3).await.is_some());
        assert!(store.get(4).await.is_some());
    }

    #[test]
    fn retention_from_flag() {
        assert_eq!(Retention::from_max_entries(None), Retention::Unbounded);
        let five = NonZeroUsize::new(5).unwrap();
        assert_eq!(Retention::from_max_entries(Some(five)), Retention::KeepLatest(five));
    }

    #[tokio::test]
    async fn file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let store = JsonFileStore::new(&path, Retention::Unbounded);
        store.load().await;
        assert_eq!(store.len().await, 0);
        store.put(28, record("AA", "hello")).await;
        store.flush().await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["28"]["prompt"], "AA");
        assert_eq!(raw["28"]["reply"], "hello");

        let reopened = JsonFileStore::new(&path, Retention::Unbounded);
        reopened.load().await;
        assert_eq!(reopened.get(28).await, Some(record("AA", "hello")));
    }

    #[tokio::test]
    async fn reads_files_in_the_legacy_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{"1": {"prompt": "A", "reply": "one"}, "27": {"prompt": "A ", "reply": "x"}}"#,
        )
        .unwrap();

        let store = JsonFileStore::new(&path, Retention::Unbounded);
        store.load().await;
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get(27).await, Some(record("A ", "x")));
    }

    #[tokio::test]
    async fn malformed_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(&path, Retention::Unbounded);
        store.put(5, record("E", "stale")).await;
        store.load().await;
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn unflushed_records_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"1": {"prompt": "A", "reply": "one"}}"#).unwrap();

        let store = JsonFileStore::new(&path, Retention::Unbounded);
        store.load().await;
        store.put(2, record("B", "two")).await;
        store.load().await;
        assert_eq!(store.get(2).await, Some(record("B", "two")));
        assert_eq!(store.len().await, 2);

        store.flush().await.unwrap();
        std::fs::write(&path, "{}").unwrap();
        store.load().await;
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn flush_into_missing_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nope/cache.json"), Retention::Unbounded);
        store.put(1, record("A", "a")).await;
        assert!(matches!(store.flush().await, Err(StoreError::Io(_))));
    }
}
