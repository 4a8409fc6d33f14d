//! Snapshot store trait and implementations

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::record::{StoredRecord, WriteOutcome};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Keyed, write-once storage for computed snapshots.
///
/// A key is written at most once. Readers see either no record or a complete
/// one, never a partial write.
#[async_trait::async_trait]
pub trait SnapshotStore<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Read the full record stored under `key`
    async fn read_record(&self, key: &str) -> Result<Option<StoredRecord<T>>>;

    /// Store `value` under `key` unless a record already exists
    async fn write_if_absent(&self, key: &str, value: &T) -> Result<WriteOutcome>;

    /// Backend name for diagnostics
    fn backend_name(&self) -> &'static str;

    /// Read the value stored under `key`
    async fn read(&self, key: &str) -> Result<Option<T>> {
        Ok(self.read_record(key).await?.map(|record| record.value))
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::invalid_key("key must not be empty"));
    }
    Ok(())
}

fn check_record_key<T>(key: &str, record: &StoredRecord<T>) -> Result<()> {
    if record.key != key {
        return Err(StoreError::corruption(format!(
            "record for '{}' found under key '{}'",
            record.key, key
        )));
    }
    Ok(())
}

/// Map a key onto a file name; bytes outside `[A-Za-z0-9_-]` are percent-escaped
pub(crate) fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => stem.push(byte as char),
            _ => stem.push_str(&format!("%{:02X}", byte)),
        }
    }
    stem
}

fn encode(bytes: Vec<u8>, compress: bool) -> Result<Vec<u8>> {
    if !compress {
        return Ok(bytes);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&bytes)?;
    Ok(encoder.finish()?)
}

fn decode(bytes: Vec<u8>) -> Result<Vec<u8>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes);
    }
    let mut decoder = GzDecoder::new(bytes.as_slice());
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Write `bytes` to a staging file and link it into place.
///
/// `hard_link` fails if `dest` exists, so of two racing writers exactly one
/// publishes. The staging file is removed either way.
fn publish(staging_dir: &Path, dest: &Path, bytes: &[u8], fsync: bool) -> Result<WriteOutcome> {
    let tmp = staging_dir.join(format!("{}.tmp", Uuid::new_v4()));

    let result = (|| -> Result<WriteOutcome> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
        file.write_all(bytes)?;
        if fsync {
            file.sync_all()?;
        }
        drop(file);

        match std::fs::hard_link(&tmp, dest) {
            Ok(()) => Ok(WriteOutcome::Written),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(WriteOutcome::AlreadyExists),
            Err(e) => Err(StoreError::Io(e)),
        }
    })();

    if let Err(e) = std::fs::remove_file(&tmp) {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!("Failed to remove staging file {:?}: {}", tmp, e);
        }
    }

    result
}

/// Local file-based snapshot store
pub struct LocalSnapshotStore {
    config: StoreConfig,
}

impl LocalSnapshotStore {
    /// Open a store rooted at `config.data_dir`, creating its directories
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate().map_err(StoreError::config)?;

        std::fs::create_dir_all(config.snapshots_dir())?;
        std::fs::create_dir_all(config.staging_dir())?;

        tracing::info!("Local snapshot store opened at: {:?}", config.data_dir);

        Ok(Self { config })
    }

    /// Get the configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.config.snapshots_dir().join(format!("{}.snap", file_stem(key)))
    }
}

#[async_trait::async_trait]
impl<T> SnapshotStore<T> for LocalSnapshotStore
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn read_record(&self, key: &str) -> Result<Option<StoredRecord<T>>> {
        check_key(key)?;
        let path = self.path_for(key);

        let bytes = tokio::task::spawn_blocking(move || match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::new(ErrorKind::Other, e)))??;

        let Some(bytes) = bytes else {
            return Ok(None);
        };

        let record: StoredRecord<T> = serde_json::from_slice(&decode(bytes)?)?;
        check_record_key(key, &record)?;
        Ok(Some(record))
    }

    async fn write_if_absent(&self, key: &str, value: &T) -> Result<WriteOutcome> {
        check_key(key)?;
        let dest = self.path_for(key);

        let compression = self.config.compress.then(|| "gzip".to_string());
        let record = StoredRecord::new(key, value, compression);
        let bytes = encode(serde_json::to_vec(&record)?, self.config.compress)?;

        let staging_dir = self.config.staging_dir();
        let fsync = self.config.fsync;

        // Runs to completion even if the caller is dropped mid-write.
        let outcome =
            tokio::task::spawn_blocking(move || publish(&staging_dir, &dest, &bytes, fsync))
                .await
                .map_err(|e| StoreError::Io(std::io::Error::new(ErrorKind::Other, e)))??;

        tracing::debug!("Snapshot write for key {}: {:?}", key, outcome);
        Ok(outcome)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

/// In-memory snapshot store (for testing and single-process embedding)
///
/// Records are held serialized so a read always returns a fresh copy of
/// exactly what was written.
#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    records: Arc<Mutex<HashMap<String, String>>>,
    offline: Arc<AtomicBool>,
}

impl InMemorySnapshotStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("in-memory store is offline"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T> SnapshotStore<T> for InMemorySnapshotStore
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn read_record(&self, key: &str) -> Result<Option<StoredRecord<T>>> {
        self.check_online()?;
        check_key(key)?;

        let records = self.records.lock().await;
        match records.get(key) {
            Some(json) => {
                let record: StoredRecord<T> = serde_json::from_str(json)?;
                check_record_key(key, &record)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn write_if_absent(&self, key: &str, value: &T) -> Result<WriteOutcome> {
        self.check_online()?;
        check_key(key)?;

        let json = serde_json::to_string(&StoredRecord::new(key, value, None))?;

        let mut records = self.records.lock().await;
        if records.contains_key(key) {
            return Ok(WriteOutcome::AlreadyExists);
        }
        records.insert(key.to_string(), json);

        Ok(WriteOutcome::Written)
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_escapes_unsafe_bytes() {
        assert_eq!(file_stem("match-42_b"), "match-42_b");
        assert_eq!(file_stem("a/b c"), "a%2Fb%20c");
        assert_eq!(file_stem("../x"), "%2E%2E%2Fx");
    }

    #[test]
    fn test_compression_is_detected_on_decode() {
        let raw = br#"{"hello":"world"}"#.to_vec();
        let compressed = encode(raw.clone(), true).unwrap();
        assert!(compressed.starts_with(&GZIP_MAGIC));
        assert_eq!(decode(compressed).unwrap(), raw);
        assert_eq!(decode(raw.clone()).unwrap(), raw);
    }

    #[tokio::test]
    async fn test_in_memory_write_once() {
        let store = InMemorySnapshotStore::new();

        let first = SnapshotStore::<Vec<u32>>::write_if_absent(&store, "m1", &vec![1, 2]).await;
        let second = SnapshotStore::<Vec<u32>>::write_if_absent(&store, "m1", &vec![9]).await;

        assert_eq!(first.unwrap(), WriteOutcome::Written);
        assert_eq!(second.unwrap(), WriteOutcome::AlreadyExists);

        let stored: Option<Vec<u32>> = store.read("m1").await.unwrap();
        assert_eq!(stored, Some(vec![1, 2]));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_in_memory_offline_fails_reads_and_writes() {
        let store = InMemorySnapshotStore::new();
        store.set_offline(true);

        let read: Result<Option<Vec<u32>>> = store.read("m1").await;
        assert!(matches!(read, Err(StoreError::Unavailable(_))));

        let write = SnapshotStore::<Vec<u32>>::write_if_absent(&store, "m1", &vec![1]).await;
        assert!(matches!(write, Err(StoreError::Unavailable(_))));

        store.set_offline(false);
        let read: Option<Vec<u32>> = store.read("m1").await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let store = InMemorySnapshotStore::new();
        let read: Result<Option<Vec<u32>>> = store.read("").await;
        assert!(matches!(read, Err(StoreError::InvalidKey(_))));
    }
}
