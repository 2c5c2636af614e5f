use crate::domain::history::HistoryRecord;
use crate::domain::ports::HistoryStore;
use crate::error::{Result, TaxError};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Column Family holding the calculation history.
pub const CF_HISTORY: &str = "history";

/// A persistent history log backed by RocksDB.
///
/// Each record is one JSON value under a big-endian `u64` sequence key, so a
/// forward scan of the column family returns records in insertion order.
/// Every record is written with a single `put`, which RocksDB applies
/// atomically.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBHistoryStore {
    db: Arc<DB>,
    next_seq: Arc<AtomicU64>,
}

impl RocksDBHistoryStore {
    /// Opens or creates a RocksDB instance at the specified path and resumes
    /// the sequence after the last stored record.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_history = ColumnFamilyDescriptor::new(CF_HISTORY, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_history])?;

        let next_seq = {
            let cf = db.cf_handle(CF_HISTORY).ok_or_else(missing_cf)?;
            match db.iterator_cf(&cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _) = item?;
                    decode_key(&key)? + 1
                }
                None => 0,
            }
        };

        Ok(Self {
            db: Arc::new(db),
            next_seq: Arc::new(AtomicU64::new(next_seq)),
        })
    }
}

fn missing_cf() -> TaxError {
    TaxError::PersistenceError(format!("column family '{}' not found", CF_HISTORY))
}

fn decode_key(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| {
        TaxError::PersistenceError(format!("malformed history key of {} bytes", key.len()))
    })?;
    Ok(u64::from_be_bytes(bytes))
}

#[async_trait]
impl HistoryStore for RocksDBHistoryStore {
    async fn add(&self, record: HistoryRecord) -> Result<()> {
        let cf = self.db.cf_handle(CF_HISTORY).ok_or_else(missing_cf)?;

        let value = serde_json::to_vec(&record)
            .map_err(|e| TaxError::PersistenceError(format!("Serialization error: {}", e)))?;
        let key = self.next_seq.fetch_add(1, Ordering::SeqCst).to_be_bytes();

        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<HistoryRecord>> {
        let cf = self.db.cf_handle(CF_HISTORY).ok_or_else(missing_cf)?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let record: HistoryRecord = serde_json::from_slice(&value).map_err(|e| {
                TaxError::PersistenceError(format!("Failed to deserialize record: {}", e))
            })?;
            records.push(record);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calculator::CalculationResult;
    use crate::domain::money::{Income, Tax};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn record(postal_code: &str) -> HistoryRecord {
        let result = CalculationResult::new(Tax::new(dec!(100)).unwrap(), "Flat-10%").unwrap();
        HistoryRecord::new(Some(postal_code), Income::new(dec!(1000)).unwrap(), &result)
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBHistoryStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_HISTORY).is_some());
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rocksdb_history_order() {
        let dir = tempdir().unwrap();
        let store = RocksDBHistoryStore::open(dir.path()).unwrap();

        for code in ["0000", "7000", "A100"] {
            store.add(record(code)).await.unwrap();
        }

        let all = store.get_all().await.unwrap();
        let codes: Vec<&str> = all.iter().map(|r| r.postal_code()).collect();
        assert_eq!(codes, vec!["0000", "7000", "A100"]);
    }

    #[tokio::test]
    async fn test_rocksdb_sequence_resumes_after_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBHistoryStore::open(dir.path()).unwrap();
            store.add(record("0000")).await.unwrap();
            store.add(record("7000")).await.unwrap();
        }

        let store = RocksDBHistoryStore::open(dir.path()).unwrap();
        store.add(record("A100")).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].postal_code(), "A100");
    }
}
