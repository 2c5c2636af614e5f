use crate::domain::history::HistoryRecord;
use crate::domain::ports::{HistoryStore, PostalCodeDirectory};
use crate::domain::postal_code::PostalCode;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use tokio::sync::RwLock;

/// A thread-safe in-memory history log.
///
/// Uses `Arc<RwLock<Vec<HistoryRecord>>>` so clones share the same log.
/// Writers hold the lock only for a push, readers only for a copy.
#[derive(Default, Clone)]
pub struct InMemoryHistoryStore {
    records: Arc<RwLock<Vec<HistoryRecord>>>,
}

impl InMemoryHistoryStore {
    /// Creates a new, empty in-memory history store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn add(&self, record: HistoryRecord) -> Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<HistoryRecord>> {
        Ok(self.records.read().await.clone())
    }
}

/// A postal code table held in memory, keyed by normalized code.
///
/// Clones share the table. Every insert bumps the generation so resolvers
/// caching earlier lookups know to drop them.
#[derive(Default, Clone)]
pub struct InMemoryPostalCodeDirectory {
    entries: Arc<StdRwLock<HashMap<PostalCode, String>>>,
    generation: Arc<AtomicU64>,
}

impl InMemoryPostalCodeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `postal_code` (normalized on the way in) to a calculator identifier,
    /// replacing any previous entry.
    pub fn insert(&self, postal_code: &str, calculator: &str) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(PostalCode::normalize(postal_code), calculator.to_string());
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PostalCodeDirectory for InMemoryPostalCodeDirectory {
    async fn calculator_for(&self, postal_code: &PostalCode) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(postal_code).cloned())
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
