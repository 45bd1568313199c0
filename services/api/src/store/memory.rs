use async_trait::async_trait;
use common::{DatasetKind, IngestError, NormalizedRecord, RecordKey, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::{InsertOutcome, RecordStore, StoreBatch};

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<DatasetKind, Vec<NormalizedRecord>>,
    keys: HashMap<DatasetKind, HashSet<RecordKey>>,
}

/// Process-local store for dry runs and tests.
///
/// Inserts are staged in the batch and published on commit; a dropped batch
/// leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_after: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: every batch errors on its `n+1`th insert.
    pub fn fail_after_inserts(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn row_count(&self, kind: DatasetKind) -> usize {
        self.lock().rows.get(&kind).map_or(0, Vec::len)
    }

    /// Committed rows of `kind` in insertion order.
    pub fn rows(&self, kind: DatasetKind) -> Vec<NormalizedRecord> {
        self.lock().rows.get(&kind).cloned().unwrap_or_default()
    }
}

struct MemoryBatch {
    kind: DatasetKind,
    tables: Arc<Mutex<Tables>>,
    pending: Vec<NormalizedRecord>,
    pending_keys: HashSet<RecordKey>,
    fail_after: Option<usize>,
    attempts: usize,
}

impl MemoryBatch {
    fn committed_contains(&self, key: &RecordKey) -> bool {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.keys.get(&self.kind).is_some_and(|keys| keys.contains(key))
    }
}

#[async_trait]
impl StoreBatch for MemoryBatch {
    async fn exists(&mut self, key: &RecordKey) -> Result<bool> {
        Ok(self.pending_keys.contains(key) || self.committed_contains(key))
    }

    async fn insert(&mut self, record: &NormalizedRecord) -> Result<InsertOutcome> {
        if self.fail_after.is_some_and(|n| self.attempts >= n) {
            return Err(IngestError::Store("memory store unavailable".to_string()));
        }
        self.attempts += 1;

        let key = record.key();
        if self.pending_keys.contains(&key) || self.committed_contains(&key) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        self.pending_keys.insert(key);
        self.pending.push(record.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn commit(&mut self) -> Result<usize> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let Tables { rows, keys } = &mut *tables;
        let keys = keys.entry(self.kind).or_default();
        let rows = rows.entry(self.kind).or_default();

        let mut published = 0;
        for record in self.pending.drain(..) {
            if keys.insert(record.key()) {
                rows.push(record);
                published += 1;
            } else {
                debug!(kind = %self.kind, key = ?record.key(), "key committed concurrently, skipping");
            }
        }
        self.pending_keys.clear();
        Ok(published)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn begin(&self, kind: DatasetKind) -> Result<Box<dyn StoreBatch>> {
        Ok(Box::new(MemoryBatch {
            kind,
            tables: Arc::clone(&self.tables),
            pending: Vec::new(),
            pending_keys: HashSet::new(),
            fail_after: self.fail_after,
            attempts: 0,
        }))
    }
}
