//! Upsert store boundary.
//!
//! A run opens one batch per dataset kind. Each record is probed by its composite
//! key and inserted only when absent. The probe is a fast path; the backend's
//! uniqueness constraint is the authority, and a rejection on insert (another
//! run got there first) counts as already present. Nothing is visible to other
//! readers until `commit`; dropping an uncommitted batch rolls it back.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use common::{DatasetKind, NormalizedRecord, RecordKey, Result};
use serde::Serialize;
use tracing::{debug, info};

/// Result of a single insert attempt inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The store rejected the row as a duplicate key.
    AlreadyPresent,
}

/// Per-run persistence counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    /// Rows committed by this run.
    pub inserted: usize,
    /// Rows skipped because their key already existed.
    pub skipped: usize,
}

/// One transactional batch scoped to a single dataset kind.
#[async_trait]
pub trait StoreBatch: Send {
    async fn exists(&mut self, key: &RecordKey) -> Result<bool>;

    async fn insert(&mut self, record: &NormalizedRecord) -> Result<InsertOutcome>;

    /// Publishes the batch and returns how many rows it actually added.
    ///
    /// This can be lower than the number of `Inserted` outcomes when a
    /// concurrent batch committed the same keys first.
    async fn commit(&mut self) -> Result<usize>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn begin(&self, kind: DatasetKind) -> Result<Box<dyn StoreBatch>>;
}

/// Persists `records` for `kind` in one batch, skipping keys that already exist.
///
/// Any store error drops the batch, rolling back everything inserted so far.
pub async fn persist_batch(
    store: &dyn RecordStore,
    kind: DatasetKind,
    records: &[NormalizedRecord],
) -> Result<UpsertSummary> {
    let mut batch = store.begin(kind).await?;
    let mut summary = UpsertSummary::default();

    for record in records {
        if batch.exists(&record.key()).await? {
            summary.skipped += 1;
            continue;
        }
        match batch.insert(record).await? {
            InsertOutcome::Inserted => summary.inserted += 1,
            InsertOutcome::AlreadyPresent => {
                debug!(%kind, key = ?record.key(), "lost insert race, treating as present");
                summary.skipped += 1;
            }
        }
    }

    let committed = batch.commit().await?;
    if committed < summary.inserted {
        debug!(
            %kind,
            staged = summary.inserted,
            committed,
            "keys published concurrently before commit"
        );
        summary.skipped += summary.inserted - committed;
        summary.inserted = committed;
    }
    info!(%kind, inserted = summary.inserted, skipped = summary.skipped, "batch committed");
    Ok(summary)
}
