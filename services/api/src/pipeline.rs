//! Ingestion orchestrator: resolve → fetch → decode → reshape → sanitize → persist.
//!
//! Any stage failure short-circuits the rest and comes back as a typed error;
//! callers turn it into an `ErrorPayload` instead of propagating a fault.

use collector::{fetch_cancellable, Catalog, Fetcher};
use common::{DatasetKind, ErrorKind, IngestError, NormalizedRecord, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::store::{persist_batch, RecordStore, UpsertSummary};

/// Maximum number of records echoed back to the caller.
pub const PREVIEW_LIMIT: usize = 100;

/// What a successful run reports.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub source_label: String,
    pub source_url: String,
    pub preview_records: Vec<NormalizedRecord>,
    pub persisted: UpsertSummary,
}

/// Failure body: stable kind plus a human message.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub error_kind: ErrorKind,
    pub message: String,
}

impl From<&IngestError> for ErrorPayload {
    fn from(err: &IngestError) -> Self {
        Self {
            error_kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn RecordStore>,
    catalog: Catalog,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn RecordStore>, catalog: Catalog) -> Self {
        Self {
            fetcher,
            store,
            catalog,
        }
    }

    pub async fn run(&self, kind: DatasetKind) -> Result<IngestOutcome> {
        self.run_with_cancel(kind, &CancellationToken::new()).await
    }

    /// Runs one ingestion; `cancel` is honored while waiting on the network.
    pub async fn run_with_cancel(
        &self,
        kind: DatasetKind,
        cancel: &CancellationToken,
    ) -> Result<IngestOutcome> {
        let result = self.execute(kind, cancel).await;
        if let Err(e) = &result {
            warn!(%kind, error_kind = ?e.kind(), error = %e, "ingestion failed");
        }
        result
    }

    async fn execute(&self, kind: DatasetKind, cancel: &CancellationToken) -> Result<IngestOutcome> {
        let remote = self.catalog.resolve(self.fetcher.as_ref(), kind, cancel).await?;
        let bytes = fetch_cancellable(self.fetcher.as_ref(), &remote.url, cancel).await?;

        let (records, stats) = parser::parse_file(kind, &bytes)?;
        info!(
            %kind,
            rows = stats.rows,
            candidates = stats.candidates,
            kept = stats.kept,
            "parsed remote file"
        );

        let persisted = persist_batch(self.store.as_ref(), kind, &records).await?;

        let preview_records: Vec<_> = records.into_iter().take(PREVIEW_LIMIT).collect();
        info!(
            %kind,
            inserted = persisted.inserted,
            skipped = persisted.skipped,
            preview = preview_records.len(),
            "ingestion complete"
        );

        Ok(IngestOutcome {
            source_label: remote.label,
            source_url: remote.url.to_string(),
            preview_records,
            persisted,
        })
    }
}
