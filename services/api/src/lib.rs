//! API - Serves on-demand ingestion runs over HTTP
//!
//! Responsibilities:
//! - Orchestrate resolve, fetch, parse and persist for one dataset kind
//! - Persist idempotently through a transactional, race-tolerant store
//! - Map typed failures to structured responses

pub mod config;
pub mod pipeline;
pub mod routes;
pub mod store;

pub use config::{ApiConfig, StoreBackend};
pub use pipeline::{ErrorPayload, IngestOutcome, Pipeline, PREVIEW_LIMIT};
pub use routes::{router, AppState};
pub use store::{persist_batch, MemoryStore, PgStore, RecordStore, UpsertSummary};
