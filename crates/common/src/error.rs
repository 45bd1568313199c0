//! Error taxonomy shared by every ingestion stage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IngestError {
    #[error("remote file not found: {0}")]
    NotFound(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("decode failure: {0}")]
    Decode(String),

    #[error("network failure fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} was cancelled")]
    Cancelled { url: String },

    #[error("store failure: {0}")]
    Store(String),
}

/// Stable machine-readable discriminant, reported to callers as `error_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    SchemaMismatch,
    DecodeFailure,
    NetworkFailure,
    Timeout,
    Cancelled,
    StoreFailure,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::NotFound(_) => ErrorKind::NotFound,
            IngestError::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            IngestError::Decode(_) => ErrorKind::DecodeFailure,
            IngestError::Network { .. } => ErrorKind::NetworkFailure,
            IngestError::Timeout { .. } => ErrorKind::Timeout,
            IngestError::Cancelled { .. } => ErrorKind::Cancelled,
            IngestError::Store(_) => ErrorKind::StoreFailure,
        }
    }

    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        IngestError::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
