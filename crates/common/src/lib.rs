//! Types shared across the collector, parser and api services.

pub mod error;
pub mod kind;
pub mod logging;
pub mod record;

pub use error::{ErrorKind, IngestError, Result};
pub use kind::{DatasetKind, Family, UnknownKind, MAX_YEAR, MIN_YEAR};
pub use record::{CultivarRecord, NormalizedRecord, ProductRecord, RecordKey, TradeRecord};
