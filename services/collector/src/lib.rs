//! Collector - locates and downloads the portal's published files
//!
//! Responsibilities:
//! - Resolve the current download link of each dataset kind from its listing tab
//! - Fetch raw bytes over HTTP with a bounded timeout
//! - Honor cancellation at every network suspension point

pub mod catalog;
pub mod config;
pub mod fetch;

pub use catalog::{Catalog, RemoteFile};
pub use config::PortalConfig;
pub use fetch::{fetch_cancellable, Fetcher, HttpFetcher};
