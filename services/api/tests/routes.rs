//! Router behaviour through `tower::ServiceExt::oneshot`.

use api::{router, AppState, MemoryStore, Pipeline};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use bytes::Bytes;
use collector::{Catalog, Fetcher};
use common::{DatasetKind, IngestError, Result};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use url::Url;

const BASE: &str = "http://portal.test/";

const IMPORT_LISTING: &str = r#"<a href="download/ImpVinhos.csv">Vinhos de mesa</a>"#;

/// Import listing plus a one-row import file; every other URL is a 404.
struct ImportPortal {
    file: &'static [u8],
}

#[async_trait]
impl Fetcher for ImportPortal {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        let listing = format!("{}index.php?opcao={}", BASE, DatasetKind::Import.listing_option());
        match url.as_str() {
            u if u == listing => Ok(Bytes::from_static(IMPORT_LISTING.as_bytes())),
            "http://portal.test/download/ImpVinhos.csv" => Ok(Bytes::from_static(self.file)),
            _ => Err(IngestError::network(url.as_str(), "connection refused")),
        }
    }
}

fn app(file: &'static [u8]) -> Router {
    let pipeline = Pipeline::new(
        Arc::new(ImportPortal { file }),
        Arc::new(MemoryStore::new()),
        Catalog::new(Url::parse(BASE).unwrap()),
    );
    router(Arc::new(AppState::new(pipeline)))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

const IMPORT_FILE: &[u8] = b"Id\tPa\xeds\t2020\t2020\n1\tChile\t10\t99.5\n";

// ----------------------------------------------------------------------------
// SERVICE ENDPOINTS
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_health() {
    let (status, body) = get(app(IMPORT_FILE), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_root_banner() {
    let (status, body) = get(app(IMPORT_FILE), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
}

// ----------------------------------------------------------------------------
// INGESTION
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_kind_route_returns_preview_and_counts() {
    let (status, body) = get(app(IMPORT_FILE), "/importacao").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source_label"], "Vinhos de mesa");
    assert_eq!(body["source_url"], "http://portal.test/download/ImpVinhos.csv");
    assert_eq!(body["persisted"]["inserted"], 1);
    assert_eq!(body["persisted"]["skipped"], 0);

    let preview = body["preview_records"].as_array().unwrap();
    assert_eq!(preview.len(), 1);
    assert_eq!(preview[0]["pais"], "Chile");
    assert_eq!(preview[0]["ano"], 2020);
    assert_eq!(preview[0]["valor_usd"], 99.5);
}

#[tokio::test]
async fn test_ingest_by_slug_matches_kind_route() {
    let (status, body) = get(app(IMPORT_FILE), "/ingest/importacao").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["persisted"]["inserted"], 1);
}

#[tokio::test]
async fn test_unknown_kind_is_bad_request() {
    let (status, body) = get(app(IMPORT_FILE), "/ingest/vinhos").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_kind"], "unknown_kind");
}

// ----------------------------------------------------------------------------
// ERROR PAYLOADS
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_schema_mismatch_is_unprocessable() {
    let (status, body) = get(app(b"Id\tPa\xeds\ttotal\ttotal\n1\tChile\t1\t2\n"), "/importacao").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_kind"], "schema_mismatch");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_unreachable_listing_is_bad_gateway() {
    let (status, body) = get(app(IMPORT_FILE), "/producao").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error_kind"], "network_failure");
}
