//! API Service - On-demand ingestion of Vitibrasil datasets
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /producao, /comercializacao, /processamento, /importacao, /exportacao - Ingest one kind
//! - GET /ingest/:kind - Ingest by slug

use anyhow::Context;
use api::{router, ApiConfig, AppState, MemoryStore, PgStore, Pipeline, RecordStore, StoreBackend};
use collector::{Catalog, HttpFetcher};
use common::DatasetKind;
use std::sync::Arc;
use tracing::warn;

async fn build_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    match config.backend {
        StoreBackend::Postgres => {
            let db_url = config.db_url.as_deref().context("DB_URL env var missing")?;
            println!("Connecting to database...");
            let store = PgStore::connect(db_url, config.db_max_connections).await?;
            store.ensure_schema().await?;
            println!("Database connected");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            println!("Using in-memory store (rows are lost on exit)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    common::logging::init_tracing("info,sqlx=warn,tower_http=info")?;
    let config = ApiConfig::from_env()?;

    println!("=== Vitibrasil Ingestion API ===");
    println!("Portal: {}", config.portal.base_url);

    let store = build_store(&config).await?;
    let fetcher = HttpFetcher::new(&config.portal).context("Failed to build HTTP client")?;
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        store,
        Catalog::new(config.portal.base_url.clone()),
    );

    let state = Arc::new(AppState::new(pipeline));
    let shutdown = state.shutdown.clone();
    let app = router(state);

    println!("API listening on http://{}", config.bind);
    println!("\nEndpoints:");
    println!("  GET /health");
    for kind in DatasetKind::ALL {
        println!("  GET /{}", kind.slug());
    }
    println!("  GET /ingest/:kind");

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling in-flight ingestions");
            }
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
