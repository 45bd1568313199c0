//! HTTP surface over the pipeline.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::{DatasetKind, ErrorKind};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::pipeline::{ErrorPayload, Pipeline};

// ============================================================================
// State
// ============================================================================

pub struct AppState {
    pub pipeline: Pipeline,
    /// Cancelled on shutdown; every run listens on a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            shutdown: CancellationToken::new(),
        }
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

#[derive(Serialize)]
struct UnknownKindResponse {
    error_kind: &'static str,
    message: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::SchemaMismatch | ErrorKind::DecodeFailure => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NetworkFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Cancelled | ErrorKind::StoreFailure => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Vitibrasil ingestion API",
    })
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ingest(state: &AppState, kind: DatasetKind) -> Response {
    let cancel = state.shutdown.child_token();
    match state.pipeline.run_with_cancel(kind, &cancel).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => (status_for(e.kind()), Json(ErrorPayload::from(&e))).into_response(),
    }
}

async fn ingest_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Response {
    match slug.parse::<DatasetKind>() {
        Ok(kind) => ingest(&state, kind).await,
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(UnknownKindResponse {
                error_kind: "unknown_kind",
                message: e.to_string(),
            }),
        )
            .into_response(),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app: Router<Arc<AppState>> = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ingest/:kind", get(ingest_by_slug));

    // One fixed route per kind, e.g. GET /producao
    for kind in DatasetKind::ALL {
        app = app.route(
            &format!("/{}", kind.slug()),
            get(move |State(state): State<Arc<AppState>>| async move { ingest(&state, kind).await }),
        );
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::DecodeFailure), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::NetworkFailure), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(ErrorKind::StoreFailure), StatusCode::SERVICE_UNAVAILABLE);
    }
}
