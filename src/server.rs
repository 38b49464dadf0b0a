use axum::{
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::collector::Collector;
use crate::error::ExporterError;
use crate::exposition;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
    pub default_namespaces: Vec<String>,
}

impl AppState {
    pub fn new(collector: Arc<Collector>, default_namespaces: Vec<String>) -> Self {
        Self {
            collector,
            default_namespaces,
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// One collection cycle per request; the caller blocks until the full
/// pipeline completes or fails.
async fn metrics(State(state): State<Arc<AppState>>, RawQuery(query): RawQuery) -> Response {
    let namespaces = requested_namespaces(query.as_deref(), &state.default_namespaces);

    match state.collector.collect(&namespaces).await {
        Ok(records) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, exposition::CONTENT_TYPE)],
            exposition::render(&records),
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, ?namespaces, "collection cycle failed");
            (
                error_status(&err),
                Json(serde_json::json!({"error": err.to_string()})),
            )
                .into_response()
        }
    }
}

/// Repeated `namespace` query params; the configured default set when none
/// are given.
fn requested_namespaces(query: Option<&str>, default_namespaces: &[String]) -> Vec<String> {
    let requested: Vec<String> = query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .filter(|(key, _)| key == "namespace")
                .map(|(_, value)| value.into_owned())
                .collect()
        })
        .unwrap_or_default();

    if requested.is_empty() {
        default_namespaces.to_vec()
    } else {
        requested
    }
}

fn error_status(err: &ExporterError) -> StatusCode {
    match err {
        ExporterError::UpstreamStatus { .. } | ExporterError::Http(_) => StatusCode::BAD_GATEWAY,
        ExporterError::UpstreamShape(_) | ExporterError::Quantity { .. } | ExporterError::Pool(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the exporter server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting exporter server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
