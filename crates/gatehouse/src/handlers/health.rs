//! health check endpoint handler

use std::time::Duration;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use gatehouse_store::KvStore;
use serde::Serialize;
use tokio::time::timeout;

use crate::AppState;

/// health check response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// content-type for health check responses per RFC 8040
const HEALTH_CONTENT_TYPE: &str = "application/health+json; charset=utf-8";

/// timeout for the store ping
const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// GET /health
///
/// pings the grant store; 200 with `{"status": "pass"}` if it answers in
/// time, otherwise 500 with `{"status": "fail"}`.
pub async fn health(State(state): State<AppState>) -> Response {
    let ping_result = timeout(PING_TIMEOUT, state.authorizer.store().kv().ping()).await;

    let (status_code, health_status) = match ping_result {
        Ok(Ok(())) => (StatusCode::OK, "pass"),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "store ping failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "fail")
        }
        Err(_) => {
            tracing::warn!("store ping timed out");
            (StatusCode::INTERNAL_SERVER_ERROR, "fail")
        }
    };

    (
        status_code,
        [(header::CONTENT_TYPE, HEALTH_CONTENT_TYPE)],
        Json(HealthResponse {
            status: health_status,
        }),
    )
        .into_response()
}
