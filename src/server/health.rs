//! Health check endpoint for liveness probes.

use axum::Json;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::config::SERVICE_NAME;

/// Health check handler.
///
/// Returns `200 {"status": "healthy", "service": "ansieyes"}`. Used by load
/// balancers and process supervisors; carries no auth and touches no
/// collaborator.
pub async fn health_handler() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "service": SERVICE_NAME })),
    )
}
