//! Webhook endpoint handler.
//!
//! Accepts GitHub webhook deliveries, verifies the signature against the raw
//! body, parses the event, and dispatches it inline. The response mirrors the
//! dispatch outcome:
//!
//! - `200 {"status": "processed"}` - an orchestrator ran
//! - `200 {"status": "ignored"}` - valid delivery the bot doesn't act on
//! - `400` - malformed payload
//! - `401` - bad or missing signature
//! - `500` - an orchestrator failed hard (its error comment, if any, has
//!   already been posted)

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::dispatch::DispatchOutcome;
use crate::types::DeliveryId;
use crate::webhooks::verify_signature;

use super::AppState;

/// Header name for the GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for the GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for the GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Webhook handler.
///
/// Signature verification happens before any parsing or I/O: a request that
/// fails it is rejected with 401 and touches no collaborator. An empty
/// configured secret skips verification (local development only) with a
/// warning per delivery.
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    // Deliveries are not deduplicated (the bot is stateless); the ID is
    // logged so a redelivered webhook's duplicate comment can be traced.
    let delivery = DeliveryId::new(header(&headers, HEADER_DELIVERY).unwrap_or("<none>"));

    let secret = state.webhook_secret();
    if secret.is_empty() {
        warn!(delivery = %delivery, "webhook secret not configured, skipping signature verification");
    } else {
        let signature = header(&headers, HEADER_SIGNATURE).unwrap_or("");
        if !verify_signature(&body, signature, secret) {
            warn!(delivery = %delivery, "invalid webhook signature");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid signature" })),
            );
        }
    }

    let event_type = header(&headers, HEADER_EVENT).unwrap_or("");
    debug!(delivery = %delivery, event_type = %event_type, "received webhook");

    let event = match crate::webhooks::parse_webhook(event_type, &body) {
        Ok(Some(event)) => event,
        Ok(None) => {
            return (StatusCode::OK, Json(json!({ "status": "ignored" })));
        }
        Err(e) => {
            warn!(delivery = %delivery, event_type = %event_type, error = %e, "malformed webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            );
        }
    };

    match state.dispatcher().dispatch(event).await {
        Ok(DispatchOutcome::Processed) => (StatusCode::OK, Json(json!({ "status": "processed" }))),
        Ok(DispatchOutcome::Ignored) => (StatusCode::OK, Json(json!({ "status": "ignored" }))),
        Err(e) => {
            // The orchestrator already posted its user-visible error comment
            // where the originating entity was known; this is the operator-
            // facing signal.
            warn!(delivery = %delivery, error = %e, "dispatch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}
