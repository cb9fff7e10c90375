//! Event-ingestion surface.
//!
//! `POST /events` receives orchestrator event-bus payloads, peeks the
//! `eventType` tag, and fans status updates out to every configured backend
//! on its own task. The sender gets an acknowledgement, never the outcome:
//! issuance is fire-and-forget by design.

use crate::backend::{self, Backend};
use crate::events::StatusEvent;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

const STATUS_UPDATE_EVENT: &str = "status_update_event";

/// Build the ingestion router.
pub fn router(backends: Arc<Vec<Backend>>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status", get(health))
        .route("/events", post(create_event))
        .layer(TraceLayer::new_for_http())
        .with_state(backends)
}

/// Build information.
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "bellhop": format!("version: {}", env!("CARGO_PKG_VERSION")),
    }))
}

/// Liveness check.
async fn health() -> &'static str {
    "OK"
}

/// Decode one event-bus payload and dispatch it.
async fn create_event(
    State(backends): State<Arc<Vec<Backend>>>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let event_type = payload
        .get("eventType")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();

    if event_type != STATUS_UPDATE_EVENT {
        warn!(event_type = %event_type, "event type is not dispatched to any backend");
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("event type '{event_type}' is not dispatched to any backend"),
            })),
        )
            .into_response();
    }

    match serde_json::from_value::<StatusEvent>(payload) {
        Ok(event) => {
            backend::dispatch(&backends, &event);
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({ "status": "dispatched" })),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "malformed status update event");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
