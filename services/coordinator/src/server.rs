//! Credential retrieval surface.
//!
//! `GET /secret/{app_id}` blocks until the application's carrier token is
//! available, then returns it as the response body. This is the only place a
//! working credential crosses this service's boundary, and only because the
//! caller explicitly asked for it; the token never goes to a log or file.
//! The listener serves TLS (configured in `main`) since the response body is
//! a live credential.

use crate::coordinator::SecretCoordinator;
use crate::error::CoordinatorError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the retrieval router.
pub fn router(coordinator: Arc<SecretCoordinator>) -> Router {
    Router::new()
        // Application ids contain path separators, so capture the remainder.
        .route("/secret/{*app_id}", get(get_secret))
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}

/// Hand the carrier token to the application instance.
async fn get_secret(
    State(coordinator): State<Arc<SecretCoordinator>>,
    Path(app_id): Path<String>,
) -> Response {
    info!(app_id = %app_id, "waiting to deliver carrier token");
    match coordinator.retrieve(&app_id).await {
        Ok(token) => Json(serde_json::json!({ "secret": token.expose() })).into_response(),
        Err(e) => error_response(&e),
    }
}

fn error_response(error: &CoordinatorError) -> Response {
    let status = match error {
        CoordinatorError::InvalidIdentity => StatusCode::BAD_REQUEST,
        CoordinatorError::RetrievalTimedOut => StatusCode::GATEWAY_TIMEOUT,
        CoordinatorError::IssuanceFailed { .. } => StatusCode::BAD_GATEWAY,
        CoordinatorError::Vault(_) | CoordinatorError::TeamLookupFailed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(serde_json::json!({ "error": error.to_string() })),
    )
        .into_response()
}
