use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    users: Option<i64>,
}

/// GET /health - reports whether the user store answers.
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let users = state.users.clone();
    let count = tokio::task::spawn_blocking(move || users.count_users()).await;

    match count {
        Ok(Ok(n)) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                users: Some(n),
            }),
        ),
        Ok(Err(e)) => {
            tracing::warn!("Health check failed: {}", e);
            degraded()
        }
        Err(e) => {
            tracing::warn!("Health check task failed: {}", e);
            degraded()
        }
    }
}

fn degraded() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(HealthResponse {
            status: "degraded",
            version: env!("CARGO_PKG_VERSION"),
            users: None,
        }),
    )
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}
