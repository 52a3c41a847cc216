use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

/// Simple health check endpoint.
///
/// Used by load balancers and monitoring to know if the API is still alive.
/// Always 200 so the process counts as up; the `database` field says whether
/// the store is answering.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_status = match state.health.ping().await {
        Ok(()) => "Connected",
        Err(e) => {
            tracing::error!(op = "handlers.health.health_check", error = %e, "storage ping failed");
            "Disconnected"
        }
    };

    let response = HealthResponse {
        status: "OK".to_string(),
        database: db_status.to_string(),
    };

    (StatusCode::OK, Json(response))
}
