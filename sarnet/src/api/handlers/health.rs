use axum::extract::State;
use serde::Serialize;

use crate::api::response::ApiResponse;
use crate::api::state::AppState;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub database: DatabaseStatus,
    pub colorizer: ColorizerStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DatabaseStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ColorizerStatus {
    /// `loaded`, `ready` (checkpoint found, not loaded yet) or `unavailable`.
    pub status: String,
    pub checkpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `GET /api/health/`
#[utoipa::path(
    get,
    path = "/api/health/",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Result<ApiResponse<HealthData>> {
    let database = match state.db.ping().await {
        Ok(()) => DatabaseStatus {
            status: "ok".to_string(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            DatabaseStatus {
                status: "error".to_string(),
            }
        }
    };

    let colorizer = &state.colorizer;
    let status = if colorizer.is_loaded() {
        "loaded"
    } else if colorizer.is_available() {
        "ready"
    } else {
        "unavailable"
    };

    Ok(ApiResponse::success(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        colorizer: ColorizerStatus {
            status: status.to_string(),
            checkpoint: colorizer.checkpoint().display().to_string(),
            reason: colorizer.unavailable_reason().map(str::to_string),
        },
    }))
}
