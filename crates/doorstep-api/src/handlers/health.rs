use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::error::HttpAppError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service and database are reachable"))
)]
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .map_err(doorstep_core::AppError::from)?;

    Ok(Json(json!({ "status": "ok" })))
}
