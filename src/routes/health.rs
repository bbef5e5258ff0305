use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::query_scalar;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::errors::AppResult;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db_ok: bool,
    /// Number of permission names in the catalog.
    pub catalog_size: Option<i64>,
    pub db_error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let catalog = query_scalar::<_, i64>("SELECT COUNT(1) FROM permissions")
        .fetch_one(&state.pool)
        .await;

    match catalog {
        Ok(size) => Ok(Json(HealthResponse { status: "ok", db_ok: true, catalog_size: Some(size), db_error: None })),
        Err(e) => Ok(Json(HealthResponse { status: "ok", db_ok: false, catalog_size: None, db_error: Some(e.to_string()) })),
    }
}
