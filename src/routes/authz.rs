use axum::Json;

use crate::authz::Authz;
use crate::errors::AppResult;
use crate::models::permission::{CheckRequest, CheckResponse};

/// Ask whether the caller holds any of the listed permissions.
///
/// Meant for UI affordances such as showing a menu section when the caller
/// holds anything under `prestasi.siswa.*`. Lacking the permissions is a
/// normal `allowed: false`, not an error.
#[utoipa::path(
    post,
    path = "/authz/check",
    tag = "Authz",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Decision", body = CheckResponse),
        (status = 401, description = "Missing token or account no longer active"),
        (status = 500, description = "Grants could not be read")
    ),
    security(("bearerAuth" = []))
)]
pub async fn check(authz: Authz, Json(req): Json<CheckRequest>) -> AppResult<Json<CheckResponse>> {
    let allowed = authz.has_any_permission(req.permissions.as_slice()).await?;
    Ok(Json(CheckResponse { allowed }))
}
