use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::app::AppState;
use crate::authz::name::validate_catalog_name;
use crate::authz::{permissions, Authz};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::models::permission::{Permission, PermissionCreateRequest};
use crate::utils::utc_now;

const SELECT_PERMISSION: &str = "SELECT id, name, resource, description, created_at FROM permissions";

/// List the permission catalog
#[utoipa::path(
    get,
    path = "/permissions",
    tag = "Permissions",
    responses(
        (status = 200, description = "Catalog entries", body = Vec<Permission>),
        (status = 403, description = "Missing permissions.view"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_permissions(
    State(state): State<AppState>,
    authz: Authz,
) -> AppResult<Json<Vec<Permission>>> {
    authz.require(permissions::PERMISSIONS_VIEW).await?;

    let sql = format!("{SELECT_PERMISSION} ORDER BY resource, name");
    let rows = sqlx::query_as::<_, Permission>(&sql)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(rows))
}

/// Add a catalog entry
#[utoipa::path(
    post,
    path = "/permissions",
    tag = "Permissions",
    request_body = PermissionCreateRequest,
    responses(
        (status = 201, description = "Catalog entry created", body = Permission),
        (status = 400, description = "Malformed permission name"),
        (status = 409, description = "Name already in the catalog"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_permission(
    State(state): State<AppState>,
    authz: Authz,
    headers: HeaderMap,
    Json(req): Json<PermissionCreateRequest>,
) -> AppResult<(StatusCode, Json<Permission>)> {
    authz.require(permissions::PERMISSIONS_CREATE).await?;

    let name = req.name.trim();
    validate_catalog_name(name).map_err(AppError::bad_request)?;

    let resource = match req.resource.as_deref().map(str::trim) {
        Some(resource) if !resource.is_empty() => resource.to_string(),
        _ => name.split('.').next().unwrap_or(name).to_string(),
    };

    let mut conn = state.pool.acquire().await?;

    let taken: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM permissions WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    if taken > 0 {
        return Err(AppError::conflict(format!("permission {name} already exists")));
    }

    let id = sqlx::query("INSERT INTO permissions (name, resource, description, created_at) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(&resource)
        .bind(&req.description)
        .bind(utc_now())
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

    let sql = format!("{SELECT_PERMISSION} WHERE id = ?");
    let permission = sqlx::query_as::<_, Permission>(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

    tracing::info!(actor_id = authz.user_id(), permission = %permission.name, "catalog entry created");

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(authz.user_id()),
        &permission,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(permission)))
}

/// Remove a catalog entry and every grant that references it
#[utoipa::path(
    delete,
    path = "/permissions/{id}",
    tag = "Permissions",
    params(("id" = i64, Path, description = "Permission ID")),
    responses(
        (status = 204, description = "Catalog entry removed"),
        (status = 404, description = "Permission not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_permission(
    State(state): State<AppState>,
    authz: Authz,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    authz.require(permissions::PERMISSIONS_DELETE).await?;

    let mut tx = state.pool.begin().await?;

    let sql = format!("{SELECT_PERMISSION} WHERE id = ?");
    let permission = sqlx::query_as::<_, Permission>(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("permission not found"))?;

    let revoked = sqlx::query("DELETE FROM user_permissions WHERE permission_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM permissions WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        actor_id = authz.user_id(),
        permission = %permission.name,
        revoked,
        "catalog entry removed"
    );

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(authz.user_id()),
        &permission,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}
