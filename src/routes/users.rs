//! User management.
//!
//! Account CRUD plus the endpoints that edit a user's grants. Every change to
//! grants is logged to the activity log with Critical severity.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::app::AppState;
use crate::authz::{Action, Authz, PermissionName, Resource};
use crate::db::{grants, users};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::models::permission::{Grant, GrantPermissionRequest, GrantSetChange, ReplacePermissionsRequest};
use crate::models::user::{DbUser, User, UserCreateRequest, UserDetail, UserUpdateRequest};
use crate::utils::{hash_password, utc_now};

fn users_permission(action: Action) -> PermissionName {
    PermissionName::new(Resource::Users, action)
}

fn require_non_blank(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{field} must not be empty")));
    }
    Ok(())
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// List active users
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses(
        (status = 200, description = "Active users", body = Vec<User>),
        (status = 403, description = "Missing users.view"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_users(State(state): State<AppState>, authz: Authz) -> AppResult<Json<Vec<User>>> {
    authz.require(users_permission(Action::View)).await?;

    let rows = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, email, password_hash, role, created_at, updated_at, deleted_at FROM users WHERE deleted_at IS NULL ORDER BY id",
    )
    .fetch_all(&state.pool)
    .await?;

    let users = rows
        .into_iter()
        .map(User::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(users))
}

/// Create a user, seeding grants from the role unless a list is given
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = UserDetail),
        (status = 400, description = "Invalid input or unknown permission"),
        (status = 403, description = "Missing users.create"),
        (status = 409, description = "Email already in use"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    authz: Authz,
    headers: HeaderMap,
    Json(req): Json<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<UserDetail>)> {
    authz.require(users_permission(Action::Create)).await?;

    require_non_blank("name", &req.name)?;
    require_non_blank("email", &req.email)?;
    let password_hash = hash_password(&req.password)?;

    let detail = users::create(
        &state.pool,
        users::NewUser {
            name: &req.name,
            email: &req.email,
            password_hash,
            role: req.role,
        },
        req.permissions,
    )
    .await?;

    tracing::info!(
        actor_id = authz.user_id(),
        user_id = detail.user.id,
        role = %detail.user.role,
        grants = detail.permissions.len(),
        "user created"
    );

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(authz.user_id()),
        &detail,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Get a user and their grants
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserDetail),
        (status = 404, description = "User not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    authz: Authz,
    Path(id): Path<i64>,
) -> AppResult<Json<UserDetail>> {
    authz.require(users_permission(Action::View)).await?;

    let mut conn = state.pool.acquire().await?;
    let user = users::fetch_required(&mut conn, id).await?;
    let permissions = grants::list(&mut conn, id).await?;

    Ok(Json(UserDetail {
        user: user.try_into()?,
        permissions,
    }))
}

/// Update a user; a `permissions` list replaces all grants
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "User updated", body = UserDetail),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    authz: Authz,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UserUpdateRequest>,
) -> AppResult<Json<UserDetail>> {
    authz.require(users_permission(Action::Edit)).await?;

    let mut tx = state.pool.begin().await?;
    let existing = users::fetch_required(&mut tx, id).await?;
    let old_user: User = existing.clone().try_into()?;

    let name = req.name.unwrap_or(existing.name);
    require_non_blank("name", &name)?;

    let email = match req.email {
        Some(email) if email != existing.email => {
            require_non_blank("email", &email)?;
            users::ensure_email_available(&mut tx, &email, Some(id)).await?;
            email
        }
        _ => existing.email,
    };

    let password_hash = match req.password {
        Some(password) => hash_password(&password)?,
        None => existing.password_hash,
    };

    // a role change is recorded but grants stay as they are
    let role = req.role.unwrap_or(old_user.role);

    sqlx::query("UPDATE users SET name = ?, email = ?, password_hash = ?, role = ?, updated_at = ? WHERE id = ?")
        .bind(&name)
        .bind(&email)
        .bind(&password_hash)
        .bind(role.as_str())
        .bind(utc_now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let permissions = match &req.permissions {
        Some(names) => grants::replace(&mut tx, id, names).await?,
        None => grants::list(&mut tx, id).await?,
    };

    let user: User = users::fetch_required(&mut tx, id).await?.try_into()?;
    tx.commit().await?;

    let context = RequestContext::from_headers(&headers);
    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(authz.user_id()),
        &user,
        Some(&old_user),
        Some(context.clone()),
    );

    if req.permissions.is_some() {
        log_activity_with_context(
            &state.event_bus,
            "replaced",
            Some(authz.user_id()),
            &GrantSetChange {
                user_id: id,
                permissions: permissions.iter().map(|g| g.name.clone()).collect(),
            },
            None,
            Some(context),
        );
    }

    Ok(Json(UserDetail { user, permissions }))
}

/// Soft delete a user; their token stops authenticating
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete own account"),
        (status = 404, description = "User not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    authz: Authz,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    authz.require(users_permission(Action::Delete)).await?;

    if id == authz.user_id() {
        return Err(AppError::bad_request("cannot delete your own account"));
    }

    let mut conn = state.pool.acquire().await?;
    let user: User = users::fetch_required(&mut conn, id).await?.try_into()?;

    sqlx::query("UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ?")
        .bind(utc_now())
        .bind(utc_now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(authz.user_id()),
        &user,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// GRANTS
// =============================================================================

/// List the permissions granted to a user
#[utoipa::path(
    get,
    path = "/users/{id}/permissions",
    tag = "Users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Granted permissions", body = Vec<Grant>),
        (status = 404, description = "User not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_user_permissions(
    State(state): State<AppState>,
    authz: Authz,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Grant>>> {
    authz.require(users_permission(Action::View)).await?;

    let mut conn = state.pool.acquire().await?;
    users::fetch_required(&mut conn, id).await?;

    Ok(Json(grants::list(&mut conn, id).await?))
}

/// Grant one catalog permission to a user
#[utoipa::path(
    post,
    path = "/users/{id}/permissions",
    tag = "Users",
    params(("id" = i64, Path, description = "User ID")),
    request_body = GrantPermissionRequest,
    responses(
        (status = 201, description = "Permission granted", body = Grant),
        (status = 400, description = "Unknown permission"),
        (status = 404, description = "User not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn add_user_permission(
    State(state): State<AppState>,
    authz: Authz,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<GrantPermissionRequest>,
) -> AppResult<(StatusCode, Json<Grant>)> {
    authz.require(users_permission(Action::Edit)).await?;

    let mut conn = state.pool.acquire().await?;
    users::fetch_required(&mut conn, id).await?;
    let grant = grants::add(&mut conn, id, &req.permission).await?;

    log_activity_with_context(
        &state.event_bus,
        "added",
        Some(authz.user_id()),
        &grant,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(grant)))
}

/// Replace every grant of a user
#[utoipa::path(
    put,
    path = "/users/{id}/permissions",
    tag = "Users",
    params(("id" = i64, Path, description = "User ID")),
    request_body = ReplacePermissionsRequest,
    responses(
        (status = 200, description = "Grants replaced", body = Vec<Grant>),
        (status = 400, description = "Unknown permission; nothing changed"),
        (status = 404, description = "User not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn replace_user_permissions(
    State(state): State<AppState>,
    authz: Authz,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<ReplacePermissionsRequest>,
) -> AppResult<Json<Vec<Grant>>> {
    authz.require(users_permission(Action::Edit)).await?;

    let mut tx = state.pool.begin().await?;
    users::fetch_required(&mut tx, id).await?;
    let granted = grants::replace(&mut tx, id, &req.permissions).await?;
    tx.commit().await?;

    log_activity_with_context(
        &state.event_bus,
        "replaced",
        Some(authz.user_id()),
        &GrantSetChange {
            user_id: id,
            permissions: granted.iter().map(|g| g.name.clone()).collect(),
        },
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(granted))
}

/// Revoke one permission from a user
#[utoipa::path(
    delete,
    path = "/users/{id}/permissions/{permission_id}",
    tag = "Users",
    params(
        ("id" = i64, Path, description = "User ID"),
        ("permission_id" = i64, Path, description = "Permission ID"),
    ),
    responses(
        (status = 204, description = "Permission revoked"),
        (status = 404, description = "User does not hold this permission"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn remove_user_permission(
    State(state): State<AppState>,
    authz: Authz,
    headers: HeaderMap,
    Path((id, permission_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    authz.require(users_permission(Action::Edit)).await?;

    let mut conn = state.pool.acquire().await?;
    let grant = grants::remove(&mut conn, id, permission_id)
        .await?
        .ok_or_else(|| AppError::not_found("grant not found"))?;

    log_activity_with_context(
        &state.event_bus,
        "removed",
        Some(authz.user_id()),
        &grant,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}
