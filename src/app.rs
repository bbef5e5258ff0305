use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{GrantStore, SqliteGrantStore};
use crate::db;
use crate::errors::AppError;
use crate::events::{init_event_bus, start_activity_listener, EventBus};
use crate::jwt::JwtConfig;
use crate::routes::{auth, authz, health, permissions, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub grants: Arc<dyn GrantStore>,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, event_bus: EventBus) -> Self {
        Self {
            grants: Arc::new(SqliteGrantStore::new(pool.clone())),
            pool,
            jwt: Arc::new(jwt),
            event_bus,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;

    let seeded = db::catalog::seed(&pool).await?;
    if seeded > 0 {
        tracing::info!(entries = seeded, "permission catalog seeded");
    }

    let (event_bus, event_rx) = init_event_bus();
    tokio::spawn(start_activity_listener(event_rx, pool.clone()));

    let state = AppState::new(pool, jwt_config, event_bus);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/:id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route(
            "/:id/permissions",
            get(users::list_user_permissions)
                .post(users::add_user_permission)
                .put(users::replace_user_permissions),
        )
        .route(
            "/:id/permissions/:permission_id",
            delete(users::remove_user_permission),
        );

    let permission_routes = Router::new()
        .route("/", get(permissions::list_permissions).post(permissions::create_permission))
        .route("/:id", delete(permissions::delete_permission));

    let router = Router::new()
        .route("/api/health", get(health::health))
        .route("/authz/check", post(authz::check))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/permissions", permission_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
