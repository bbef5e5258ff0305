#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use sekolah_authz::authz::Role;
use sekolah_authz::create_app;
use sekolah_authz::db::users::{self, NewUser};
use sekolah_authz::utils::hash_password;

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create tempdir")?;
        let opts = SqliteConnectOptions::new()
            .filename(dir.path().join("test.db"))
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opts).await?;

        let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
            .await?;
        migrator.run(&pool).await?;

        std::env::set_var("JWT_SECRET", "test-secret");
        let app = create_app(pool.clone()).await?;

        Ok(Self { app, pool, _dir: dir })
    }

    /// Inserts a user straight into the database. `None` seeds the role defaults.
    pub async fn create_user(&self, email: &str, role: Role, permissions: Option<&[&str]>) -> Result<i64> {
        let detail = users::create(
            &self.pool,
            NewUser {
                name: email,
                email,
                password_hash: hash_password(PASSWORD)?,
                role,
            },
            permissions.map(|names| names.iter().map(|name| name.to_string()).collect()),
        )
        .await?;

        Ok(detail.user.id)
    }

    pub async fn login(&self, email: &str) -> Result<String> {
        let (status, body) = self
            .send("POST", "/auth/login", None, Some(serde_json::json!({ "email": email, "password": PASSWORD })))
            .await?;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);

        body.get("token")
            .and_then(Value::as_str)
            .map(String::from)
            .context("missing token")
    }

    /// Creates a user and returns its id with a fresh token.
    pub async fn user_with(&self, email: &str, permissions: &[&str]) -> Result<(i64, String)> {
        let id = self.create_user(email, Role::Teacher, Some(permissions)).await?;
        let token = self.login(email).await?;
        Ok((id, token))
    }

    pub async fn admin(&self) -> Result<(i64, String)> {
        let id = self.create_user("admin@example.com", Role::Admin, None).await?;
        let token = self.login("admin@example.com").await?;
        Ok((id, token))
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok((status, value))
    }

    pub async fn check(&self, token: &str, permissions: &[&str]) -> Result<bool> {
        let (status, body) = self
            .send("POST", "/authz/check", Some(token), Some(serde_json::json!({ "permissions": permissions })))
            .await?;
        assert_eq!(status, StatusCode::OK, "check failed: {}", body);

        body.get("allowed").and_then(Value::as_bool).context("missing allowed")
    }

    pub async fn permission_id(&self, name: &str) -> Result<i64> {
        sqlx::query_scalar("SELECT id FROM permissions WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("{name} is not in the catalog"))
    }
}

pub fn names(grants: &Value) -> Vec<String> {
    grants
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|g| g.get("name").and_then(Value::as_str).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
