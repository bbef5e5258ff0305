//! Write side of the user-to-permission association.
//!
//! Grants always reference a catalog row; names that are not in the catalog
//! are rejected instead of being stored as dangling strings.

use sqlx::SqliteConnection;

use crate::errors::{AppError, AppResult};
use crate::models::permission::Grant;
use crate::utils::utc_now;

const SELECT_GRANTS: &str = r#"
	SELECT up.user_id, up.permission_id, p.name, up.created_at
	FROM user_permissions up
	INNER JOIN permissions p ON p.id = up.permission_id
"#;

pub async fn list(conn: &mut SqliteConnection, user_id: i64) -> AppResult<Vec<Grant>> {
	let sql = format!("{SELECT_GRANTS} WHERE up.user_id = ? ORDER BY p.name");
	let grants = sqlx::query_as::<_, Grant>(&sql)
		.bind(user_id)
		.fetch_all(&mut *conn)
		.await?;

	Ok(grants)
}

async fn fetch(conn: &mut SqliteConnection, user_id: i64, permission_id: i64) -> AppResult<Option<Grant>> {
	let sql = format!("{SELECT_GRANTS} WHERE up.user_id = ? AND up.permission_id = ?");
	let grant = sqlx::query_as::<_, Grant>(&sql)
		.bind(user_id)
		.bind(permission_id)
		.fetch_optional(&mut *conn)
		.await?;

	Ok(grant)
}

/// Catalog id of `name`, or 400 if the catalog has no such entry.
pub async fn resolve(conn: &mut SqliteConnection, name: &str) -> AppResult<i64> {
	sqlx::query_scalar::<_, i64>("SELECT id FROM permissions WHERE name = ?")
		.bind(name)
		.fetch_optional(&mut *conn)
		.await?
		.ok_or_else(|| AppError::bad_request(format!("unknown permission: {name}")))
}

/// Grants `name` to the user. Granting a held permission is a no-op.
pub async fn add(conn: &mut SqliteConnection, user_id: i64, name: &str) -> AppResult<Grant> {
	let permission_id = resolve(conn, name).await?;

	sqlx::query("INSERT OR IGNORE INTO user_permissions (user_id, permission_id, created_at) VALUES (?, ?, ?)")
		.bind(user_id)
		.bind(permission_id)
		.bind(utc_now())
		.execute(&mut *conn)
		.await?;

	fetch(conn, user_id, permission_id)
		.await?
		.ok_or_else(|| AppError::internal("grant missing after insert"))
}

/// Revokes one grant, returning it if the user held it.
pub async fn remove(conn: &mut SqliteConnection, user_id: i64, permission_id: i64) -> AppResult<Option<Grant>> {
	let existing = fetch(conn, user_id, permission_id).await?;

	if existing.is_some() {
		sqlx::query("DELETE FROM user_permissions WHERE user_id = ? AND permission_id = ?")
			.bind(user_id)
			.bind(permission_id)
			.execute(&mut *conn)
			.await?;
	}

	Ok(existing)
}

/// Replaces every grant of the user with `names`.
///
/// Every name is resolved before anything is deleted, so an unknown name
/// leaves the existing grants intact. Run inside a transaction.
pub async fn replace(conn: &mut SqliteConnection, user_id: i64, names: &[String]) -> AppResult<Vec<Grant>> {
	let mut permission_ids = Vec::with_capacity(names.len());
	for name in names {
		permission_ids.push(resolve(conn, name).await?);
	}

	sqlx::query("DELETE FROM user_permissions WHERE user_id = ?")
		.bind(user_id)
		.execute(&mut *conn)
		.await?;

	let now = utc_now();
	for permission_id in permission_ids {
		sqlx::query("INSERT OR IGNORE INTO user_permissions (user_id, permission_id, created_at) VALUES (?, ?, ?)")
			.bind(user_id)
			.bind(permission_id)
			.bind(now)
			.execute(&mut *conn)
			.await?;
	}

	list(conn, user_id).await
}
