use sqlx::{SqliteConnection, SqlitePool};

use crate::authz::Role;
use crate::db::grants;
use crate::errors::{AppError, AppResult};
use crate::models::user::{DbUser, UserDetail};
use crate::utils::utc_now;

const SELECT_USER: &str =
	"SELECT id, name, email, password_hash, role, created_at, updated_at, deleted_at FROM users";

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
	pub name: &'a str,
	pub email: &'a str,
	pub password_hash: String,
	pub role: Role,
}

pub async fn fetch(conn: &mut SqliteConnection, user_id: i64) -> AppResult<Option<DbUser>> {
	let sql = format!("{SELECT_USER} WHERE id = ? AND deleted_at IS NULL");
	let user = sqlx::query_as::<_, DbUser>(&sql)
		.bind(user_id)
		.fetch_optional(&mut *conn)
		.await?;

	Ok(user)
}

pub async fn fetch_by_email(conn: &mut SqliteConnection, email: &str) -> AppResult<Option<DbUser>> {
	let sql = format!("{SELECT_USER} WHERE email = ? AND deleted_at IS NULL");
	let user = sqlx::query_as::<_, DbUser>(&sql)
		.bind(email)
		.fetch_optional(&mut *conn)
		.await?;

	Ok(user)
}

pub async fn fetch_required(conn: &mut SqliteConnection, user_id: i64) -> AppResult<DbUser> {
	fetch(conn, user_id)
		.await?
		.ok_or_else(|| AppError::not_found("user not found"))
}

/// Fails with 409 when another account already uses `email`.
///
/// Soft-deleted accounts keep their address reserved.
pub async fn ensure_email_available(
	conn: &mut SqliteConnection,
	email: &str,
	except: Option<i64>,
) -> AppResult<()> {
	let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ? AND id != ?")
		.bind(email)
		.bind(except.unwrap_or(-1))
		.fetch_one(&mut *conn)
		.await?;

	if count > 0 {
		return Err(AppError::conflict("email already in use"));
	}

	Ok(())
}

/// Creates an account and its initial grants in one transaction.
///
/// Without an explicit list the role's default permissions are copied in.
/// That copy is the only place a role influences grants.
pub async fn create(
	pool: &SqlitePool,
	new: NewUser<'_>,
	permissions: Option<Vec<String>>,
) -> AppResult<UserDetail> {
	let mut tx = pool.begin().await?;

	ensure_email_available(&mut tx, new.email, None).await?;

	let now = utc_now();
	let user_id = sqlx::query(
		"INSERT INTO users (name, email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
	)
	.bind(new.name)
	.bind(new.email)
	.bind(&new.password_hash)
	.bind(new.role.as_str())
	.bind(now)
	.bind(now)
	.execute(&mut *tx)
	.await?
	.last_insert_rowid();

	let names = permissions.unwrap_or_else(|| new.role.default_permissions());
	let grants = grants::replace(&mut tx, user_id, &names).await?;
	let user = fetch_required(&mut tx, user_id).await?;

	tx.commit().await?;

	Ok(UserDetail {
		user: user.try_into()?,
		permissions: grants,
	})
}
