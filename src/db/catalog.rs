use sqlx::SqlitePool;

use crate::authz::catalog::well_known;
use crate::utils::utc_now;

/// Inserts any missing built-in catalog entries and returns how many were added.
///
/// Existing rows, including operator-created ones, are left untouched.
pub async fn seed(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
	let mut tx = pool.begin().await?;
	let now = utc_now();
	let mut inserted = 0;

	for entry in well_known() {
		let result = sqlx::query(
			"INSERT OR IGNORE INTO permissions (name, resource, description, created_at) VALUES (?, ?, ?, ?)",
		)
		.bind(&entry.name)
		.bind(entry.resource.as_str())
		.bind(&entry.description)
		.bind(now)
		.execute(&mut *tx)
		.await?;

		inserted += result.rows_affected();
	}

	tx.commit().await?;
	Ok(inserted)
}
