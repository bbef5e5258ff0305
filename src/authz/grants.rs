use async_trait::async_trait;
use sqlx::SqlitePool;

use super::matcher::matches;

/// The permission names a principal holds at the moment it was loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantSet {
    names: Vec<String>,
}

impl GrantSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// First granted name that reconciles with `required`, if any.
    ///
    /// A blank requirement is never covered.
    pub fn covering(&self, required: &str) -> Option<&str> {
        if required.trim().is_empty() {
            return None;
        }

        self.names
            .iter()
            .find(|granted| matches(granted, required))
            .map(String::as_str)
    }

    pub fn covers(&self, required: &str) -> bool {
        self.covering(required).is_some()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GrantStoreError {
    #[error("grant query failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("grant store unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the user-to-permission association.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Loads every permission name granted to `principal_id`.
    ///
    /// Returns `Ok(None)` when the principal does not exist or has been
    /// deleted, which is distinct from an existing principal with no grants.
    async fn load_grants(&self, principal_id: i64) -> Result<Option<GrantSet>, GrantStoreError>;
}

/// Grant store backed by the `user_permissions` table.
///
/// Grants are joined through `permissions`, so a grant whose catalog row has
/// gone away is simply not returned.
#[derive(Debug, Clone)]
pub struct SqliteGrantStore {
    pool: SqlitePool,
}

impl SqliteGrantStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GrantStore for SqliteGrantStore {
    async fn load_grants(&self, principal_id: i64) -> Result<Option<GrantSet>, GrantStoreError> {
        let rows: Vec<(i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT u.id, p.name
            FROM users u
            LEFT JOIN user_permissions up ON up.user_id = u.id
            LEFT JOIN permissions p ON p.id = up.permission_id
            WHERE u.id = ? AND u.deleted_at IS NULL
            ORDER BY p.name
            "#,
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(GrantSet::new(rows.into_iter().filter_map(|(_, name)| name))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_covers_nothing() {
        let grants = GrantSet::default();
        assert!(grants.is_empty());
        assert!(!grants.covers("anything.at.all"));
        assert!(!grants.covers("users.*"));
    }

    #[test]
    fn covering_reports_the_matching_grant() {
        let grants = GrantSet::new(["users.view", "prestasi.siswa.*"]);
        assert_eq!(grants.covering("prestasi.siswa.nasional.delete"), Some("prestasi.siswa.*"));
        assert_eq!(grants.covering("users.view"), Some("users.view"));
        assert_eq!(grants.covering("users.edit"), None);
    }

    #[test]
    fn blank_requirements_are_denied() {
        let grants = GrantSet::new(["*"]);
        assert!(grants.covers("users.view"));
        assert!(!grants.covers(""));
        assert!(!grants.covers("   "));
    }
}
