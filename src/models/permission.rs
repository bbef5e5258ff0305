use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::events::{Loggable, Severity};

// =============================================================================
// CATALOG
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Permission {
    pub id: i64,
    #[schema(example = "prestasi.siswa.provinsi.create")]
    pub name: String,
    /// Grouping label for the admin UI; never consulted when matching.
    #[schema(example = "prestasi")]
    pub resource: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Loggable for Permission {
    fn entity_type() -> &'static str { "permission" }
    fn subject_id(&self) -> i64 { self.id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionCreateRequest {
    #[schema(example = "program.jurusan.TKR.view")]
    pub name: String,
    /// Defaults to the first segment of the name.
    #[schema(example = "program")]
    pub resource: Option<String>,
    #[schema(example = "View the TKR study program")]
    pub description: Option<String>,
}

// =============================================================================
// GRANTS
// =============================================================================

/// A permission currently held by a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Grant {
    pub user_id: i64,
    pub permission_id: i64,
    #[schema(example = "prestasi.siswa.*")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Loggable for Grant {
    fn entity_type() -> &'static str { "grant" }
    fn subject_id(&self) -> i64 { self.user_id }
    fn severity(&self) -> Severity { Severity::Critical }
}

/// The full grant list of a user after a bulk replace.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GrantSetChange {
    pub user_id: i64,
    pub permissions: Vec<String>,
}

impl Loggable for GrantSetChange {
    fn entity_type() -> &'static str { "grant" }
    fn subject_id(&self) -> i64 { self.user_id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantPermissionRequest {
    #[schema(example = "prestasi.siswa.*")]
    pub permission: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplacePermissionsRequest {
    #[schema(example = json!(["prestasi.siswa.*", "users.view"]))]
    pub permissions: Vec<String>,
}

// =============================================================================
// CHECKS
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckRequest {
    /// Allowed when any one of these is covered by the caller's grants.
    #[schema(example = json!(["prestasi.siswa.*", "prestasi.guru.*"]))]
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckResponse {
    pub allowed: bool,
}
