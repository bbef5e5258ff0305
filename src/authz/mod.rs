//! Authorization engine.
//!
//! Decides whether a principal may use a permission name, based only on the
//! names granted to that principal:
//! - `matcher` reconciles a granted name with a required one (`*` wildcard)
//! - `grants` loads a principal's grant set from storage
//! - `evaluator` answers `has_permission` / `has_any_permission` with one
//!   storage read per request
//! - `extract` binds an evaluator to the authenticated request
//!
//! Roles only seed the grant list of new accounts and take no part in a
//! decision.

pub mod catalog;
mod evaluator;
mod extract;
mod grants;
pub mod matcher;
pub mod name;
pub mod roles;

pub use evaluator::PermissionEvaluator;
pub use extract::Authz;
pub use grants::{GrantSet, GrantStore, GrantStoreError, SqliteGrantStore};
pub use matcher::matches;
pub use name::{Action, PermissionName, Resource};
pub use roles::Role;

/// Why a decision could not be made.
///
/// An ordinary denial is `Ok(false)`, never one of these.
#[derive(thiserror::Error, Debug)]
pub enum AuthzError {
    /// No live principal behind the request.
    #[error("principal is not authenticated")]
    Unauthenticated,
    /// Grants could not be read; the action must not proceed.
    #[error("permission evaluation failed: {0}")]
    EvaluationFailed(#[source] GrantStoreError),
}

/// Catalog management permissions
pub mod permissions {
    pub const PERMISSIONS_VIEW: &str = "permissions.view";
    pub const PERMISSIONS_CREATE: &str = "permissions.create";
    pub const PERMISSIONS_DELETE: &str = "permissions.delete";
}
