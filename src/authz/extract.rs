use std::fmt::Display;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::{GrantSet, PermissionEvaluator};
use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;

/// Authenticated principal plus the request's permission evaluator.
///
/// The evaluator lives in the request extensions, so every `Authz` extracted
/// while handling one request shares a single grant fetch.
#[derive(Debug, Clone)]
pub struct Authz {
    user_id: i64,
    evaluator: Arc<PermissionEvaluator>,
}

#[async_trait]
impl FromRequestParts<AppState> for Authz {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        let evaluator = match parts.extensions.get::<Arc<PermissionEvaluator>>() {
            Some(existing) => Arc::clone(existing),
            None => {
                let evaluator = Arc::new(PermissionEvaluator::new(Arc::clone(&state.grants)));
                parts.extensions.insert(Arc::clone(&evaluator));
                evaluator
            }
        };

        Ok(Self {
            user_id: auth.user_id,
            evaluator,
        })
    }
}

impl Authz {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub async fn grants(&self) -> AppResult<Arc<GrantSet>> {
        Ok(self.evaluator.grants(self.user_id).await?)
    }

    pub async fn has_any_permission<S: AsRef<str>>(&self, required: &[S]) -> AppResult<bool> {
        Ok(self.evaluator.has_any_permission(self.user_id, required).await?)
    }

    /// Fails with 403 unless the principal holds `required`.
    pub async fn require(&self, required: impl Display) -> AppResult<()> {
        let required = required.to_string();
        if self.evaluator.has_permission(self.user_id, &required).await? {
            return Ok(());
        }

        tracing::warn!(user_id = self.user_id, permission = %required, "access denied");
        Err(AppError::forbidden(format!("missing permission {required}")))
    }
}
