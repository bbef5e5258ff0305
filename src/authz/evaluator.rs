use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use super::grants::{GrantSet, GrantStore};
use super::AuthzError;

type GrantCell = Arc<OnceCell<Arc<GrantSet>>>;

/// Answers "may principal P use permission R" for one request context.
///
/// Grant sets are fetched from the store at most once per principal for the
/// lifetime of the evaluator and reused by every later query. Create one
/// evaluator per request so that grant changes are picked up by the next
/// request. A failed fetch is not cached; the next query tries the store
/// again.
pub struct PermissionEvaluator {
    store: Arc<dyn GrantStore>,
    cache: Mutex<HashMap<i64, GrantCell>>,
}

impl PermissionEvaluator {
    pub fn new(store: Arc<dyn GrantStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The principal's grant set, loading it on first use.
    pub async fn grants(&self, principal_id: i64) -> Result<Arc<GrantSet>, AuthzError> {
        let cell = {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cache.entry(principal_id).or_default())
        };

        cell.get_or_try_init(|| async {
            match self.store.load_grants(principal_id).await {
                Ok(Some(grants)) => {
                    tracing::debug!(user_id = principal_id, grants = grants.len(), "grants loaded");
                    Ok(Arc::new(grants))
                }
                Ok(None) => {
                    tracing::debug!(user_id = principal_id, "principal not found");
                    Err(AuthzError::Unauthenticated)
                }
                Err(err) => {
                    tracing::error!(user_id = principal_id, error = %err, "failed to load grants");
                    Err(AuthzError::EvaluationFailed(err))
                }
            }
        })
        .await
        .map(Arc::clone)
    }

    /// Whether any grant of the principal covers `required`.
    ///
    /// The principal is resolved before the requirement is looked at, so an
    /// unknown principal always surfaces as `Unauthenticated`. Blank
    /// requirements are denied.
    pub async fn has_permission(&self, principal_id: i64, required: &str) -> Result<bool, AuthzError> {
        let grants = self.grants(principal_id).await?;

        if grants.is_empty() {
            tracing::debug!(user_id = principal_id, permission = %required, "no grants");
            return Ok(false);
        }

        match grants.covering(required) {
            Some(granted) => {
                tracing::debug!(
                    user_id = principal_id,
                    permission = %required,
                    granted = %granted,
                    "permission granted"
                );
                Ok(true)
            }
            None => {
                tracing::debug!(user_id = principal_id, permission = %required, "permission denied");
                Ok(false)
            }
        }
    }

    /// Whether the principal holds at least one of `required`.
    ///
    /// Evaluated against a single grant fetch, stopping at the first hit. An
    /// empty list is denied.
    pub async fn has_any_permission<S: AsRef<str>>(
        &self,
        principal_id: i64,
        required: &[S],
    ) -> Result<bool, AuthzError> {
        let grants = self.grants(principal_id).await?;

        for candidate in required {
            let candidate: &str = candidate.as_ref();
            if let Some(granted) = grants.covering(candidate) {
                tracing::debug!(
                    user_id = principal_id,
                    permission = %candidate,
                    granted = %granted,
                    "permission granted"
                );
                return Ok(true);
            }
        }

        tracing::debug!(user_id = principal_id, candidates = required.len(), "no permission matched");
        Ok(false)
    }
}

impl std::fmt::Debug for PermissionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.cache.lock().map(|c| c.len()).unwrap_or_default();
        f.debug_struct("PermissionEvaluator")
            .field("cached_principals", &cached)
            .finish()
    }
}
