//! Resource Ownership
//!
//! Confirms that the resource named in a request path belongs to the
//! authenticated principal before a resource-scoped handler runs.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Path},
    http::request::Parts,
};
use std::sync::Arc;
use tracing::debug;

use crate::shared::error::{OwnershipError, PlatformError, Result};
use crate::shared::middleware::{AuthGate, Authenticated};
use crate::store::ResourceOwnerLookup;

/// Parse a path identifier; only positive integers are valid.
pub fn parse_resource_id(raw: &str) -> std::result::Result<i64, OwnershipError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(OwnershipError::InvalidIdentifier),
    }
}

#[derive(Clone)]
pub struct OwnershipGuard {
    owners: Arc<dyn ResourceOwnerLookup>,
}

impl OwnershipGuard {
    pub fn new(owners: Arc<dyn ResourceOwnerLookup>) -> Self {
        Self { owners }
    }

    /// Returns the parsed id once the resource is confirmed to belong to `auth`.
    pub async fn check(&self, auth: &Authenticated, raw_id: &str) -> Result<i64> {
        let id = parse_resource_id(raw_id)?;

        let owner = self
            .owners
            .find_owner(id)
            .await
            .map_err(|e| PlatformError::lookup_failed(e.to_string()))?
            .ok_or(OwnershipError::ResourceNotFound)?;

        if owner != auth.username() {
            debug!(resource_id = id, principal = %auth.username(), "Ownership check failed");
            return Err(OwnershipError::Violation.into());
        }

        Ok(id)
    }
}

/// A resource id from the request path, owned by the authenticated caller.
#[derive(Debug, Clone)]
pub struct OwnedEntry {
    pub id: i64,
    pub auth: Authenticated,
}

#[async_trait]
impl<S> FromRequestParts<S> for OwnedEntry
where
    S: Send + Sync,
    AuthGate: FromRef<S>,
    OwnershipGuard: FromRef<S>,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let auth = Authenticated::from_request_parts(parts, state).await?;

        let Path(raw_id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| OwnershipError::InvalidIdentifier)?;

        let id = OwnershipGuard::from_ref(state).check(&auth, &raw_id).await?;
        Ok(Self { id, auth })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::Payload;
    use crate::ledger::entity::EntryChange;
    use crate::store::{InMemoryStore, LedgerStore};
    use crate::user::entity::Principal;
    use chrono::Duration;

    fn authenticated(username: &str) -> Authenticated {
        let payload = Payload::new(username, Duration::minutes(5)).unwrap();
        Authenticated::new(Principal { username: username.into() }, payload)
    }

    async fn guard_with_entry(owner: &str) -> (OwnershipGuard, i64) {
        let store = Arc::new(InMemoryStore::new());
        let entry = LedgerStore::insert(store.as_ref(), owner, EntryChange::from_signed(-100, 2).unwrap())
            .await
            .unwrap();
        (OwnershipGuard::new(store), entry.id)
    }

    #[test]
    fn test_parse_resource_id() {
        assert_eq!(parse_resource_id("42"), Ok(42));
        assert_eq!(parse_resource_id("0"), Err(OwnershipError::InvalidIdentifier));
        assert_eq!(parse_resource_id("-3"), Err(OwnershipError::InvalidIdentifier));
        assert_eq!(parse_resource_id("abc"), Err(OwnershipError::InvalidIdentifier));
        assert_eq!(parse_resource_id(""), Err(OwnershipError::InvalidIdentifier));
    }

    #[tokio::test]
    async fn test_owner_passes() {
        let (guard, id) = guard_with_entry("alice").await;
        let checked = guard.check(&authenticated("alice"), &id.to_string()).await.unwrap();
        assert_eq!(checked, id);
    }

    #[tokio::test]
    async fn test_other_user_is_violation() {
        let (guard, id) = guard_with_entry("alice").await;
        let err = guard.check(&authenticated("bob"), &id.to_string()).await.unwrap_err();
        assert!(matches!(err, PlatformError::Ownership(OwnershipError::Violation)));
    }

    #[tokio::test]
    async fn test_missing_resource_is_not_found() {
        let (guard, _) = guard_with_entry("alice").await;
        let err = guard.check(&authenticated("alice"), "999").await.unwrap_err();
        assert!(matches!(err, PlatformError::Ownership(OwnershipError::ResourceNotFound)));
    }

    #[tokio::test]
    async fn test_lookup_failure_surfaces() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_with("timeout");
        let guard = OwnershipGuard::new(store);

        let err = guard.check(&authenticated("alice"), "1").await.unwrap_err();
        assert_eq!(err.kind(), "LOOKUP_FAILED");
    }
}
