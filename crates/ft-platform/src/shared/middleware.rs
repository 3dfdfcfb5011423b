//! API Middleware
//!
//! Request authentication for Axum. [`AuthGate`] turns an `authorization`
//! header into an [`Authenticated`] value; handlers and the ownership
//! guard take that value as an argument, so an unauthenticated request
//! never reaches them.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Duration;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

use crate::auth::password_service::PasswordService;
use crate::auth::token::{Payload, TokenMaker};
use crate::shared::error::{CredentialError, PlatformError, PrincipalError, Result};
use crate::shared::ownership::OwnershipGuard;
use crate::store::{BudgetStore, LedgerStore, ResourceOwnerLookup, UserLookup, UserStore};
use crate::user::entity::Principal;

/// The only accepted authorization scheme
pub const BEARER_SCHEME: &str = "bearer";

/// Split an authorization header value into its credential.
///
/// The value must be exactly `<scheme> <credential>` with the scheme equal
/// to `bearer`.
pub fn parse_authorization_header(value: &str) -> std::result::Result<&str, CredentialError> {
    if value.is_empty() {
        return Err(CredentialError::Missing);
    }

    let fields: Vec<&str> = value.split_whitespace().collect();
    let [scheme, credential] = fields.as_slice() else {
        return Err(CredentialError::Malformed);
    };

    if *scheme != BEARER_SCHEME {
        return Err(CredentialError::UnsupportedScheme { scheme: scheme.to_string() });
    }

    Ok(*credential)
}

/// A request whose session token verified and whose principal exists.
///
/// Only [`AuthGate`] constructs this.
#[derive(Debug, Clone)]
pub struct Authenticated {
    principal: Principal,
    payload: Payload,
}

impl Authenticated {
    pub(crate) fn new(principal: Principal, payload: Payload) -> Self {
        Self { principal, payload }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn username(&self) -> &str {
        &self.principal.username
    }
}

impl Deref for Authenticated {
    type Target = Principal;

    fn deref(&self) -> &Self::Target {
        &self.principal
    }
}

/// Verifies the caller's session token and resolves its principal.
#[derive(Clone)]
pub struct AuthGate {
    token_maker: Arc<dyn TokenMaker>,
    users: Arc<dyn UserLookup>,
}

impl AuthGate {
    pub fn new(token_maker: Arc<dyn TokenMaker>, users: Arc<dyn UserLookup>) -> Self {
        Self { token_maker, users }
    }

    /// Run the pipeline against a raw header value, stopping at the first failure.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Authenticated> {
        let result = self.run(header).await;
        if let Err(e) = &result {
            debug!(kind = e.kind(), "Request authentication rejected");
        }
        result
    }

    async fn run(&self, header: Option<&str>) -> Result<Authenticated> {
        let header = header.ok_or(CredentialError::Missing)?;
        let token = parse_authorization_header(header)?;
        let payload = self.token_maker.verify_token(token)?;

        let user = self
            .users
            .find_by_username(&payload.username)
            .await
            .map_err(|e| PlatformError::lookup_failed(e.to_string()))?
            .ok_or(PrincipalError::UnknownPrincipal)?;

        Ok(Authenticated::new(Principal::from(&user), payload))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
    AuthGate: FromRef<S>,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let gate = AuthGate::from_ref(state);

        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| CredentialError::Malformed)?),
            None => None,
        };

        gate.authenticate(header).await
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub auth_gate: AuthGate,
    pub ownership_guard: OwnershipGuard,
    pub token_maker: Arc<dyn TokenMaker>,
    pub password_service: Arc<PasswordService>,
    pub users: Arc<dyn UserStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub budgets: Arc<dyn BudgetStore>,
    pub access_token_ttl: Duration,
}

impl AppState {
    pub fn new<U, L, B>(
        token_maker: Arc<dyn TokenMaker>,
        password_service: Arc<PasswordService>,
        users: Arc<U>,
        ledger: Arc<L>,
        budgets: Arc<B>,
        access_token_ttl: Duration,
    ) -> Self
    where
        U: UserStore + 'static,
        L: LedgerStore + 'static,
        B: BudgetStore + 'static,
    {
        let user_lookup: Arc<dyn UserLookup> = users.clone();
        let owner_lookup: Arc<dyn ResourceOwnerLookup> = ledger.clone();

        Self {
            auth_gate: AuthGate::new(token_maker.clone(), user_lookup),
            ownership_guard: OwnershipGuard::new(owner_lookup),
            token_maker,
            password_service,
            users,
            ledger,
            budgets,
            access_token_ttl,
        }
    }
}

impl FromRef<AppState> for AuthGate {
    fn from_ref(state: &AppState) -> Self {
        state.auth_gate.clone()
    }
}

impl FromRef<AppState> for OwnershipGuard {
    fn from_ref(state: &AppState) -> Self {
        state.ownership_guard.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::JwtMaker;
    use crate::shared::error::InfrastructureError;
    use crate::store::{InMemoryStore, StoreError, StoreResult, UserStore};
    use crate::user::entity::{NewUser, User};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    struct FailingLookup;

    #[async_trait]
    impl UserLookup for FailingLookup {
        async fn find_by_username(&self, _username: &str) -> StoreResult<Option<User>> {
            Err(StoreError::Backend("connection refused".into()))
        }
    }

    async fn gate_with_user(username: &str) -> (AuthGate, Arc<JwtMaker>) {
        let maker = Arc::new(JwtMaker::new(SECRET).unwrap());
        let store = Arc::new(InMemoryStore::new());
        UserStore::insert(
            store.as_ref(),
            NewUser {
                username: username.into(),
                name: "Alice".into(),
                email: format!("{}@example.com", username),
                phone: "0812345678".into(),
                password_hash: "hash".into(),
            },
        )
        .await
        .unwrap();
        (AuthGate::new(maker.clone(), store), maker)
    }

    #[test]
    fn test_parse_authorization_header() {
        assert_eq!(parse_authorization_header("bearer abc"), Ok("abc"));
        assert_eq!(
            parse_authorization_header("Bearer abc"),
            Err(CredentialError::UnsupportedScheme { scheme: "Bearer".into() })
        );
        assert_eq!(parse_authorization_header("abc"), Err(CredentialError::Malformed));
        assert_eq!(parse_authorization_header("bearer a b"), Err(CredentialError::Malformed));
        assert_eq!(parse_authorization_header("   "), Err(CredentialError::Malformed));
        assert_eq!(parse_authorization_header(""), Err(CredentialError::Missing));
    }

    #[tokio::test]
    async fn test_missing_and_malformed_headers() {
        let (gate, _) = gate_with_user("alice").await;

        let missing = gate.authenticate(None).await.unwrap_err();
        assert_eq!(missing.kind(), "MISSING_CREDENTIALS");

        let basic = gate.authenticate(Some("basic dXNlcjpwYXNz")).await.unwrap_err();
        assert_eq!(basic.kind(), "UNSUPPORTED_SCHEME");

        let garbage = gate.authenticate(Some("bearer not-a-token")).await.unwrap_err();
        assert_eq!(garbage.kind(), "INVALID_SIGNATURE");
    }

    #[tokio::test]
    async fn test_valid_token_resolves_principal() {
        let (gate, maker) = gate_with_user("alice").await;
        let (token, payload) = maker.create_token("alice", Duration::minutes(5)).unwrap();

        let auth = gate.authenticate(Some(&format!("bearer {}", token))).await.unwrap();
        assert_eq!(auth.username(), "alice");
        assert_eq!(auth.payload(), &payload);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let (gate, maker) = gate_with_user("alice").await;
        let (token, _) = maker.create_token("alice", Duration::seconds(-1)).unwrap();

        let err = gate.authenticate(Some(&format!("bearer {}", token))).await.unwrap_err();
        assert!(matches!(err, PlatformError::Credential(CredentialError::ExpiredToken)));
    }

    #[tokio::test]
    async fn test_deleted_user_is_unknown_principal() {
        let (gate, maker) = gate_with_user("alice").await;
        let (token, _) = maker.create_token("mallory", Duration::minutes(5)).unwrap();

        let err = gate.authenticate(Some(&format!("bearer {}", token))).await.unwrap_err();
        assert!(matches!(err, PlatformError::Principal(PrincipalError::UnknownPrincipal)));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_infrastructure_error() {
        let maker = Arc::new(JwtMaker::new(SECRET).unwrap());
        let gate = AuthGate::new(maker.clone(), Arc::new(FailingLookup));
        let (token, _) = maker.create_token("alice", Duration::minutes(5)).unwrap();

        let err = gate.authenticate(Some(&format!("bearer {}", token))).await.unwrap_err();
        assert!(matches!(
            err,
            PlatformError::Infrastructure(InfrastructureError::LookupFailed { .. })
        ));
        assert!(!err.is_client_error());
    }
}
