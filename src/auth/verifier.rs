use axum::http::{header, HeaderMap};
use std::sync::Arc;

use super::accounts::AccountStore;
use super::{decode_jwt, TokenError};
use crate::error::ApiError;
use crate::types::{Principal, Role};

/// Resolves a bearer credential to a [`Principal`] using current account state.
#[derive(Clone)]
pub struct CredentialVerifier {
    secret: Option<Arc<str>>,
    accounts: Arc<dyn AccountStore>,
}

impl CredentialVerifier {
    pub fn new(secret: Option<String>, accounts: Arc<dyn AccountStore>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()).map(Arc::from),
            accounts,
        }
    }

    pub async fn verify(&self, headers: &HeaderMap) -> Result<Principal, ApiError> {
        let token = extract_bearer(headers)?;

        let secret = self.secret.as_deref().ok_or_else(|| {
            tracing::error!("JWT_SECRET is not configured; refusing to verify credentials");
            ApiError::internal_error("Authentication is not configured")
        })?;

        let claims = decode_jwt(secret, token).map_err(|e| match e {
            TokenError::Expired => ApiError::token_expired("Token has expired"),
            TokenError::MissingSecret => ApiError::internal_error("Authentication is not configured"),
            other => {
                tracing::debug!("Rejected credential: {}", other);
                ApiError::token_invalid("Invalid token")
            }
        })?;
        let user_id = claims
            .subject_id()
            .map_err(|_| ApiError::token_invalid("Invalid token"))?;

        let account = self
            .accounts
            .find_account(user_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Credential subject {} no longer exists", user_id);
                ApiError::user_not_found("User not found")
            })?;

        if !account.is_active {
            tracing::warn!("Credential subject {} is deactivated", user_id);
            return Err(ApiError::user_inactive("User account is inactive"));
        }

        // Stored role wins over whatever the token claimed at issuance
        let role = Role::from_db(&account.role).ok_or_else(|| {
            tracing::warn!("User {} with role '{}' attempted admin access", user_id, account.role);
            ApiError::forbidden("Administrator access required")
        })?;

        tracing::debug!("Authenticated user {} as {}", account.id, role);
        Ok(Principal::new(account.id, role))
    }
}

/// A credential verifier plus a minimum privilege tier.
///
/// Verifier failures pass through unchanged; only a successfully resolved
/// principal below `minimum` becomes `Forbidden`.
#[derive(Clone)]
pub struct AccessGate {
    verifier: CredentialVerifier,
    minimum: Role,
}

impl AccessGate {
    pub fn new(verifier: CredentialVerifier, minimum: Role) -> Self {
        Self { verifier, minimum }
    }

    pub fn super_admin(verifier: CredentialVerifier) -> Self {
        Self::new(verifier, Role::SuperAdmin)
    }

    pub fn minimum(&self) -> Role {
        self.minimum
    }

    pub async fn check(&self, headers: &HeaderMap) -> Result<Principal, ApiError> {
        let principal = self.verifier.verify(headers).await?;

        if !principal.has_at_least(self.minimum) {
            tracing::warn!(
                "User {} ({}) denied: {} required",
                principal.id,
                principal.role,
                self.minimum
            );
            return Err(ApiError::forbidden(format!("{} access required", self.minimum)));
        }

        Ok(principal)
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or_else(|| ApiError::unauthorized("Authorization header must use Bearer token format"))?
        .trim();

    if token.is_empty() {
        return Err(ApiError::unauthorized("Empty bearer token"));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_jwt, Claims};
    use crate::database::models::AccountRecord;
    use crate::database::DatabaseError;
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SECRET: &str = "verifier-secret";

    #[derive(Default)]
    struct StubAccounts {
        rows: HashMap<i64, AccountRecord>,
        lookups: AtomicUsize,
        unavailable: bool,
    }

    impl StubAccounts {
        fn with(rows: &[(i64, &str, bool)]) -> Self {
            Self {
                rows: rows
                    .iter()
                    .map(|(id, role, active)| {
                        (*id, AccountRecord { id: *id, role: role.to_string(), is_active: *active })
                    })
                    .collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl AccountStore for StubAccounts {
        async fn find_account(&self, id: i64) -> Result<Option<AccountRecord>, DatabaseError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Err(DatabaseError::Unavailable("connection refused".into()));
            }
            Ok(self.rows.get(&id).cloned())
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());
        headers
    }

    fn token_for(id: i64, claimed: Option<Role>) -> String {
        generate_jwt(SECRET, &Claims::new(id, claimed, Duration::hours(1))).unwrap()
    }

    fn verifier(store: Arc<StubAccounts>) -> CredentialVerifier {
        CredentialVerifier::new(Some(SECRET.to_string()), store)
    }

    #[tokio::test]
    async fn stored_role_overrides_token_claim() {
        // Token issued while user 5 was a super admin; they have since been demoted
        let store = Arc::new(StubAccounts::with(&[(5, "admin", true)]));
        let principal = verifier(store.clone())
            .verify(&bearer(&token_for(5, Some(Role::SuperAdmin))))
            .await
            .unwrap();
        assert_eq!(principal, Principal::new(5, Role::Admin));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);

        let gate = AccessGate::super_admin(verifier(store));
        let err = gate.check(&bearer(&token_for(5, Some(Role::SuperAdmin)))).await.unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_unauthorized() {
        let v = verifier(Arc::new(StubAccounts::default()));
        assert_eq!(v.verify(&HeaderMap::new()).await.unwrap_err().error_code(), "UNAUTHORIZED");

        let mut basic = HeaderMap::new();
        basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(v.verify(&basic).await.unwrap_err().error_code(), "UNAUTHORIZED");

        assert_eq!(v.verify(&bearer("  ")).await.unwrap_err().error_code(), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn token_failures_are_classified() {
        let store = Arc::new(StubAccounts::with(&[(1, "admin", true)]));
        let v = verifier(store.clone());

        let expired = generate_jwt(SECRET, &Claims::new(1, None, Duration::hours(-3))).unwrap();
        assert_eq!(v.verify(&bearer(&expired)).await.unwrap_err().error_code(), "TOKEN_EXPIRED");

        let forged = generate_jwt("other-secret", &Claims::new(1, None, Duration::hours(1))).unwrap();
        assert_eq!(v.verify(&bearer(&forged)).await.unwrap_err().error_code(), "TOKEN_INVALID");

        assert_eq!(v.verify(&bearer("garbage")).await.unwrap_err().error_code(), "TOKEN_INVALID");
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn account_state_is_checked() {
        let store = Arc::new(StubAccounts::with(&[(2, "admin", false), (3, "user", true)]));
        let v = verifier(store);

        assert_eq!(v.verify(&bearer(&token_for(99, None))).await.unwrap_err().error_code(), "USER_NOT_FOUND");
        assert_eq!(v.verify(&bearer(&token_for(2, None))).await.unwrap_err().error_code(), "USER_INACTIVE");
        assert_eq!(
            v.verify(&bearer(&token_for(3, Some(Role::Admin)))).await.unwrap_err().error_code(),
            "FORBIDDEN"
        );
    }

    #[tokio::test]
    async fn missing_secret_is_internal_error() {
        let v = CredentialVerifier::new(None, Arc::new(StubAccounts::with(&[(1, "admin", true)])));
        let token = token_for(1, None);
        assert_eq!(v.verify(&bearer(&token)).await.unwrap_err().error_code(), "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn gate_propagates_verifier_errors_unchanged() {
        let store = Arc::new(StubAccounts::with(&[(2, "super_admin", false)]));
        let v = verifier(store);
        let gate = AccessGate::super_admin(v.clone());

        let cases = vec![
            HeaderMap::new(),
            bearer("garbage"),
            bearer(&generate_jwt(SECRET, &Claims::new(2, None, Duration::hours(-3))).unwrap()),
            bearer(&token_for(404, None)),
            bearer(&token_for(2, None)),
        ];
        for headers in cases {
            let direct = v.verify(&headers).await.unwrap_err();
            let gated = gate.check(&headers).await.unwrap_err();
            assert_eq!(direct, gated);
        }
    }

    #[tokio::test]
    async fn storage_outage_is_not_masked() {
        let store = Arc::new(StubAccounts { unavailable: true, ..StubAccounts::with(&[(1, "admin", true)]) });
        let err = verifier(store).verify(&bearer(&token_for(1, None))).await.unwrap_err();
        assert_eq!(err.error_code(), "DB_UNAVAILABLE");
    }

    #[tokio::test]
    async fn super_admin_passes_gate() {
        let store = Arc::new(StubAccounts::with(&[(8, "super_admin", true)]));
        let gate = AccessGate::super_admin(verifier(store));
        let principal = gate.check(&bearer(&token_for(8, None))).await.unwrap();
        assert_eq!(principal.role, Role::SuperAdmin);
        assert_eq!(gate.minimum(), Role::SuperAdmin);
    }
}
