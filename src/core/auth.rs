//! Bearer token authentication
//!
//! Tokens are HS256 JWTs carrying the principal's id and role and expiring
//! one hour after issuance. Protected handlers take an [`Authenticated`]
//! extractor, which runs the [`Authenticator`] against the request headers
//! before the handler body executes, and then check an [`AuthPolicy`]
//! against the resulting [`Principal`].
//!
//! A valid signature is not enough: the account named by the token must
//! still exist, so a deleted mechanic loses its rights immediately.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{HeaderMap, header, request::Parts};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{AuthError, WorkshopError, WorkshopResult};

/// Lifetime of an issued token
pub const TOKEN_TTL_SECS: i64 = 3600;

/// The kind of account a token was issued to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Mechanic,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Mechanic => write!(f, "mechanic"),
        }
    }
}

/// The caller identified by a valid token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn customer(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Customer,
        }
    }

    pub fn mechanic(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Mechanic,
        }
    }

    pub fn is_mechanic(&self) -> bool {
        self.role == Role::Mechanic
    }
}

/// JWT payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates signed bearer tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Create a token service signing with the given secret
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for the principal, expiring one hour from now
    pub fn issue_token(&self, principal: Principal) -> WorkshopResult<String> {
        self.issue_token_at(principal, Utc::now())
    }

    /// Issue a token as if it had been created at `issued_at`
    pub fn issue_token_at(
        &self,
        principal: Principal,
        issued_at: DateTime<Utc>,
    ) -> WorkshopResult<String> {
        let claims = Claims {
            sub: principal.id,
            role: principal.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| WorkshopError::Internal(format!("token encoding failed: {e}")))
    }

    /// Verify a token and return the principal embedded in it
    pub fn validate_token(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            }
        })?;

        Ok(Principal {
            id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

/// Resolve the principal from an `Authorization: Bearer <token>` header
pub fn authenticate(headers: &HeaderMap, tokens: &TokenService) -> Result<Principal, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Err(AuthError::TokenMissing);
    };
    let value = value.to_str().map_err(|_| AuthError::TokenInvalid)?.trim();
    if value.is_empty() {
        return Err(AuthError::TokenMissing);
    }

    let token = match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        None if value.eq_ignore_ascii_case("bearer") => "",
        _ => return Err(AuthError::TokenInvalid),
    };
    if token.is_empty() {
        return Err(AuthError::TokenMissing);
    }

    tokens.validate_token(token)
}

/// Lookup of the accounts tokens are issued to
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Whether an account with the principal's id and role still exists
    async fn account_exists(&self, principal: &Principal) -> WorkshopResult<bool>;
}

/// Verifies bearer tokens against the signing key and the account store
#[derive(Clone)]
pub struct Authenticator {
    tokens: Arc<TokenService>,
    accounts: Arc<dyn AccountDirectory>,
}

impl Authenticator {
    pub fn new(tokens: Arc<TokenService>, accounts: Arc<dyn AccountDirectory>) -> Self {
        Self { tokens, accounts }
    }

    /// Resolve the caller of a request
    ///
    /// Fails with the token error for a missing, expired or forged token and
    /// with `Forbidden` when the account behind a valid token is gone.
    pub async fn verify(&self, headers: &HeaderMap) -> WorkshopResult<Principal> {
        let principal = authenticate(headers, &self.tokens)?;
        if !self.accounts.account_exists(&principal).await? {
            let reason = format!("{} account no longer exists", principal.role);
            return Err(AuthError::Forbidden(reason).into());
        }
        Ok(principal)
    }
}

/// Extractor guarding a handler behind a valid bearer token
///
/// ```rust,ignore
/// async fn my_tickets(Authenticated(principal): Authenticated) -> impl IntoResponse {
///     // principal.id is the caller
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Principal);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
    Authenticator: FromRef<S>,
{
    type Rejection = WorkshopError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = Authenticator::from_ref(state);
        match authenticator.verify(&parts.headers).await {
            Ok(principal) => Ok(Authenticated(principal)),
            Err(e) => {
                tracing::debug!(error = %e, path = %parts.uri.path(), "rejected bearer token");
                Err(e)
            }
        }
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone, Copy)]
pub enum AuthPolicy {
    /// Token issued to an account with this role
    HasRole(Role),

    /// Token issued to exactly this account
    Owner { id: Uuid, role: Role },
}

impl AuthPolicy {
    /// Check if the principal satisfies this policy
    pub fn check(&self, principal: &Principal) -> bool {
        match self {
            AuthPolicy::HasRole(role) => principal.role == *role,
            AuthPolicy::Owner { id, role } => principal.id == *id && principal.role == *role,
        }
    }

    /// Check the policy, turning a mismatch into `Forbidden`
    pub fn enforce(&self, principal: &Principal) -> Result<(), AuthError> {
        if self.check(principal) {
            return Ok(());
        }
        let reason = match self {
            AuthPolicy::HasRole(role) => format!("{role} access required"),
            AuthPolicy::Owner { .. } => "only the account owner may do this".to_string(),
        };
        Err(AuthError::Forbidden(reason))
    }
}

/// Shorthand for mechanic-only operations
pub fn require_mechanic(principal: &Principal) -> Result<(), AuthError> {
    AuthPolicy::HasRole(Role::Mechanic).enforce(principal)
}

/// Shorthand for operations on the caller's own account
pub fn require_self(principal: &Principal, id: Uuid, role: Role) -> Result<(), AuthError> {
    AuthPolicy::Owner { id, role }.enforce(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> TokenService {
        TokenService::new(b"unit-test-secret")
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_token_round_trip() {
        let tokens = service();
        let principal = Principal::customer(Uuid::new_v4());
        let token = tokens.issue_token(principal).unwrap();
        assert_eq!(tokens.validate_token(&token), Ok(principal));
    }

    #[test]
    fn test_expired_token() {
        let tokens = service();
        let principal = Principal::mechanic(Uuid::new_v4());
        let issued = Utc::now() - Duration::seconds(TOKEN_TTL_SECS + 5);
        let token = tokens.issue_token_at(principal, issued).unwrap();
        assert_eq!(tokens.validate_token(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_tampered_signature() {
        let tokens = service();
        let token = tokens
            .issue_token(Principal::customer(Uuid::new_v4()))
            .unwrap();
        let (head, sig) = token.rsplit_once('.').unwrap();
        let flipped = if sig.starts_with('A') { "B" } else { "A" };
        let tampered = format!("{head}.{flipped}{}", &sig[1..]);
        assert_eq!(
            tokens.validate_token(&tampered),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let token = TokenService::new(b"other-secret")
            .issue_token(Principal::customer(Uuid::new_v4()))
            .unwrap();
        assert_eq!(service().validate_token(&token), Err(AuthError::TokenInvalid));
        assert_eq!(service().validate_token("garbage"), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_authenticate_headers() {
        let tokens = service();
        let principal = Principal::mechanic(Uuid::new_v4());
        let token = tokens.issue_token(principal).unwrap();

        assert_eq!(
            authenticate(&HeaderMap::new(), &tokens),
            Err(AuthError::TokenMissing)
        );
        assert_eq!(
            authenticate(&bearer("Bearer "), &tokens),
            Err(AuthError::TokenMissing)
        );
        assert_eq!(
            authenticate(&bearer(&format!("Basic {token}")), &tokens),
            Err(AuthError::TokenInvalid)
        );
        assert_eq!(
            authenticate(&bearer(&format!("Bearer {token}")), &tokens),
            Ok(principal)
        );
    }

    struct Directory(Vec<Principal>);

    #[async_trait]
    impl AccountDirectory for Directory {
        async fn account_exists(&self, principal: &Principal) -> WorkshopResult<bool> {
            Ok(self.0.contains(principal))
        }
    }

    #[tokio::test]
    async fn test_verify_requires_existing_account() {
        let tokens = Arc::new(service());
        let known = Principal::mechanic(Uuid::new_v4());
        let gone = Principal::mechanic(Uuid::new_v4());
        let authenticator =
            Authenticator::new(tokens.clone(), Arc::new(Directory(vec![known])));

        let headers = bearer(&format!("Bearer {}", tokens.issue_token(known).unwrap()));
        assert_eq!(authenticator.verify(&headers).await.unwrap(), known);

        let headers = bearer(&format!("Bearer {}", tokens.issue_token(gone).unwrap()));
        let err = authenticator.verify(&headers).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);

        let err = authenticator.verify(&HeaderMap::new()).await.unwrap_err();
        assert_eq!(err.error_code(), "TOKEN_MISSING");
    }

    #[test]
    fn test_policy_check() {
        let id = Uuid::new_v4();
        let mechanic = Principal::mechanic(id);
        let customer = Principal::customer(id);

        assert!(AuthPolicy::HasRole(Role::Customer).check(&customer));
        assert!(require_mechanic(&mechanic).is_ok());
        assert!(matches!(
            require_mechanic(&customer),
            Err(AuthError::Forbidden(_))
        ));
        assert!(require_self(&customer, id, Role::Customer).is_ok());
        assert!(require_self(&customer, id, Role::Mechanic).is_err());
        assert!(require_self(&customer, Uuid::new_v4(), Role::Customer).is_err());
    }
}
