//! Email and password login shared by customers and mechanics

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::auth::{Principal, Role, TOKEN_TTL_SECS, TokenService};
use crate::core::entity::{Account, normalize_email};
use crate::core::error::{AuthError, WorkshopResult};
use crate::core::password::PasswordService;
use crate::core::service::DataService;

/// Body of `POST /api/{customers,mechanics}/login`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub id: Uuid,
    pub role: Role,
    pub expires_in: i64,
}

/// Check credentials and issue a token
///
/// Unknown email and wrong password both fail with `InvalidCredentials`
/// after the same amount of hashing work.
pub async fn login<T: Account>(
    accounts: &dyn DataService<T>,
    passwords: &PasswordService,
    tokens: &TokenService,
    request: LoginRequest,
) -> WorkshopResult<LoginResponse> {
    let email = normalize_email(&request.email);
    let account = accounts.search("email", &email).await?.into_iter().next();
    let stored = account.as_ref().map(|a| a.password_hash().to_string());

    let verified = passwords.verify(request.password, stored).await?;
    let Some(account) = account.filter(|_| verified) else {
        tracing::warn!(entity = T::resource_name_singular(), "rejected login");
        return Err(AuthError::InvalidCredentials.into());
    };

    let token = tokens.issue_token(Principal {
        id: account.id(),
        role: T::ROLE,
    })?;
    tracing::info!(entity = T::resource_name_singular(), id = %account.id(), "logged in");

    Ok(LoginResponse {
        message: "Login successful".to_string(),
        token,
        id: account.id(),
        role: T::ROLE,
        expires_in: TOKEN_TTL_SECS,
    })
}
