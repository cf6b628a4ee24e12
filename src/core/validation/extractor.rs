//! Axum extractor for validated request bodies
//!
//! `ValidatedJson<T>` deserializes the body and runs the `validator` rules
//! declared on `T` before the handler sees it.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::core::error::{ValidationError, WorkshopError};

/// Axum extractor that parses and validates a JSON payload
///
/// # Usage
///
/// ```rust,ignore
/// pub async fn create_part(
///     ValidatedJson(payload): ValidatedJson<CreatePart>,
/// ) -> WorkshopResult<impl IntoResponse> {
///     // payload passed every #[validate(...)] rule
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = WorkshopError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state).await.map_err(|e| {
            WorkshopError::from(ValidationError::InvalidJson {
                message: e.body_text(),
            })
        })?;

        payload.validate()?;
        Ok(ValidatedJson(payload))
    }
}
