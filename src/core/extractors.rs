//! Axum extractors for entity ids in request paths
//!
//! Path segments are taken as raw strings and parsed here so that a
//! malformed id becomes a `ValidationError` (400) with the usual error body
//! instead of axum's plain-text rejection.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use uuid::Uuid;

use crate::core::error::{ValidationError, WorkshopError, WorkshopResult};

/// Parse an entity id from a path segment
pub fn parse_id(raw: &str) -> WorkshopResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        ValidationError::InvalidUuid {
            value: raw.to_string(),
        }
        .into()
    })
}

fn path_error(e: impl std::fmt::Display) -> WorkshopError {
    ValidationError::InvalidUuid {
        value: e.to_string(),
    }
    .into()
}

/// Extractor for a single `{id}` path parameter
#[derive(Debug, Clone, Copy)]
pub struct EntityId(pub Uuid);

impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = WorkshopError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(path_error)?;
        parse_id(&raw).map(EntityId)
    }
}

/// Extractor for a ticket id followed by a related id
///
/// Matches routes like `/service-tickets/{id}/assign-mechanic/{mechanic_id}`.
#[derive(Debug, Clone, Copy)]
pub struct IdPair(pub Uuid, pub Uuid);

impl<S> FromRequestParts<S> for IdPair
where
    S: Send + Sync,
{
    type Rejection = WorkshopError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((first, second)) = Path::<(String, String)>::from_request_parts(parts, state)
            .await
            .map_err(path_error)?;
        Ok(IdPair(parse_id(&first)?, parse_id(&second)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        let err = parse_id("not-a-uuid").unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("not-a-uuid"));
    }
}
