//! Typed error handling for the workshop API
//!
//! Every fallible operation in the domain returns a [`WorkshopError`]. The
//! variants group failures by category so that handlers and tests can match
//! on the precise case, while the HTTP layer turns any of them into a status
//! code plus a `{"error": ...}` body.
//!
//! # Error Categories
//!
//! - [`EntityError`]: missing records, uniqueness conflicts, delete blockers
//! - [`ValidationError`]: malformed or missing input
//! - [`AuthError`]: bearer token and credential failures, role mismatches
//! - [`StorageError`]: failures of the persistence engine itself
//!
//! # Example
//!
//! ```rust,ignore
//! match service.fetch(&id).await {
//!     Ok(mechanic) => println!("found {}", mechanic.name),
//!     Err(WorkshopError::Entity(EntityError::NotFound { id, .. })) => {
//!         println!("no mechanic {}", id);
//!     }
//!     Err(e) => return Err(e),
//! }
//! ```

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// The main error type for the workshop API
#[derive(Debug, Error)]
pub enum WorkshopError {
    /// Entity-related errors (CRUD and assignments)
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// Input validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Authentication and authorization errors
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Persistence engine errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Caller exceeded its request budget
    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// No route matches the request path
    #[error("No route for {path}")]
    RouteNotFound { path: String },

    /// The path exists, but not for this method
    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    /// Unexpected failure (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
    /// Error code for programmatic handling
    pub code: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl WorkshopError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkshopError::Entity(e) => e.status_code(),
            WorkshopError::Validation(_) => StatusCode::BAD_REQUEST,
            WorkshopError::Auth(e) => e.status_code(),
            WorkshopError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WorkshopError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            WorkshopError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            WorkshopError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            WorkshopError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            WorkshopError::Entity(e) => e.error_code(),
            WorkshopError::Validation(_) => "VALIDATION_ERROR",
            WorkshopError::Auth(e) => e.error_code(),
            WorkshopError::Storage(_) => "STORAGE_ERROR",
            WorkshopError::RateLimited { .. } => "RATE_LIMITED",
            WorkshopError::RouteNotFound { .. } => "ROUTE_NOT_FOUND",
            WorkshopError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            WorkshopError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the message may be shown to the caller
    ///
    /// Storage and internal failures are replaced by a generic message.
    pub fn is_internal(&self) -> bool {
        matches!(self, WorkshopError::Storage(_) | WorkshopError::Internal(_))
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        let error = if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        ErrorResponse {
            error,
            code: self.error_code().to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            WorkshopError::Entity(EntityError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id.to_string()
                }))
            }
            WorkshopError::Entity(EntityError::AlreadyExists {
                entity_type, field, ..
            }) => Some(serde_json::json!({
                "entity_type": entity_type,
                "field": field
            })),
            WorkshopError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            _ => None,
        }
    }

    /// Shorthand for a missing record
    pub fn not_found(entity_type: &str, id: Uuid) -> Self {
        EntityError::NotFound {
            entity_type: entity_type.to_string(),
            id,
        }
        .into()
    }

    /// Shorthand for a single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ValidationError::FieldError {
            field: field.to_string(),
            message: message.into(),
        }
        .into()
    }
}

impl IntoResponse for WorkshopError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_internal() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(self.to_response());
        let mut response = (status, body).into_response();

        if let WorkshopError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity operations
#[derive(Debug, Error)]
pub enum EntityError {
    /// No record with this id
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: Uuid },

    /// A unique field already holds this value
    #[error("{entity_type} with {field} '{value}' already exists")]
    AlreadyExists {
        entity_type: String,
        field: String,
        value: String,
    },

    /// Delete refused because other records still reference this one
    #[error("{entity_type} '{id}' still has {count} {dependents}")]
    HasDependents {
        entity_type: String,
        id: Uuid,
        dependents: String,
        count: usize,
    },
}

impl EntityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
            EntityError::AlreadyExists { .. } => StatusCode::CONFLICT,
            EntityError::HasDependents { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::AlreadyExists { .. } => "ENTITY_ALREADY_EXISTS",
            EntityError::HasDependents { .. } => "ENTITY_HAS_DEPENDENTS",
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Single field validation error
    #[error("Validation error for field '{field}': {message}")]
    FieldError { field: String, message: String },

    /// Multiple field validation errors
    #[error("Validation errors: {}", join_field_errors(.0))]
    FieldErrors(Vec<FieldValidationError>),

    /// Body could not be parsed
    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    /// Invalid UUID format
    #[error("Invalid UUID format: {value}")]
    InvalidUuid { value: String },
}

/// A single field validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

fn join_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |err| FieldValidationError {
                    field: field.clone(),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}

impl From<validator::ValidationErrors> for WorkshopError {
    fn from(errors: validator::ValidationErrors) -> Self {
        WorkshopError::Validation(errors.into())
    }
}

// =============================================================================
// Auth Errors
// =============================================================================

/// Errors related to authentication and authorization
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Protected route called without a bearer token
    #[error("Token is missing")]
    TokenMissing,

    /// Token expiry is in the past
    #[error("Token expired")]
    TokenExpired,

    /// Signature or payload did not verify
    #[error("Invalid token")]
    TokenInvalid,

    /// Unknown email or wrong password (never distinguished)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Authenticated, but not allowed to perform this action
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::TokenMissing => "TOKEN_MISSING",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenInvalid => "TOKEN_INVALID",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::Forbidden(_) => "FORBIDDEN",
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by the persistence engine
#[derive(Debug, Error)]
pub enum StorageError {
    /// A lock guarding the tables was poisoned by a panicking writer
    #[error("Storage lock poisoned: {message}")]
    LockPoisoned { message: String },

    /// Password hashing backend failure
    #[error("Password hashing failed: {message}")]
    Hashing { message: String },

    /// The database rejected or failed a statement
    #[cfg(feature = "sqlite")]
    #[error("Database error: {message}")]
    Database { message: String },
}

// =============================================================================
// Conversions from external errors
// =============================================================================

/// UNIQUE violations become `AlreadyExists`; everything else is a storage
/// failure
#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for WorkshopError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db) = err.as_database_error() {
            if db.is_unique_violation() {
                if let Some((table, column)) = unique_target(db.message()) {
                    return EntityError::AlreadyExists {
                        entity_type: table.to_string(),
                        field: column.to_string(),
                        value: String::new(),
                    }
                    .into();
                }
            }
        }
        StorageError::Database {
            message: err.to_string(),
        }
        .into()
    }
}

/// `UNIQUE constraint failed: parts.sku` names the table and column
#[cfg(feature = "sqlite")]
fn unique_target(message: &str) -> Option<(&str, &str)> {
    let (_, target) = message.split_once("constraint failed: ")?;
    target.split(',').next()?.trim().split_once('.')
}

/// A specialized Result type for workshop operations
pub type WorkshopResult<T> = Result<T, WorkshopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_error_display() {
        let err = EntityError::NotFound {
            entity_type: "mechanic".to_string(),
            id: Uuid::nil(),
        };
        assert!(err.to_string().contains("mechanic"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            WorkshopError::not_found("customer", Uuid::nil()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WorkshopError::invalid_field("email", "bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WorkshopError::from(EntityError::AlreadyExists {
                entity_type: "part".into(),
                field: "sku".into(),
                value: "BP-1".into(),
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        for err in [
            AuthError::TokenMissing,
            AuthError::TokenExpired,
            AuthError::TokenInvalid,
            AuthError::InvalidCredentials,
        ] {
            assert_eq!(
                WorkshopError::from(err).status_code(),
                StatusCode::UNAUTHORIZED
            );
        }
        assert_eq!(
            WorkshopError::from(AuthError::Forbidden("no".into())).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            WorkshopError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = WorkshopError::Storage(StorageError::LockPoisoned {
            message: "tables: writer panicked".into(),
        });
        let response = err.to_response();
        assert_eq!(response.error, "Internal server error");
        assert_eq!(response.code, "STORAGE_ERROR");
        assert!(!response.error.contains("tables"));
    }

    #[test]
    fn test_field_errors_details() {
        let err = WorkshopError::Validation(ValidationError::FieldErrors(vec![
            FieldValidationError {
                field: "name".to_string(),
                message: "required".to_string(),
            },
            FieldValidationError {
                field: "email".to_string(),
                message: "invalid format".to_string(),
            },
        ]));
        let display = err.to_string();
        assert!(display.contains("name"));
        assert!(display.contains("email"));
        assert!(err.to_response().details.is_some());
    }

    #[test]
    fn test_routing_errors() {
        let missing = WorkshopError::RouteNotFound {
            path: "/api/nope".into(),
        };
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.error_code(), "ROUTE_NOT_FOUND");

        let method = WorkshopError::MethodNotAllowed {
            method: "PATCH".into(),
            path: "/api/mechanics".into(),
        };
        assert_eq!(method.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(method.to_response().error.contains("PATCH"));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_unique_target() {
        assert_eq!(
            unique_target("UNIQUE constraint failed: parts.sku"),
            Some(("parts", "sku"))
        );
        assert_eq!(
            unique_target("UNIQUE constraint failed: ticket_parts.ticket_id, ticket_parts.part_id"),
            Some(("ticket_parts", "ticket_id"))
        );
        assert_eq!(unique_target("disk I/O error"), None);
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = WorkshopError::RateLimited {
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            "42"
        );
    }
}
