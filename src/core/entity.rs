//! Entity traits defining the core abstraction for all workshop records

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::auth::Role;

/// Base trait for all entities in the system.
///
/// All entities have:
/// - id: Unique identifier
/// - created_at: Creation timestamp (defines list order)
/// - updated_at: Last modification timestamp
///
/// Implementations are generated by [`impl_entity!`](crate::impl_entity).
pub trait Entity: Clone + Serialize + Send + Sync + 'static {
    /// The plural resource name used in URLs (e.g., "mechanics", "inventory")
    fn resource_name() -> &'static str;

    /// The singular resource name used in messages (e.g., "mechanic")
    fn resource_name_singular() -> &'static str;

    /// Fields whose values must be unique across the table
    fn unique_fields() -> &'static [&'static str];

    /// Get the unique identifier for this entity instance
    fn id(&self) -> Uuid;

    /// Get the creation timestamp
    fn created_at(&self) -> DateTime<Utc>;

    /// Get the last update timestamp
    fn updated_at(&self) -> DateTime<Utc>;

    /// Mark the entity as modified now
    fn touch(&mut self);

    /// Get the value of a field by name, rendered as text
    ///
    /// Used for exact-match filters, sorting and uniqueness checks. Returns
    /// `None` for unknown fields and for optional fields without a value.
    fn field_value(&self, field: &str) -> Option<String>;

    /// Whether the named field holds a number
    ///
    /// Filters compare numeric fields by value, so `52000` matches `52000.0`;
    /// every other field compares as text.
    fn is_numeric_field(&self, field: &str) -> bool;
}

/// An entity that can log in with an email and a password
pub trait Account: Entity {
    /// Role carried by tokens issued to this account
    const ROLE: Role;

    fn password_hash(&self) -> &str;
}

/// Text rendering of a field value for [`Entity::field_value`]
pub trait FieldText {
    const NUMERIC: bool = false;

    fn field_text(&self) -> Option<String>;

    fn is_numeric(&self) -> bool {
        Self::NUMERIC
    }
}

impl FieldText for String {
    fn field_text(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl FieldText for f64 {
    const NUMERIC: bool = true;

    fn field_text(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl FieldText for Uuid {
    fn field_text(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl FieldText for DateTime<Utc> {
    fn field_text(&self) -> Option<String> {
        Some(self.to_rfc3339())
    }
}

impl<T: FieldText> FieldText for Option<T> {
    const NUMERIC: bool = T::NUMERIC;

    fn field_text(&self) -> Option<String> {
        self.as_ref().and_then(FieldText::field_text)
    }
}

/// Normalize an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
