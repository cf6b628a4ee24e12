//! Customer entity model and request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::auth::Role;
use crate::core::entity::normalize_email;
use crate::core::validation::validators::not_blank;

/// A workshop customer; owns service tickets
#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_entity!(
    Customer,
    "customers",
    "customer",
    unique: ["email"],
    fields: [name, email, phone, address]
);

impl_account!(Customer, Role::Customer);

impl Customer {
    /// Build a new customer from a validated payload and a password hash
    pub fn new(payload: CreateCustomer, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: payload.name.trim().to_string(),
            email: normalize_email(&payload.email),
            phone: payload.phone.trim().to_string(),
            address: payload.address.trim().to_string(),
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the supplied fields of an update
    pub fn apply(&mut self, update: UpdateCustomer, password_hash: Option<String>) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(email) = update.email {
            self.email = normalize_email(&email);
        }
        if let Some(phone) = update.phone {
            self.phone = phone.trim().to_string();
        }
        if let Some(address) = update.address {
            self.address = address.trim().to_string();
        }
        if let Some(hash) = password_hash {
            self.password_hash = hash;
        }
    }
}

/// Body of `POST /api/customers`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCustomer {
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 20), custom(function = "not_blank"))]
    pub phone: String,
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub address: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Body of `PUT /api/customers/{id}`; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCustomer {
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20), custom(function = "not_blank"))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub password: Option<String>,
}
