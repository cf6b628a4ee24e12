//! Mechanic entity model and request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::auth::Role;
use crate::core::entity::normalize_email;
use crate::core::validation::validators::not_blank;

/// A workshop mechanic; can be assigned to many service tickets
#[derive(Debug, Clone, Serialize)]
pub struct Mechanic {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub specialty: String,
    pub salary: f64,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_entity!(
    Mechanic,
    "mechanics",
    "mechanic",
    unique: ["email"],
    fields: [name, email, phone, address, specialty, salary]
);

impl_account!(Mechanic, Role::Mechanic);

impl Mechanic {
    pub fn new(payload: CreateMechanic, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: payload.name.trim().to_string(),
            email: normalize_email(&payload.email),
            phone: payload.phone.trim().to_string(),
            address: payload.address.trim().to_string(),
            specialty: payload.specialty.trim().to_string(),
            salary: payload.salary,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdateMechanic, password_hash: Option<String>) {
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
        if let Some(specialty) = update.specialty {
            self.specialty = specialty.trim().to_string();
        }
        if let Some(salary) = update.salary {
            self.salary = salary;
        }
        if let Some(hash) = password_hash {
            self.password_hash = hash;
        }
    }
}

/// Body of `POST /api/mechanics`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMechanic {
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 20), custom(function = "not_blank"))]
    pub phone: String,
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub address: String,
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub specialty: String,
    #[validate(range(min = 0.0))]
    pub salary: f64,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Body of `PUT /api/mechanics/{id}`; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMechanic {
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20), custom(function = "not_blank"))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub specialty: Option<String>,
    #[validate(range(min = 0.0))]
    pub salary: Option<f64>,
    #[validate(length(min = 1, max = 128))]
    pub password: Option<String>,
}

/// A mechanic with the number of tickets assigned to them
#[derive(Debug, Clone, Serialize)]
pub struct RankedMechanic {
    #[serde(flatten)]
    pub mechanic: Mechanic,
    pub ticket_count: usize,
}
