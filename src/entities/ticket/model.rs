//! Service ticket model and request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::validation::validators::{self, not_blank};
use crate::entities::mechanic::Mechanic;
use crate::entities::part::Part;

/// A repair job for one customer
#[derive(Debug, Clone, Serialize)]
pub struct ServiceTicket {
    pub id: Uuid,
    pub description: String,
    pub customer_id: Uuid,
    pub vin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_entity!(
    ServiceTicket,
    "service-tickets",
    "service_ticket",
    unique: ["vin"],
    fields: [description, customer_id, vin]
);

impl ServiceTicket {
    pub fn new(description: &str, customer_id: Uuid, vin: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: description.trim().to_string(),
            customer_id,
            vin,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A ticket with its assigned mechanics and attached parts
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: ServiceTicket,
    pub mechanics: Vec<Mechanic>,
    pub parts: Vec<Part>,
}

/// Body of `POST /api/service-tickets`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTicket {
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub description: String,
    pub customer_id: Uuid,
    #[validate(custom(function = "validators::vin"))]
    pub vin: Option<String>,
    /// Mechanics assigned as part of the creation
    #[serde(default)]
    pub mechanic_ids: Vec<Uuid>,
}

/// Body of `PUT /api/service-tickets/{id}`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTicket {
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub description: Option<String>,
    #[validate(custom(function = "validators::vin"))]
    pub vin: Option<String>,
}

/// Body of `PUT /api/service-tickets/{id}/edit`
///
/// Applied as one unit: description, then removals, then additions.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TicketEdit {
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub description: Option<String>,
    #[serde(default)]
    pub add_ids: Vec<Uuid>,
    #[serde(default)]
    pub remove_ids: Vec<Uuid>,
}

/// Body of `POST /api/service-tickets/{id}/add-parts`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddParts {
    #[validate(length(min = 1, message = "at least one part id is required"))]
    pub part_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rules() {
        let ok = CreateTicket {
            description: "Brake squeal".into(),
            customer_id: Uuid::new_v4(),
            vin: Some("1HGCM82633A004352".into()),
            mechanic_ids: vec![],
        };
        assert!(ok.validate().is_ok());

        let bad = CreateTicket {
            description: "x".repeat(256),
            vin: Some("SHORT".into()),
            ..ok
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("description"));
        assert!(fields.contains_key("vin"));
    }

    #[test]
    fn test_add_parts_requires_ids() {
        assert!(AddParts { part_ids: vec![] }.validate().is_err());
        assert!(
            AddParts {
                part_ids: vec![Uuid::new_v4()]
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn test_view_flattens_ticket() {
        let ticket = ServiceTicket::new(" Oil change ", Uuid::new_v4(), None);
        let view = TicketView {
            ticket: ticket.clone(),
            mechanics: vec![],
            parts: vec![],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["description"], "Oil change");
        assert_eq!(json["id"], ticket.id.to_string());
        assert!(json["mechanics"].as_array().unwrap().is_empty());
    }
}
