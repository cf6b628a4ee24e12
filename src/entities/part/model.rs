//! Inventory part model and request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::validation::validators::not_blank;

/// A stocked part that can be consumed by service tickets
#[derive(Debug, Clone, Serialize)]
pub struct Part {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_entity!(
    Part,
    "inventory",
    "part",
    unique: ["sku"],
    fields: [name, sku, description, price]
);

impl Part {
    pub fn new(payload: CreatePart) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: payload.name.trim().to_string(),
            sku: payload.sku.trim().to_string(),
            description: payload.description.map(|d| d.trim().to_string()),
            price: payload.price,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdatePart) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(sku) = update.sku {
            self.sku = sku.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = Some(description.trim().to_string());
        }
        if let Some(price) = update.price {
            self.price = price;
        }
    }
}

/// Body of `POST /api/inventory`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePart {
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(min = 1, max = 50), custom(function = "not_blank"))]
    pub sku: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: f64,
}

/// Body of `PUT /api/inventory/{id}`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePart {
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50), custom(function = "not_blank"))]
    pub sku: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::Entity;

    #[test]
    fn test_price_and_sku_rules() {
        let bad = CreatePart {
            name: "Brake pad".into(),
            sku: "".into(),
            description: None,
            price: -0.01,
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("sku"));
        assert!(fields.contains_key("price"));
    }

    #[test]
    fn test_field_values() {
        let part = Part::new(CreatePart {
            name: "Oil filter".into(),
            sku: " OF-1 ".into(),
            description: None,
            price: 9.5,
        });
        assert_eq!(part.field_value("sku").as_deref(), Some("OF-1"));
        assert_eq!(part.field_value("price").as_deref(), Some("9.5"));
        assert_eq!(part.field_value("description"), None);
        assert_eq!(Part::resource_name(), "inventory");
    }
}
