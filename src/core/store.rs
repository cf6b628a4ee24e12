//! Filtering and sorting of entity collections

use std::cmp::Ordering;

use crate::core::entity::Entity;
use crate::core::query::{QueryParams, SortOrder};

/// Keep the entities whose fields match every filter exactly
///
/// A filter on a field the entity does not have matches nothing.
pub fn apply_filters<T: Entity>(data: Vec<T>, filters: &[(String, String)]) -> Vec<T> {
    if filters.is_empty() {
        return data;
    }
    data.into_iter()
        .filter(|entity| {
            filters.iter().all(|(field, value)| {
                entity.field_value(field).is_some_and(|actual| {
                    if entity.is_numeric_field(field) {
                        same_number(&actual, value)
                    } else {
                        actual == *value
                    }
                })
            })
        })
        .collect()
}

/// `52000` and `52000.0` name the same salary
fn same_number(actual: &str, wanted: &str) -> bool {
    match (actual.parse::<f64>(), wanted.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Stable sort by a field; numeric fields compare by value, missing values
/// first
pub fn apply_sort<T: Entity>(mut data: Vec<T>, order: &SortOrder) -> Vec<T> {
    data.sort_by(|a, b| {
        let ord = compare_field(a, b, &order.field);
        if order.descending { ord.reverse() } else { ord }
    });
    data
}

fn compare_field<T: Entity>(a: &T, b: &T, field: &str) -> Ordering {
    match field {
        "created_at" => a.created_at().cmp(&b.created_at()),
        "updated_at" => a.updated_at().cmp(&b.updated_at()),
        _ => match (a.field_value(field), b.field_value(field)) {
            (Some(x), Some(y)) if a.is_numeric_field(field) => {
                match (x.parse::<f64>(), y.parse::<f64>()) {
                    (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                    _ => x.cmp(&y),
                }
            }
            (x, y) => x.cmp(&y),
        },
    }
}

/// Filter then sort, as requested by list query parameters
pub fn select<T: Entity>(data: Vec<T>, params: &QueryParams) -> Vec<T> {
    let data = apply_filters(data, &params.filters());
    match params.sort_order() {
        Some(order) => apply_sort(data, &order),
        None => data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::customer::{CreateCustomer, Customer};
    use crate::entities::mechanic::{CreateMechanic, Mechanic};

    fn customer(phone: &str) -> Customer {
        Customer::new(
            CreateCustomer {
                name: "Ada".into(),
                email: format!("{phone}@example.com"),
                phone: phone.into(),
                address: "1 Main St".into(),
                password: "pw".into(),
            },
            "hash".into(),
        )
    }

    fn mechanic(name: &str, salary: f64) -> Mechanic {
        Mechanic::new(
            CreateMechanic {
                name: name.into(),
                email: format!("{name}@shop.com"),
                phone: "555".into(),
                address: "2 Garage Rd".into(),
                specialty: "Brakes".into(),
                salary,
                password: "pw".into(),
            },
            "hash".into(),
        )
    }

    fn filter(field: &str, value: &str) -> Vec<(String, String)> {
        vec![(field.to_string(), value.to_string())]
    }

    #[test]
    fn test_text_fields_match_exactly() {
        let rows = vec![customer("0555"), customer("1000")];

        assert!(apply_filters(rows.clone(), &filter("phone", "555")).is_empty());
        assert!(apply_filters(rows.clone(), &filter("phone", "1e3")).is_empty());
        let matched = apply_filters(rows, &filter("phone", "0555"));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].phone, "0555");
    }

    #[test]
    fn test_numeric_fields_match_by_value() {
        let rows = vec![mechanic("al", 52000.0), mechanic("bo", 300.0)];

        let matched = apply_filters(rows.clone(), &filter("salary", "52000"));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "al");
        assert_eq!(apply_filters(rows, &filter("salary", "5.2e4")).len(), 1);
    }

    #[test]
    fn test_unknown_field_matches_nothing() {
        let rows = vec![mechanic("al", 1.0)];
        assert!(apply_filters(rows, &filter("password_hash", "hash")).is_empty());
    }

    #[test]
    fn test_sort_text_lexically_numbers_by_value() {
        let rows = vec![customer("9"), customer("10")];
        let order = SortOrder {
            field: "phone".into(),
            descending: false,
        };
        let phones: Vec<_> = apply_sort(rows, &order)
            .into_iter()
            .map(|c| c.phone)
            .collect();
        assert_eq!(phones, ["10", "9"]);

        let rows = vec![mechanic("al", 900.0), mechanic("bo", 1000.0)];
        let order = SortOrder {
            field: "salary".into(),
            descending: true,
        };
        let names: Vec<_> = apply_sort(rows, &order)
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, ["bo", "al"]);
    }
}
