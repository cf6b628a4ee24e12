//! Entity descriptor for inventory parts

use axum::{Router, routing::get};

use super::handlers::{create_part, delete_part, get_part, list_parts, update_part};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;

/// Descriptor for the inventory
pub struct PartDescriptor;

impl EntityDescriptor for PartDescriptor {
    fn entity_type(&self) -> &str {
        "part"
    }

    fn plural(&self) -> &str {
        "inventory"
    }

    fn build_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/inventory", get(list_parts).post(create_part))
            .route(
                "/inventory/{id}",
                get(get_part).put(update_part).delete(delete_part),
            )
    }
}
