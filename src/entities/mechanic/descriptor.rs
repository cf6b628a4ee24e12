//! Entity descriptor for Mechanic

use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{
    create_mechanic, delete_mechanic, get_mechanic, list_mechanics, login_mechanic,
    top_mechanics, update_mechanic,
};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;

/// Descriptor for the Mechanic entity
pub struct MechanicDescriptor;

impl EntityDescriptor for MechanicDescriptor {
    fn entity_type(&self) -> &str {
        "mechanic"
    }

    fn plural(&self) -> &str {
        "mechanics"
    }

    fn build_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/mechanics", get(list_mechanics).post(create_mechanic))
            .route("/mechanics/login", post(login_mechanic))
            .route("/mechanics/top", get(top_mechanics))
            .route(
                "/mechanics/{id}",
                get(get_mechanic).put(update_mechanic).delete(delete_mechanic),
            )
    }
}
