//! Entity descriptor for Customer

use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{
    create_customer, delete_customer, get_customer, list_customers, login_customer, my_tickets,
    update_customer,
};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;

/// Descriptor for the Customer entity
pub struct CustomerDescriptor;

impl EntityDescriptor for CustomerDescriptor {
    fn entity_type(&self) -> &str {
        "customer"
    }

    fn plural(&self) -> &str {
        "customers"
    }

    fn build_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/customers", get(list_customers).post(create_customer))
            .route("/customers/login", post(login_customer))
            .route("/customers/my-tickets", get(my_tickets))
            .route(
                "/customers/{id}",
                get(get_customer).put(update_customer).delete(delete_customer),
            )
    }
}
