//! Entity descriptor for service tickets
//!
//! Besides CRUD, the ticket owns the assignment routes for its mechanics
//! and parts.

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use super::handlers::{create_ticket, delete_ticket, get_ticket, list_tickets, update_ticket};
use crate::links::handlers::{
    add_parts, assign_mechanic, edit_ticket, list_ticket_mechanics, list_ticket_parts,
    remove_mechanic, remove_part,
};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;

/// Descriptor for the ServiceTicket entity
pub struct TicketDescriptor;

impl EntityDescriptor for TicketDescriptor {
    fn entity_type(&self) -> &str {
        "service_ticket"
    }

    fn plural(&self) -> &str {
        "service-tickets"
    }

    fn build_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/service-tickets", get(list_tickets).post(create_ticket))
            .route(
                "/service-tickets/{id}",
                get(get_ticket).put(update_ticket).delete(delete_ticket),
            )
            .route(
                "/service-tickets/{id}/assign-mechanic/{mechanic_id}",
                put(assign_mechanic),
            )
            .route(
                "/service-tickets/{id}/remove-mechanic/{mechanic_id}",
                delete(remove_mechanic),
            )
            .route("/service-tickets/{id}/edit", put(edit_ticket))
            .route("/service-tickets/{id}/add-parts", post(add_parts))
            .route(
                "/service-tickets/{id}/remove-part/{part_id}",
                delete(remove_part),
            )
            .route("/service-tickets/{id}/parts", get(list_ticket_parts))
            .route("/service-tickets/{id}/mechanics", get(list_ticket_mechanics))
    }
}
