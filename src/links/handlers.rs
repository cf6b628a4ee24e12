//! HTTP handlers for ticket assignments
//!
//! Mutations are mechanic-only and answer with the updated ticket view.
//! Reads are open to the owning customer as well.

use axum::{Json, extract::State};

use crate::core::auth::{Authenticated, require_mechanic};
use crate::core::error::WorkshopResult;
use crate::core::extractors::{EntityId, IdPair};
use crate::core::validation::ValidatedJson;
use crate::entities::mechanic::Mechanic;
use crate::entities::part::Part;
use crate::entities::ticket::handlers::ensure_can_read;
use crate::entities::ticket::{AddParts, TicketEdit, TicketView};
use crate::server::host::AppState;

/// `PUT /service-tickets/{id}/assign-mechanic/{mechanic_id}`
pub async fn assign_mechanic(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    IdPair(ticket_id, mechanic_id): IdPair,
) -> WorkshopResult<Json<TicketView>> {
    require_mechanic(&principal)?;
    state
        .assignments
        .assign_mechanic(&ticket_id, &mechanic_id)
        .await?;
    Ok(Json(state.assignments.ticket_view(&ticket_id).await?))
}

/// `DELETE /service-tickets/{id}/remove-mechanic/{mechanic_id}`
pub async fn remove_mechanic(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    IdPair(ticket_id, mechanic_id): IdPair,
) -> WorkshopResult<Json<TicketView>> {
    require_mechanic(&principal)?;
    state
        .assignments
        .remove_mechanic(&ticket_id, &mechanic_id)
        .await?;
    Ok(Json(state.assignments.ticket_view(&ticket_id).await?))
}

/// `PUT /service-tickets/{id}/edit`
pub async fn edit_ticket(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(ticket_id): EntityId,
    ValidatedJson(edit): ValidatedJson<TicketEdit>,
) -> WorkshopResult<Json<TicketView>> {
    require_mechanic(&principal)?;
    Ok(Json(state.assignments.edit_ticket(&ticket_id, edit).await?))
}

/// `POST /service-tickets/{id}/add-parts`
pub async fn add_parts(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(ticket_id): EntityId,
    ValidatedJson(payload): ValidatedJson<AddParts>,
) -> WorkshopResult<Json<TicketView>> {
    require_mechanic(&principal)?;
    state
        .assignments
        .add_parts(&ticket_id, &payload.part_ids)
        .await?;
    Ok(Json(state.assignments.ticket_view(&ticket_id).await?))
}

/// `DELETE /service-tickets/{id}/remove-part/{part_id}`
pub async fn remove_part(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    IdPair(ticket_id, part_id): IdPair,
) -> WorkshopResult<Json<TicketView>> {
    require_mechanic(&principal)?;
    state.assignments.remove_part(&ticket_id, &part_id).await?;
    Ok(Json(state.assignments.ticket_view(&ticket_id).await?))
}

/// `GET /service-tickets/{id}/parts`
pub async fn list_ticket_parts(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(ticket_id): EntityId,
) -> WorkshopResult<Json<Vec<Part>>> {
    let ticket = state.tickets.fetch(&ticket_id).await?;
    ensure_can_read(&principal, &ticket)?;
    Ok(Json(state.assignments.list_parts(&ticket_id).await?))
}

/// `GET /service-tickets/{id}/mechanics`
pub async fn list_ticket_mechanics(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(ticket_id): EntityId,
) -> WorkshopResult<Json<Vec<Mechanic>>> {
    let ticket = state.tickets.fetch(&ticket_id).await?;
    ensure_can_read(&principal, &ticket)?;
    Ok(Json(state.assignments.list_mechanics(&ticket_id).await?))
}
