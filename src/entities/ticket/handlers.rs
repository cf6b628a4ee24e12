//! Service ticket HTTP handlers

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use super::model::{CreateTicket, ServiceTicket, TicketView, UpdateTicket};
use crate::core::auth::{Authenticated, Principal, Role, require_mechanic, require_self};
use crate::core::error::{AuthError, WorkshopResult};
use crate::core::extractors::EntityId;
use crate::core::query::{Page, QueryParams};
use crate::core::validation::ValidatedJson;
use crate::server::host::AppState;

/// Mechanics may read any ticket, customers only their own
pub(crate) fn ensure_can_read(principal: &Principal, ticket: &ServiceTicket) -> Result<(), AuthError> {
    if principal.is_mechanic() {
        return Ok(());
    }
    require_self(principal, ticket.customer_id, Role::Customer)
}

pub async fn create_ticket(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ValidatedJson(payload): ValidatedJson<CreateTicket>,
) -> WorkshopResult<(StatusCode, Json<TicketView>)> {
    require_mechanic(&principal)?;
    let ticket = ServiceTicket::new(&payload.description, payload.customer_id, payload.vin);
    let view = state
        .assignments
        .create_ticket(ticket, &payload.mechanic_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Mechanics see every ticket; customers see their own
pub async fn list_tickets(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    params: QueryParams,
) -> WorkshopResult<Json<Page<ServiceTicket>>> {
    let params = if principal.is_mechanic() {
        params
    } else {
        params.with_filter("customer_id", &principal.id.to_string())
    };
    Ok(Json(state.tickets.list(&params).await?))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(id): EntityId,
) -> WorkshopResult<Json<TicketView>> {
    let view = state.assignments.ticket_view(&id).await?;
    ensure_can_read(&principal, &view.ticket)?;
    Ok(Json(view))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<UpdateTicket>,
) -> WorkshopResult<Json<ServiceTicket>> {
    require_mechanic(&principal)?;
    let ticket = state
        .tickets
        .update(
            &id,
            Box::new(move |ticket: &mut ServiceTicket| {
                if let Some(description) = payload.description {
                    ticket.description = description.trim().to_string();
                }
                if let Some(vin) = payload.vin {
                    ticket.vin = Some(vin);
                }
                Ok(())
            }),
        )
        .await?;
    Ok(Json(ticket))
}

/// Delete a ticket together with its assignment rows
pub async fn delete_ticket(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(id): EntityId,
) -> WorkshopResult<StatusCode> {
    require_mechanic(&principal)?;
    state.tickets.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
