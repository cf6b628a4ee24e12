//! Mechanic HTTP handlers

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use super::model::{CreateMechanic, Mechanic, RankedMechanic, UpdateMechanic};
use crate::core::auth::{Authenticated, Role, require_self};
use crate::core::error::WorkshopResult;
use crate::core::extractors::EntityId;
use crate::core::query::{Page, QueryParams};
use crate::core::validation::ValidatedJson;
use crate::entities::account::{LoginRequest, LoginResponse, login};
use crate::server::host::AppState;

pub async fn create_mechanic(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateMechanic>,
) -> WorkshopResult<(StatusCode, Json<Mechanic>)> {
    let hash = state.passwords.hash(payload.password.clone()).await?;
    let mechanic = state.mechanics.create(Mechanic::new(payload, hash)).await?;
    Ok((StatusCode::CREATED, Json(mechanic)))
}

pub async fn list_mechanics(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    params: QueryParams,
) -> WorkshopResult<Json<Page<Mechanic>>> {
    Ok(Json(state.mechanics.list(&params).await?))
}

/// Mechanics ranked by assigned tickets (public)
pub async fn top_mechanics(
    State(state): State<AppState>,
) -> WorkshopResult<Json<Vec<RankedMechanic>>> {
    Ok(Json(state.assignments.top_mechanics().await?))
}

pub async fn get_mechanic(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    EntityId(id): EntityId,
) -> WorkshopResult<Json<Mechanic>> {
    Ok(Json(state.mechanics.fetch(&id).await?))
}

pub async fn update_mechanic(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<UpdateMechanic>,
) -> WorkshopResult<Json<Mechanic>> {
    require_self(&principal, id, Role::Mechanic)?;

    let hash = match payload.password.clone() {
        Some(password) => Some(state.passwords.hash(password).await?),
        None => None,
    };
    let mechanic = state
        .mechanics
        .update(
            &id,
            Box::new(move |mechanic: &mut Mechanic| {
                mechanic.apply(payload, hash);
                Ok(())
            }),
        )
        .await?;
    Ok(Json(mechanic))
}

/// Delete the caller's own record; its ticket assignments are detached
pub async fn delete_mechanic(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(id): EntityId,
) -> WorkshopResult<StatusCode> {
    require_self(&principal, id, Role::Mechanic)?;
    state.mechanics.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn login_mechanic(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> WorkshopResult<Json<LoginResponse>> {
    let response = login(
        state.mechanics.as_ref(),
        &state.passwords,
        &state.tokens,
        request,
    )
    .await?;
    Ok(Json(response))
}
