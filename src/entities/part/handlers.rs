//! Inventory HTTP handlers; every route is mechanic-only

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use super::model::{CreatePart, Part, UpdatePart};
use crate::core::auth::{Authenticated, require_mechanic};
use crate::core::error::WorkshopResult;
use crate::core::extractors::EntityId;
use crate::core::query::{Page, QueryParams};
use crate::core::validation::ValidatedJson;
use crate::server::host::AppState;

pub async fn create_part(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ValidatedJson(payload): ValidatedJson<CreatePart>,
) -> WorkshopResult<(StatusCode, Json<Part>)> {
    require_mechanic(&principal)?;
    let part = state.parts.create(Part::new(payload)).await?;
    Ok((StatusCode::CREATED, Json(part)))
}

pub async fn list_parts(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    params: QueryParams,
) -> WorkshopResult<Json<Page<Part>>> {
    require_mechanic(&principal)?;
    Ok(Json(state.parts.list(&params).await?))
}

pub async fn get_part(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(id): EntityId,
) -> WorkshopResult<Json<Part>> {
    require_mechanic(&principal)?;
    Ok(Json(state.parts.fetch(&id).await?))
}

pub async fn update_part(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<UpdatePart>,
) -> WorkshopResult<Json<Part>> {
    require_mechanic(&principal)?;
    let part = state
        .parts
        .update(
            &id,
            Box::new(move |part: &mut Part| {
                part.apply(payload);
                Ok(())
            }),
        )
        .await?;
    Ok(Json(part))
}

pub async fn delete_part(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(id): EntityId,
) -> WorkshopResult<StatusCode> {
    require_mechanic(&principal)?;
    state.parts.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
