//! Customer HTTP handlers

use axum::{
    Json,
    extract::State,
    http::{StatusCode, Uri},
};
use serde_json::{Value, json};

use super::model::{CreateCustomer, Customer, UpdateCustomer};
use crate::core::auth::{AuthPolicy, Authenticated, Role, require_self};
use crate::core::error::WorkshopResult;
use crate::core::extractors::EntityId;
use crate::core::query::{Page, QueryParams, first_values};
use crate::core::validation::ValidatedJson;
use crate::entities::account::{LoginRequest, LoginResponse, login};
use crate::server::host::AppState;

pub async fn create_customer(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateCustomer>,
) -> WorkshopResult<(StatusCode, Json<Customer>)> {
    let hash = state.passwords.hash(payload.password.clone()).await?;
    let customer = state.customers.create(Customer::new(payload, hash)).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    params: QueryParams,
) -> WorkshopResult<Json<Page<Customer>>> {
    Ok(Json(state.customers.list(&params).await?))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    EntityId(id): EntityId,
) -> WorkshopResult<Json<Customer>> {
    Ok(Json(state.customers.fetch(&id).await?))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<UpdateCustomer>,
) -> WorkshopResult<Json<Customer>> {
    require_self(&principal, id, Role::Customer)?;

    let hash = match payload.password.clone() {
        Some(password) => Some(state.passwords.hash(password).await?),
        None => None,
    };
    let customer = state
        .customers
        .update(
            &id,
            Box::new(move |customer: &mut Customer| {
                customer.apply(payload, hash);
                Ok(())
            }),
        )
        .await?;
    Ok(Json(customer))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    EntityId(id): EntityId,
) -> WorkshopResult<StatusCode> {
    require_self(&principal, id, Role::Customer)?;
    state.customers.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn login_customer(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> WorkshopResult<Json<LoginResponse>> {
    let response = login(
        state.customers.as_ref(),
        &state.passwords,
        &state.tokens,
        request,
    )
    .await?;
    Ok(Json(response))
}

/// The caller's tickets; `summary=true` returns only their ids
pub async fn my_tickets(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    uri: Uri,
) -> WorkshopResult<Json<Value>> {
    AuthPolicy::HasRole(Role::Customer).enforce(&principal)?;

    let tickets = state
        .tickets
        .search("customer_id", &principal.id.to_string())
        .await?;
    let summary = first_values(&uri)
        .get("summary")
        .is_some_and(|s| s.eq_ignore_ascii_case("true"));

    if summary {
        let ids: Vec<_> = tickets.iter().map(|t| t.id).collect();
        return Ok(Json(json!(ids)));
    }
    Ok(Json(json!(tickets)))
}
