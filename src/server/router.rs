//! Router assembly: health routes, `/api` entity routes and the shared layers

use std::sync::Arc;

use axum::extract::OriginalUri;
use axum::http::Method;
use axum::{Json, Router, middleware, routing::get};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::entity_registry::EntityRegistry;
use super::host::AppState;
use super::middleware::{
    RateLimiters, ResponseCache, cache_responses, limit_creates, limit_logins, limit_requests,
};
use crate::core::error::WorkshopError;

/// Build the complete application router
///
/// Layer order inside `/api`, outermost first: general rate limit, login
/// rate limit, create rate limit, response cache. Unknown paths and methods
/// get JSON error bodies like every other failure.
pub fn build_router(
    state: AppState,
    registry: &EntityRegistry,
    cache: Arc<ResponseCache>,
    limiters: RateLimiters,
    custom_routes: Vec<Router>,
) -> Router {
    let cache_state = (cache, state.authenticator.clone());
    let api = registry
        .build_routes()
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn_with_state(cache_state, cache_responses))
        .layer(middleware::from_fn_with_state(limiters.clone(), limit_creates))
        .layer(middleware::from_fn_with_state(limiters.clone(), limit_logins))
        .layer(middleware::from_fn_with_state(limiters, limit_requests))
        .with_state(state);

    let mut app = health_routes().nest("/api", api);
    for custom in custom_routes {
        app = app.merge(custom);
    }

    app.fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn route_not_found(OriginalUri(uri): OriginalUri) -> WorkshopError {
    WorkshopError::RouteNotFound {
        path: uri.path().to_string(),
    }
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> WorkshopError {
    WorkshopError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "workshop-api"
    }))
}
