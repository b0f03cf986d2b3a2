use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::logic::materialize_routes;
use crate::model::EndpointDefinition;
use crate::store::traits::Store;

/// Management API surface: endpoint definition CRUD plus user creation.
pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Endpoint definition management
        .route("/endpoint/", get(handlers::list_endpoints::<S>))
        .route("/endpoint/", post(handlers::create_endpoint::<S>))
        .route("/endpoint/:id/", get(handlers::get_endpoint::<S>))
        .route("/endpoint/:id/", delete(handlers::delete_endpoint::<S>))
        .route("/endpoint/:id/", patch(handlers::patch_endpoint::<S>))
        .route("/endpoint/:id/", put(handlers::replace_endpoint::<S>))
        // User management
        .route("/user/", post(handlers::create_user::<S>))
}

/// Full application: management routes merged with the routes materialized
/// from the given definition snapshot, with JSON 404/405 fallbacks applied
/// across both.
pub fn build_app<S: Store + 'static>(
    store: Arc<S>,
    definitions: &[EndpointDefinition],
) -> anyhow::Result<Router> {
    let dynamic = materialize_routes(definitions)?;
    Ok(create_router()
        .with_state(store)
        .merge(dynamic)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(handlers::json_method_not_allowed)))
}
