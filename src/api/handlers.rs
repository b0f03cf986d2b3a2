use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::logic::ValidationErrors;
use crate::model::{EndpointDefinition, EndpointPayload, Id, NewUser, User};
use crate::store::traits::{EndpointStore, Store, StoreError, UserStore};

pub type AppState<S> = Arc<S>;

/// Every failure leaves the API as a status code plus a JSON body: either a
/// field→message map (400) or an `{"error": ...}` object.
type ApiError = (StatusCode, Json<Value>);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

fn validation_failure(errors: ValidationErrors) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!(errors)))
}

fn store_error(error: StoreError) -> ApiError {
    match error {
        StoreError::Validation(errors) => validation_failure(errors),
        // Index-level duplicates surface exactly like validator duplicates.
        StoreError::DuplicateEndpoint => {
            validation_failure(ValidationErrors::duplicate_endpoint())
        }
        StoreError::DuplicateUsername => {
            validation_failure(ValidationErrors::duplicate_username())
        }
        StoreError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "record not found"})),
        ),
        StoreError::Internal(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        ),
    }
}

fn bad_request_body(rejection: JsonRejection) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": format!("invalid request body: {}", rejection.body_text())})),
    )
}

pub async fn list_endpoints<S: Store>(
    State(store): State<AppState<S>>,
) -> Result<Json<Vec<EndpointDefinition>>, ApiError> {
    match store.list_endpoints().await {
        Ok(definitions) => Ok(Json(definitions)),
        Err(e) => Err(store_error(e)),
    }
}

pub async fn create_endpoint<S: Store>(
    State(store): State<AppState<S>>,
    payload: Result<Json<EndpointPayload>, JsonRejection>,
) -> Result<Json<EndpointDefinition>, ApiError> {
    let Json(payload) = payload.map_err(bad_request_body)?;
    match store.insert_endpoint(payload).await {
        Ok(definition) => Ok(Json(definition)),
        Err(e) => Err(store_error(e)),
    }
}

pub async fn get_endpoint<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<EndpointDefinition>, ApiError> {
    match store.get_endpoint(&id).await {
        Ok(definition) => Ok(Json(definition)),
        Err(e) => Err(store_error(e)),
    }
}

pub async fn delete_endpoint<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<Value>, ApiError> {
    match store.delete_endpoint(&id).await {
        Ok(()) => Ok(Json(json!({"message": "endpoint deleted"}))),
        Err(e) => Err(store_error(e)),
    }
}

pub async fn patch_endpoint<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    payload: Result<Json<EndpointPayload>, JsonRejection>,
) -> Result<Json<EndpointDefinition>, ApiError> {
    let Json(payload) = payload.map_err(bad_request_body)?;
    match store.patch_endpoint(&id, payload).await {
        Ok(definition) => Ok(Json(definition)),
        Err(e) => Err(store_error(e)),
    }
}

pub async fn replace_endpoint<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    payload: Result<Json<EndpointPayload>, JsonRejection>,
) -> Result<Json<EndpointDefinition>, ApiError> {
    let Json(payload) = payload.map_err(bad_request_body)?;
    match store.replace_endpoint(&id, payload).await {
        Ok(definition) => Ok(Json(definition)),
        Err(e) => Err(store_error(e)),
    }
}

pub async fn create_user<S: Store>(
    State(store): State<AppState<S>>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(payload) = payload.map_err(bad_request_body)?;
    match store.insert_user(payload).await {
        Ok(user) => Ok(Json(user)),
        Err(e) => Err(store_error(e)),
    }
}

/// Fallback for paths no route (static or materialized) matches.
pub async fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"})))
}

/// Rewrite the framework's bare 405 responses into JSON bodies, keeping the
/// `Allow` header it computed from the route's registered methods.
pub async fn json_method_not_allowed(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut replacement = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({"error": "method not allowed"})),
    )
        .into_response();
    if let Some(allow) = allow {
        replacement.headers_mut().insert(header::ALLOW, allow);
    }
    replacement
}
