use async_trait::async_trait;
use thiserror::Error;

use crate::logic::validate::ValidationErrors;
use crate::model::{EndpointDefinition, EndpointPayload, Id, NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Field-level validation failures, reported together.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    /// The unique index over (path, methods) rejected a write that slipped
    /// past validation. Clients see the same error body either way.
    #[error("an endpoint with this path and methods already exists")]
    DuplicateEndpoint,
    #[error("username is already taken")]
    DuplicateUsername,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[async_trait]
pub trait EndpointStore: Send + Sync {
    async fn list_endpoints(&self) -> Result<Vec<EndpointDefinition>, StoreError>;
    async fn get_endpoint(&self, id: &Id) -> Result<EndpointDefinition, StoreError>;
    /// Validate and insert a new definition, assigning it a fresh id.
    async fn insert_endpoint(
        &self,
        payload: EndpointPayload,
    ) -> Result<EndpointDefinition, StoreError>;
    /// Partial update: fields omitted from the payload keep stored values.
    async fn patch_endpoint(
        &self,
        id: &Id,
        payload: EndpointPayload,
    ) -> Result<EndpointDefinition, StoreError>;
    /// Full replace: all required fields must be resupplied.
    async fn replace_endpoint(
        &self,
        id: &Id,
        payload: EndpointPayload,
    ) -> Result<EndpointDefinition, StoreError>;
    /// Delete by id; unknown ids are NotFound.
    async fn delete_endpoint(&self, id: &Id) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, payload: NewUser) -> Result<User, StoreError>;
}

pub trait Store: EndpointStore + UserStore + Send + Sync {}
impl<T: EndpointStore + UserStore + Send + Sync> Store for T {}
