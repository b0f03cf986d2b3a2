use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::logic::validate::Validator;
use crate::model::{EndpointDefinition, EndpointPayload, Id, NewUser, User};
use crate::store::traits::{EndpointStore, StoreError, UserStore};

/// In-memory document store with an optional write-through JSON data file.
///
/// All mutations run under a single write lock; the composite unique index
/// over (path, methods-as-set) is re-checked inside the lock after
/// validation, so racing writers claiming the same pair see exactly one
/// success and one duplicate error. A failed data-file write rolls the
/// in-memory mutation back, so readers never observe a record that would
/// vanish on restart.
pub struct MemoryStore {
    state: RwLock<State>,
    data_file: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    endpoints: Vec<EndpointDefinition>,
    users: Vec<User>,
    #[serde(skip)]
    endpoint_index: BTreeSet<(String, BTreeSet<String>)>,
    #[serde(skip)]
    username_index: BTreeSet<String>,
}

impl State {
    fn rebuild_indexes(&mut self) {
        self.endpoint_index = self.endpoints.iter().map(|d| d.identity()).collect();
        self.username_index = self.users.iter().map(|u| u.username.clone()).collect();
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            data_file: None,
        }
    }

    /// Load state from `path` if it exists and write every successful
    /// mutation back to it.
    pub fn with_data_file(path: PathBuf) -> anyhow::Result<Self> {
        let mut state = State::default();
        if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading data file {}", path.display()))?;
            state = serde_json::from_str(&raw)
                .with_context(|| format!("parsing data file {}", path.display()))?;
            state.rebuild_indexes();
            log::info!(
                "loaded {} endpoint definitions and {} users from {}",
                state.endpoints.len(),
                state.users.len(),
                path.display()
            );
        }
        Ok(Self {
            state: RwLock::new(state),
            data_file: Some(path),
        })
    }

    fn persist(&self, state: &State) -> Result<(), StoreError> {
        if let Some(path) = &self.data_file {
            let raw = serde_json::to_string_pretty(state)
                .context("serializing store state")
                .map_err(StoreError::Internal)?;
            std::fs::write(path, raw)
                .with_context(|| format!("writing data file {}", path.display()))
                .map_err(StoreError::Internal)?;
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EndpointStore for MemoryStore {
    async fn list_endpoints(&self) -> Result<Vec<EndpointDefinition>, StoreError> {
        Ok(self.state.read().endpoints.clone())
    }

    async fn get_endpoint(&self, id: &Id) -> Result<EndpointDefinition, StoreError> {
        self.state
            .read()
            .endpoints
            .iter()
            .find(|d| d.id == *id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert_endpoint(
        &self,
        payload: EndpointPayload,
    ) -> Result<EndpointDefinition, StoreError> {
        let mut state = self.state.write();
        let definition = Validator::validate_create(payload, &state.endpoints)
            .map_err(StoreError::Validation)?;

        if !state.endpoint_index.insert(definition.identity()) {
            return Err(StoreError::DuplicateEndpoint);
        }
        state.endpoints.push(definition.clone());
        if let Err(e) = self.persist(&state) {
            state.endpoints.pop();
            state.endpoint_index.remove(&definition.identity());
            return Err(e);
        }
        Ok(definition)
    }

    async fn patch_endpoint(
        &self,
        id: &Id,
        payload: EndpointPayload,
    ) -> Result<EndpointDefinition, StoreError> {
        self.apply_update(id, |current, endpoints| {
            Validator::validate_patch(payload, current, endpoints)
        })
    }

    async fn replace_endpoint(
        &self,
        id: &Id,
        payload: EndpointPayload,
    ) -> Result<EndpointDefinition, StoreError> {
        self.apply_update(id, |current, endpoints| {
            Validator::validate_replace(payload, current, endpoints)
        })
    }

    async fn delete_endpoint(&self, id: &Id) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let position = state
            .endpoints
            .iter()
            .position(|d| d.id == *id)
            .ok_or(StoreError::NotFound)?;
        let removed = state.endpoints.remove(position);
        state.endpoint_index.remove(&removed.identity());
        if let Err(e) = self.persist(&state) {
            state.endpoint_index.insert(removed.identity());
            state.endpoints.insert(position, removed);
            return Err(e);
        }
        Ok(())
    }
}

impl MemoryStore {
    fn apply_update<F>(&self, id: &Id, validate: F) -> Result<EndpointDefinition, StoreError>
    where
        F: FnOnce(
            &EndpointDefinition,
            &[EndpointDefinition],
        ) -> Result<EndpointDefinition, crate::logic::ValidationErrors>,
    {
        let mut state = self.state.write();
        let position = state
            .endpoints
            .iter()
            .position(|d| d.id == *id)
            .ok_or(StoreError::NotFound)?;
        let current = state.endpoints[position].clone();

        let updated = validate(&current, &state.endpoints).map_err(StoreError::Validation)?;

        let identity_changed = updated.identity() != current.identity();
        if identity_changed {
            if state.endpoint_index.contains(&updated.identity()) {
                return Err(StoreError::DuplicateEndpoint);
            }
            state.endpoint_index.remove(&current.identity());
            state.endpoint_index.insert(updated.identity());
        }
        state.endpoints[position] = updated.clone();
        if let Err(e) = self.persist(&state) {
            if identity_changed {
                state.endpoint_index.remove(&updated.identity());
                state.endpoint_index.insert(current.identity());
            }
            state.endpoints[position] = current;
            return Err(e);
        }
        Ok(updated)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, payload: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write();
        let user =
            Validator::validate_new_user(payload, &state.users).map_err(StoreError::Validation)?;

        if !state.username_index.insert(user.username.clone()) {
            return Err(StoreError::DuplicateUsername);
        }
        state.users.push(user.clone());
        if let Err(e) = self.persist(&state) {
            state.users.pop();
            state.username_index.remove(&user.username);
            return Err(e);
        }
        Ok(user)
    }
}
