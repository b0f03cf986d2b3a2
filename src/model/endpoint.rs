use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::Id;

/// A stored mock endpoint: the path it serves, the HTTP methods it accepts,
/// a JSON-encoded base response body, and per-query-parameter overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDefinition {
    pub id: Id,
    pub path: String,
    pub methods: Vec<String>,
    /// JSON-encoded object returned as the response body. Well-formedness is
    /// checked at write time, not at serve time.
    pub response: String,
    #[serde(rename = "queryParams", default)]
    pub query_params: Vec<QueryOverride>,
}

/// Overlay rule: when query parameter `param` is present on a request, the
/// JSON-encoded `response` fragment is shallow-merged into the base response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOverride {
    pub param: String,
    pub response: String,
}

impl EndpointDefinition {
    /// Methods as a set, the identity half enforced by the store's unique
    /// index over `(path, methods)`.
    pub fn method_set(&self) -> BTreeSet<String> {
        self.methods.iter().cloned().collect()
    }

    pub fn identity(&self) -> (String, BTreeSet<String>) {
        (self.path.clone(), self.method_set())
    }
}

/// Client-submitted endpoint fields, shared by create (POST), full replace
/// (PUT) and partial update (PATCH). Every field is optional here; the
/// validator decides which ones are required for the operation at hand.
/// An `id` field in the payload is accepted but never applied — stored
/// identity is immutable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(
        rename = "queryParams",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub query_params: Option<Vec<QueryOverride>>,
}
