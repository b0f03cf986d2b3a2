use anyhow::{anyhow, Context};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::EndpointDefinition;

/// Parsed, serve-ready form of one endpoint definition: the base response
/// object plus override fragments keyed by query-parameter name. Built once
/// at materialization time so no JSON parsing happens per request.
#[derive(Debug, Clone)]
pub struct ResolverContext {
    base: Map<String, Value>,
    overrides: BTreeMap<String, Map<String, Value>>,
}

impl ResolverContext {
    pub fn from_definition(definition: &EndpointDefinition) -> anyhow::Result<Self> {
        let base = parse_object(&definition.response)
            .with_context(|| format!("base response for '{}'", definition.path))?;

        let mut overrides = BTreeMap::new();
        for rule in &definition.query_params {
            let fragment = parse_object(&rule.response).with_context(|| {
                format!(
                    "override fragment for parameter '{}' on '{}'",
                    rule.param, definition.path
                )
            })?;
            overrides.insert(rule.param.clone(), fragment);
        }

        Ok(Self { base, overrides })
    }

    /// Compose the response for a request carrying the given query-parameter
    /// names. Parameters without an override rule are ignored. Matched
    /// overrides apply in lexical parameter order, so when two fragments
    /// share a key the lexically later parameter wins.
    pub fn resolve<'a>(&self, present_params: impl IntoIterator<Item = &'a str>) -> Value {
        let matched: BTreeSet<&str> = present_params
            .into_iter()
            .filter(|name| self.overrides.contains_key(*name))
            .collect();

        let mut composed = self.base.clone();
        for name in matched {
            for (key, value) in &self.overrides[name] {
                composed.insert(key.clone(), value.clone());
            }
        }
        Value::Object(composed)
    }
}

fn parse_object(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("expected a JSON object, got {}", other)),
    }
}
