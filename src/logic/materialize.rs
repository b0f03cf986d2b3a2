use anyhow::anyhow;
use axum::{
    extract::Query,
    http::Method,
    response::Json,
    routing::{MethodFilter, MethodRouter},
    Router,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::logic::resolve::ResolverContext;
use crate::logic::validate::is_reserved_path;
use crate::model::EndpointDefinition;

struct Binding {
    filter: MethodFilter,
    context: Arc<ResolverContext>,
}

/// Turn a snapshot of stored definitions into live routes. Runs once at
/// startup; definitions mutated afterwards take effect on the next start.
///
/// Definitions sharing a path merge into a single method router. Should two
/// definitions claim the same (path, method) pair — possible, since the
/// uniqueness index keys on the full method set — the first one in storage
/// order wins and the loser is skipped with a warning.
pub fn materialize_routes(definitions: &[EndpointDefinition]) -> anyhow::Result<Router> {
    let mut per_path: BTreeMap<String, Vec<Binding>> = BTreeMap::new();
    let mut claimed: HashSet<(String, String)> = HashSet::new();

    for definition in definitions {
        // The validator refuses these at write time; a data file produced
        // elsewhere can still carry them, and the router panics on paths it
        // cannot bind, so unroutable definitions are dropped here too.
        if !is_routable(&definition.path) {
            log::warn!(
                "skipping definition {}: path '{}' cannot be bound as a route",
                definition.id,
                definition.path
            );
            continue;
        }
        let context = Arc::new(ResolverContext::from_definition(definition)?);
        let mut bound = Vec::new();

        for method in definition.method_set() {
            if !claimed.insert((definition.path.clone(), method.clone())) {
                log::warn!(
                    "skipping {} {} from definition {}: method already bound by an earlier definition",
                    method,
                    definition.path,
                    definition.id
                );
                continue;
            }
            per_path
                .entry(definition.path.clone())
                .or_default()
                .push(Binding {
                    filter: method_filter(&method)?,
                    context: context.clone(),
                });
            bound.push(method);
        }

        if !bound.is_empty() {
            log::info!("materialized route {} {:?}", definition.path, bound);
        }
    }

    let mut router = Router::new();
    for (path, bindings) in per_path {
        let mut method_router = MethodRouter::new();
        for binding in bindings {
            let context = binding.context;
            // An unparsable query string (bad percent-encoding etc.) is
            // treated as carrying no parameters rather than surfacing the
            // extractor's plain-text 400.
            let handler = move |params: Option<Query<HashMap<String, String>>>| {
                let context = context.clone();
                async move {
                    let params = params.map(|Query(p)| p).unwrap_or_default();
                    Json(context.resolve(params.keys().map(String::as_str)))
                }
            };
            method_router = method_router.on(binding.filter, handler);
        }
        router = router.route(&path, method_router);
    }
    Ok(router)
}

fn is_routable(path: &str) -> bool {
    path.starts_with('/')
        && !path.contains(':')
        && !path.contains('*')
        && !is_reserved_path(path)
}

fn method_filter(method: &str) -> anyhow::Result<MethodFilter> {
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|err| anyhow!("invalid HTTP method '{}': {}", method, err))?;
    MethodFilter::try_from(method.clone())
        .map_err(|err| anyhow!("unroutable HTTP method '{}': {}", method, err))
}
