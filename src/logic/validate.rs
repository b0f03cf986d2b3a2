use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::model::{
    generate_id, EndpointDefinition, EndpointPayload, Id, NewUser, QueryOverride, User,
};

pub const DUPLICATE_ENDPOINT_MESSAGE: &str =
    "an endpoint with this path and methods already exists";
pub const DUPLICATE_USERNAME_MESSAGE: &str = "username is already taken";

const KNOWN_METHODS: [&str; 8] = [
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "TRACE",
];

/// Paths claimed by the management API. A stored definition must never bind
/// one of these: the router rejects overlapping routes at materialization,
/// so they are refused at write time instead.
pub fn is_reserved_path(path: &str) -> bool {
    if matches!(path, "/health" | "/user/" | "/endpoint/") {
        return true;
    }
    // Anything shaped like /endpoint/{id}/ overlaps the by-id routes.
    if let Some(rest) = path.strip_prefix("/endpoint/") {
        if let Some(segment) = rest.strip_suffix('/') {
            if !segment.is_empty() && !segment.contains('/') {
                return true;
            }
        }
    }
    false
}

/// Field-keyed validation failures. Serializes as a flat JSON object mapping
/// each offending field to a message, which is exactly the 400 response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        // First message per field wins; later checks never clobber it.
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn duplicate_endpoint() -> Self {
        let mut errors = Self::new();
        errors.insert("path", DUPLICATE_ENDPOINT_MESSAGE);
        errors
    }

    pub fn duplicate_username() -> Self {
        let mut errors = Self::new();
        errors.insert("username", DUPLICATE_USERNAME_MESSAGE);
        errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

pub struct Validator;

impl Validator {
    /// Validate a create payload. All required fields must be supplied; the
    /// candidate gets a freshly generated id.
    pub fn validate_create(
        payload: EndpointPayload,
        existing: &[EndpointDefinition],
    ) -> Result<EndpointDefinition, ValidationErrors> {
        Self::check(
            generate_id(),
            payload.path,
            payload.methods,
            payload.response,
            payload.query_params.unwrap_or_default(),
            existing,
            None,
        )
    }

    /// Validate a full replace. Required fields must be resupplied; omitted
    /// `queryParams` clear to empty. Any `id` in the payload is ignored.
    pub fn validate_replace(
        payload: EndpointPayload,
        current: &EndpointDefinition,
        existing: &[EndpointDefinition],
    ) -> Result<EndpointDefinition, ValidationErrors> {
        Self::check(
            current.id.clone(),
            payload.path,
            payload.methods,
            payload.response,
            payload.query_params.unwrap_or_default(),
            existing,
            Some(&current.id),
        )
    }

    /// Validate a partial update. Omitted fields retain their stored values.
    /// Any `id` in the payload is ignored.
    pub fn validate_patch(
        payload: EndpointPayload,
        current: &EndpointDefinition,
        existing: &[EndpointDefinition],
    ) -> Result<EndpointDefinition, ValidationErrors> {
        Self::check(
            current.id.clone(),
            payload.path.or_else(|| Some(current.path.clone())),
            payload.methods.or_else(|| Some(current.methods.clone())),
            payload.response.or_else(|| Some(current.response.clone())),
            payload
                .query_params
                .unwrap_or_else(|| current.query_params.clone()),
            existing,
            Some(&current.id),
        )
    }

    pub fn validate_new_user(
        payload: NewUser,
        existing: &[User],
    ) -> Result<User, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let username = match payload.username {
            Some(u) if !u.trim().is_empty() => Some(u),
            Some(_) => {
                errors.insert("username", "must be a non-empty string");
                None
            }
            None => {
                errors.insert("username", "field is required");
                None
            }
        };

        let password = match payload.password {
            Some(p) if !p.is_empty() => Some(p),
            Some(_) => {
                errors.insert("password", "must be a non-empty string");
                None
            }
            None => {
                errors.insert("password", "field is required");
                None
            }
        };

        if let Some(username) = &username {
            if existing.iter().any(|u| u.username == *username) {
                errors.insert("username", DUPLICATE_USERNAME_MESSAGE);
            }
        }

        match (username, password) {
            (Some(username), Some(password)) if errors.is_empty() => Ok(User {
                id: generate_id(),
                username,
                password,
            }),
            _ => Err(errors),
        }
    }

    fn check(
        id: Id,
        path: Option<String>,
        methods: Option<Vec<String>>,
        response: Option<String>,
        query_params: Vec<QueryOverride>,
        existing: &[EndpointDefinition],
        exclude_id: Option<&Id>,
    ) -> Result<EndpointDefinition, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        // Beyond presence, the path must be bindable as a literal route:
        // rooted, free of route-parameter syntax, and outside the paths the
        // management API occupies. Anything else would be stored fine and
        // then fail to materialize at the next startup.
        let path = match path {
            Some(p) if p.trim().is_empty() => {
                errors.insert("path", "must be a non-empty string");
                None
            }
            Some(p) if !p.starts_with('/') => {
                errors.insert("path", "must start with '/'");
                None
            }
            Some(p) if p.contains(':') || p.contains('*') => {
                errors.insert("path", "must not contain ':' or '*'");
                None
            }
            Some(p) if is_reserved_path(&p) => {
                errors.insert("path", "collides with a management API route");
                None
            }
            Some(p) => Some(p),
            None => {
                errors.insert("path", "field is required");
                None
            }
        };

        let methods = match methods {
            Some(ms) if ms.is_empty() => {
                errors.insert("methods", "must be a non-empty list of HTTP methods");
                None
            }
            Some(ms) => {
                let mut normalized = Vec::with_capacity(ms.len());
                for m in &ms {
                    let upper = m.to_ascii_uppercase();
                    if !KNOWN_METHODS.contains(&upper.as_str()) {
                        errors.insert("methods", format!("unknown HTTP method '{}'", m));
                    }
                    normalized.push(upper);
                }
                if errors.contains("methods") {
                    None
                } else {
                    Some(normalized)
                }
            }
            None => {
                errors.insert("methods", "field is required");
                None
            }
        };

        let response = match response {
            Some(r) => match parse_json_object(&r) {
                Ok(()) => Some(r),
                Err(message) => {
                    errors.insert("response", message);
                    None
                }
            },
            None => {
                errors.insert("response", "field is required");
                None
            }
        };

        for rule in &query_params {
            if rule.param.trim().is_empty() {
                errors.insert("queryParams", "override rules require a non-empty 'param'");
            } else if let Err(message) = parse_json_object(&rule.response) {
                errors.insert(
                    "queryParams",
                    format!("override for '{}': {}", rule.param, message),
                );
            }
        }

        if let (Some(path), Some(methods)) = (&path, &methods) {
            let method_set: BTreeSet<String> = methods.iter().cloned().collect();
            let clash = existing.iter().any(|d| {
                exclude_id != Some(&d.id) && d.path == *path && d.method_set() == method_set
            });
            if clash {
                errors.insert("path", DUPLICATE_ENDPOINT_MESSAGE);
            }
        }

        match (path, methods, response) {
            (Some(path), Some(methods), Some(response)) if errors.is_empty() => {
                Ok(EndpointDefinition {
                    id,
                    path,
                    methods,
                    response,
                    query_params,
                })
            }
            _ => Err(errors),
        }
    }
}

fn parse_json_object(raw: &str) -> Result<(), String> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(_)) => Ok(()),
        Ok(_) => Err("must be a JSON-encoded object".to_string()),
        Err(_) => Err("must be a valid JSON-encoded string".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(path: &str, methods: &[&str], response: &str) -> EndpointPayload {
        EndpointPayload {
            id: None,
            path: Some(path.to_string()),
            methods: Some(methods.iter().map(|m| m.to_string()).collect()),
            response: Some(response.to_string()),
            query_params: None,
        }
    }

    fn stored(path: &str, methods: &[&str]) -> EndpointDefinition {
        EndpointDefinition {
            id: generate_id(),
            path: path.to_string(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            response: "{}".to_string(),
            query_params: vec![],
        }
    }

    #[test]
    fn create_with_all_fields_succeeds() {
        let def = Validator::validate_create(
            payload("/api/v1/test", &["GET"], r#"{"name":"Alice"}"#),
            &[],
        )
        .unwrap();
        assert_eq!(def.path, "/api/v1/test");
        assert_eq!(def.methods, vec!["GET"]);
        assert!(!def.id.is_empty());
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let errors = Validator::validate_create(EndpointPayload::default(), &[]).unwrap_err();
        assert!(errors.contains("path"));
        assert!(errors.contains("methods"));
        assert!(errors.contains("response"));
    }

    #[test]
    fn response_must_be_a_json_object() {
        let errors =
            Validator::validate_create(payload("/x", &["GET"], "not json"), &[]).unwrap_err();
        assert!(errors.contains("response"));

        let errors =
            Validator::validate_create(payload("/x", &["GET"], "[1,2]"), &[]).unwrap_err();
        assert!(errors.contains("response"));
    }

    #[test]
    fn methods_are_normalized_and_checked() {
        let def = Validator::validate_create(payload("/x", &["get", "Post"], "{}"), &[]).unwrap();
        assert_eq!(def.methods, vec!["GET", "POST"]);

        let errors =
            Validator::validate_create(payload("/x", &["FETCH"], "{}"), &[]).unwrap_err();
        assert!(errors.contains("methods"));
    }

    #[test]
    fn path_must_be_bindable_as_a_route() {
        // Unrooted paths cannot be registered with the router.
        let errors =
            Validator::validate_create(payload("api/no-slash", &["GET"], "{}"), &[]).unwrap_err();
        assert!(errors.contains("path"));

        // Route-parameter syntax is not allowed in literal mock paths.
        let errors =
            Validator::validate_create(payload("/api/:id", &["GET"], "{}"), &[]).unwrap_err();
        assert!(errors.contains("path"));
    }

    #[test]
    fn management_paths_are_refused() {
        for reserved in ["/endpoint/", "/endpoint/some-id/", "/user/", "/health"] {
            let errors =
                Validator::validate_create(payload(reserved, &["GET"], "{}"), &[]).unwrap_err();
            assert!(errors.contains("path"), "{} should be refused", reserved);
        }

        // Deeper paths under the management prefix do not overlap its routes.
        assert!(Validator::validate_create(
            payload("/endpoint/deep/path/", &["GET"], "{}"),
            &[]
        )
        .is_ok());
    }

    #[test]
    fn empty_methods_list_is_rejected() {
        let errors = Validator::validate_create(payload("/x", &[], "{}"), &[]).unwrap_err();
        assert!(errors.contains("methods"));
    }

    #[test]
    fn duplicate_path_and_methods_is_rejected() {
        let existing = vec![stored("/api/v1/test", &["GET", "POST"])];
        // Method order does not matter for identity.
        let errors = Validator::validate_create(
            payload("/api/v1/test", &["POST", "GET"], "{}"),
            &existing,
        )
        .unwrap_err();
        assert!(errors.contains("path"));

        // Same path with a different method set is fine.
        assert!(
            Validator::validate_create(payload("/api/v1/test", &["GET"], "{}"), &existing).is_ok()
        );
    }

    #[test]
    fn update_excludes_the_record_itself_from_duplicate_check() {
        let current = stored("/api/v1/test", &["GET"]);
        let existing = vec![current.clone()];
        let def = Validator::validate_replace(
            payload("/api/v1/test", &["GET"], r#"{"a":1}"#),
            &current,
            &existing,
        )
        .unwrap();
        assert_eq!(def.id, current.id);
    }

    #[test]
    fn patch_keeps_omitted_fields() {
        let mut current = stored("/api/v1/test", &["GET"]);
        current.query_params = vec![QueryOverride {
            param: "city".to_string(),
            response: r#"{"city":"Tel-Aviv"}"#.to_string(),
        }];
        let existing = vec![current.clone()];

        let patch = EndpointPayload {
            response: Some(r#"{"name":"Bob"}"#.to_string()),
            ..Default::default()
        };
        let def = Validator::validate_patch(patch, &current, &existing).unwrap();
        assert_eq!(def.path, current.path);
        assert_eq!(def.methods, current.methods);
        assert_eq!(def.query_params, current.query_params);
        assert_eq!(def.response, r#"{"name":"Bob"}"#);
    }

    #[test]
    fn patch_into_existing_identity_is_rejected() {
        let first = stored("/api/v1/test", &["GET"]);
        let second = stored("/api/v1/people", &["GET"]);
        let existing = vec![first.clone(), second.clone()];

        let patch = EndpointPayload {
            path: Some("/api/v1/test".to_string()),
            ..Default::default()
        };
        let errors = Validator::validate_patch(patch, &second, &existing).unwrap_err();
        assert!(errors.contains("path"));
    }

    #[test]
    fn id_in_payload_never_changes_identity() {
        let current = stored("/api/v1/test", &["GET"]);
        let existing = vec![current.clone()];
        let patch = EndpointPayload {
            id: Some(serde_json::json!("some-other-id")),
            response: Some("{}".to_string()),
            ..Default::default()
        };
        let def = Validator::validate_patch(patch, &current, &existing).unwrap();
        assert_eq!(def.id, current.id);
    }

    #[test]
    fn malformed_query_override_is_rejected() {
        let mut p = payload("/x", &["GET"], "{}");
        p.query_params = Some(vec![QueryOverride {
            param: "city".to_string(),
            response: "oops".to_string(),
        }]);
        let errors = Validator::validate_create(p, &[]).unwrap_err();
        assert!(errors.contains("queryParams"));
    }

    #[test]
    fn user_requires_username_and_password() {
        let errors = Validator::validate_new_user(NewUser::default(), &[]).unwrap_err();
        assert!(errors.contains("username"));
        assert!(errors.contains("password"));

        let user = Validator::validate_new_user(
            NewUser {
                username: Some("admin".to_string()),
                password: Some("123456".to_string()),
            },
            &[],
        )
        .unwrap();
        assert_eq!(user.username, "admin");
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let existing = vec![User {
            id: generate_id(),
            username: "admin".to_string(),
            password: "123456".to_string(),
        }];
        let errors = Validator::validate_new_user(
            NewUser {
                username: Some("admin".to_string()),
                password: Some("123456".to_string()),
            },
            &existing,
        )
        .unwrap_err();
        assert!(errors.contains("username"));
    }
}
