use serde::{Deserialize, Serialize};

use crate::model::Id;

/// Minimal user record. Storage policy for `password` (hashing etc.) is out
/// of scope; uniqueness of `username` is enforced by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub password: String,
}

/// Client-submitted user fields; the validator requires both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}
