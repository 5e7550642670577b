//! wire shapes for grants.
//!
//! these mirror the admin api json: `guard_data` is kept as an untyped json
//! value here and is turned into a typed guard by gatehouse-grants.

use serde::{Deserialize, Serialize};

/// a guard/policy tuple as submitted to create or delete a grant.
///
/// also used for builtin grants in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantSpec {
    /// one of `access_token`, `x509`, `localhost`, `any`.
    pub guard_type: String,

    /// guard payload; its shape depends on `guard_type`.
    #[serde(default)]
    pub guard_data: serde_json::Value,

    /// policy conferred when the guard matches.
    pub policy: String,
}

impl GrantSpec {
    /// a grant that matches every request for the given policy.
    pub fn any(policy: impl Into<String>) -> Self {
        Self {
            guard_type: "any".to_string(),
            guard_data: serde_json::Value::Null,
            policy: policy.into(),
        }
    }
}

/// a stored grant as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantItem {
    /// guard type tag.
    pub guard_type: String,

    /// canonical guard payload.
    pub guard_data: serde_json::Value,

    /// policy conferred by the grant.
    pub policy: String,

    /// creation time (rfc3339).
    pub created_at: String,
}
