//! configuration types for gatehouse

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AccessTokenCredential, Error, GrantSpec};

/// default key prefix for grant lists in the replicated store.
pub const DEFAULT_KEY_PREFIX: &str = "/core/grant/";

/// main configuration for gatehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// address to bind the http server to.
    pub listen_addr: String,

    /// replicated grant store configuration.
    pub store: StoreConfig,

    /// route key -> ordered list of policies that may access it.
    ///
    /// keys are normalized by stripping trailing slashes.
    pub routes: BTreeMap<String, Vec<String>>,

    /// grants compiled into every process; never persisted.
    pub builtin_grants: Vec<GrantSpec>,

    /// policies that administrative create/delete/list operate on.
    pub managed_policies: Vec<String>,

    /// x.509 name patterns trusted under the `internal` policy on this process only.
    pub internal_subjects: Vec<serde_json::Value>,

    /// access tokens recognised by the authentication layer.
    pub access_tokens: Vec<AccessTokenCredential>,
}

impl Default for Config {
    fn default() -> Self {
        let readwrite = vec!["client-readwrite".to_string()];
        let routes = BTreeMap::from([
            ("/create-authorization-grant".to_string(), readwrite.clone()),
            ("/delete-authorization-grant".to_string(), readwrite),
            (
                "/list-authorization-grants".to_string(),
                vec!["client-readwrite".to_string(), "client-readonly".to_string()],
            ),
        ]);

        Self {
            listen_addr: "127.0.0.1:1999".to_string(),
            store: StoreConfig::default(),
            routes,
            builtin_grants: vec![GrantSpec::any("public")],
            managed_policies: vec![
                "client-readwrite".to_string(),
                "client-readonly".to_string(),
                "monitoring".to_string(),
                "network".to_string(),
            ],
            internal_subjects: Vec::new(),
            access_tokens: Vec::new(),
        }
    }
}

impl Config {
    /// check the configuration for structural problems.
    ///
    /// guard payloads (builtin grants, internal subjects) are validated when
    /// the authorizer is built, not here.
    pub fn validate(&self) -> Result<(), Error> {
        self.store.validate()?;

        for (route, policies) in &self.routes {
            if normalize_route(route) != route {
                return Err(Error::InvalidConfig(format!(
                    "route {route:?} must not end with '/'"
                )));
            }
            if policies.iter().any(String::is_empty) {
                return Err(Error::InvalidConfig(format!(
                    "route {route:?} lists an empty policy name"
                )));
            }
        }

        if self.managed_policies.iter().any(String::is_empty) {
            return Err(Error::InvalidConfig(
                "managed_policies contains an empty policy name".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for token in &self.access_tokens {
            token.validate()?;
            if !seen.insert(token.id.as_str()) {
                return Err(Error::InvalidCredential {
                    id: token.id.clone(),
                    reason: "duplicate token id".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// which backend holds distributed grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// process memory; lost on restart.
    #[default]
    Memory,
    /// sql database via sea-orm.
    Sql,
}

/// read consistency for distributed grant lookups.
///
/// `Stale` may observe a list older than the authoritative one, bounded by the
/// store's replication lag: a new grant can take that long to be honoured, and
/// a deleted grant can keep being honoured for that long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadConsistency {
    /// read from the local replica, possibly lagging.
    #[default]
    Stale,
    /// read the authoritative value.
    Linearizable,
}

/// replicated grant store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// storage backend.
    pub backend: StoreBackend,

    /// database url or sqlite path for the sql backend.
    pub connection_string: String,

    /// prefix prepended to the policy name to form the store key.
    pub key_prefix: String,

    /// consistency used by authorization reads.
    pub consistency: ReadConsistency,

    /// upper bound on a single authorization read, in milliseconds.
    pub read_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            connection_string: "sqlite:///var/lib/gatehouse/grants.sqlite?mode=rwc".to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            consistency: ReadConsistency::Stale,
            read_timeout_ms: 5000,
        }
    }
}

impl StoreConfig {
    /// the read timeout as a duration.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.key_prefix.is_empty() {
            return Err(Error::InvalidConfig(
                "store.key_prefix cannot be empty".to_string(),
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "store.read_timeout_ms must be positive".to_string(),
            ));
        }
        if self.backend == StoreBackend::Sql && self.connection_string.is_empty() {
            return Err(Error::InvalidConfig(
                "store.connection_string is required for the sql backend".to_string(),
            ));
        }
        Ok(())
    }
}

/// strip trailing slashes from a route key.
pub fn normalize_route(route: &str) -> &str {
    route.trim_end_matches('/')
}
