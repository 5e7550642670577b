//! the authorization decision point.

use std::sync::Arc;

use gatehouse_store::KvStore;
use gatehouse_types::{Config, CredentialContext, normalize_route};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::grant::Grant;
use crate::guard::Guard;
use crate::registry::{GrantRegistry, RegistryOptions};
use crate::resolver::PolicyResolver;
use crate::store::GrantStore;
use crate::x509::X509Pattern;

/// policy that [`Authorizer::register_internal`] grants.
pub const INTERNAL_POLICY: &str = "internal";

/// decides whether a request may access a route.
///
/// cheap to clone; clones share the same registry, so a grant registered
/// through one handle is visible through all of them.
pub struct Authorizer<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    resolver: PolicyResolver,
    registry: GrantRegistry<S>,
}

impl<S> Clone for Authorizer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KvStore> Authorizer<S> {
    /// create an authorizer from its parts.
    pub fn new(resolver: PolicyResolver, registry: GrantRegistry<S>) -> Self {
        Self {
            inner: Arc::new(Inner { resolver, registry }),
        }
    }

    /// build an authorizer from process configuration.
    ///
    /// invalid builtin grants or internal subject patterns fail here rather
    /// than at request time.
    pub fn from_config(kv: S, config: &Config) -> Result<Self> {
        let builtin = config
            .builtin_grants
            .iter()
            .map(Grant::from_spec)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let store = GrantStore::new(
            kv,
            config.store.key_prefix.clone(),
            config.managed_policies.clone(),
        );
        let options = RegistryOptions {
            consistency: config.store.consistency,
            read_timeout: config.store.read_timeout(),
        };
        let registry = GrantRegistry::new(builtin, store, options);
        let resolver = PolicyResolver::new(config.routes.clone());

        let authorizer = Self::new(resolver, registry);
        for subject in &config.internal_subjects {
            authorizer.register_internal(subject)?;
        }
        Ok(authorizer)
    }

    /// authorize a request for `route` with the given credentials.
    ///
    /// returns `MissingPolicy` if the route has no configured policy,
    /// `StoreUnavailable` if distributed grants could not be read, and
    /// `NotAuthorized` if no grant matched.
    pub async fn authorize(&self, route: &str, ctx: &CredentialContext) -> Result<()> {
        let route = normalize_route(route);
        let Some(policies) = self.inner.resolver.policies_for(route) else {
            tracing::error!(route, "route has no configured policy");
            return Err(Error::MissingPolicy {
                route: route.to_string(),
            });
        };

        let grants = match self.inner.registry.grants_for(policies).await {
            Ok(grants) => grants,
            Err(e) => {
                tracing::warn!(route, error = %e, "cannot load grants");
                return Err(e);
            }
        };

        match grants.iter().find(|grant| grant.matches(ctx)) {
            Some(grant) => {
                tracing::debug!(
                    route,
                    policy = %grant.policy,
                    guard_type = %grant.guard_type(),
                    "permitted"
                );
                Ok(())
            }
            None => {
                tracing::info!(route, policies = ?policies, "not authorized");
                Err(Error::NotAuthorized)
            }
        }
    }

    /// trust certificates matching `pattern` under [`INTERNAL_POLICY`] in
    /// this process only.
    pub fn register_internal(&self, pattern: &Value) -> Result<()> {
        let pattern = X509Pattern::from_json(pattern)?;
        self.register_local(Grant::new(Guard::X509(pattern), INTERNAL_POLICY))
    }

    /// add a process-local grant.
    pub fn register_local(&self, grant: Grant) -> Result<()> {
        self.inner.registry.register_local(grant)
    }

    /// the distributed grant store.
    pub fn store(&self) -> &GrantStore<S> {
        self.inner.registry.store()
    }

    /// the merged grant registry.
    pub fn registry(&self) -> &GrantRegistry<S> {
        &self.inner.registry
    }

    /// the route resolver.
    pub fn resolver(&self) -> &PolicyResolver {
        &self.inner.resolver
    }
}
