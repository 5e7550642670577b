//! merged view over builtin, process-local and distributed grants.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use gatehouse_store::{KvStore, ReadConsistency};

use crate::error::{Result, StoreFailure};
use crate::grant::Grant;
use crate::store::GrantStore;

/// how the registry reads distributed grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryOptions {
    /// consistency requested for every distributed read.
    pub consistency: ReadConsistency,
    /// upper bound on one [`GrantRegistry::grants_for`] call's store reads.
    pub read_timeout: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            consistency: ReadConsistency::Stale,
            read_timeout: Duration::from_secs(5),
        }
    }
}

/// all grants known to this process, keyed by policy.
///
/// builtin grants are fixed at construction. process-local grants are held
/// copy-on-write: registration clones the map and swaps in a new `Arc`, so a
/// reader always iterates a consistent snapshot.
pub struct GrantRegistry<S> {
    builtin: Vec<Grant>,
    local: RwLock<Arc<HashMap<String, Vec<Grant>>>>,
    store: GrantStore<S>,
    options: RegistryOptions,
}

impl<S: KvStore> GrantRegistry<S> {
    /// create a registry over `store` with the given builtin grants.
    pub fn new(builtin: Vec<Grant>, store: GrantStore<S>, options: RegistryOptions) -> Self {
        Self {
            builtin,
            local: RwLock::new(Arc::new(HashMap::new())),
            store,
            options,
        }
    }

    /// every grant for any of `policies`.
    ///
    /// fails with `StoreUnavailable` if a distributed read fails or does not
    /// finish within the configured timeout. a policy with no grants anywhere
    /// contributes nothing.
    pub async fn grants_for(&self, policies: &[String]) -> Result<Vec<Grant>> {
        let local = self.local_snapshot();
        let mut merged = Vec::new();

        for policy in policies {
            merged.extend(
                self.builtin
                    .iter()
                    .filter(|grant| &grant.policy == policy)
                    .cloned(),
            );
            if let Some(grants) = local.get(policy) {
                merged.extend(grants.iter().cloned());
            }
        }

        let distributed = tokio::time::timeout(self.options.read_timeout, async {
            let mut grants = Vec::new();
            for policy in policies {
                grants.extend(self.store.grants(policy, self.options.consistency).await?);
            }
            Ok::<_, StoreFailure>(grants)
        })
        .await
        .map_err(|_| StoreFailure::Timeout(self.options.read_timeout))??;

        merged.extend(distributed);
        Ok(merged)
    }

    /// add a process-local grant.
    ///
    /// the guard is validated first; an invalid guard is returned as an
    /// error and nothing is registered.
    pub fn register_local(&self, grant: Grant) -> Result<()> {
        grant.guard.validate()?;

        let mut local = self.local.write().unwrap_or_else(|e| e.into_inner());
        let mut next = (**local).clone();
        tracing::debug!(
            policy = %grant.policy,
            guard_type = %grant.guard_type(),
            "registered local grant"
        );
        next.entry(grant.policy.clone()).or_default().push(grant);
        *local = Arc::new(next);
        Ok(())
    }

    /// process-local grants for `policy`.
    pub fn local_grants(&self, policy: &str) -> Vec<Grant> {
        self.local_snapshot()
            .get(policy)
            .cloned()
            .unwrap_or_default()
    }

    /// builtin grants.
    pub fn builtin_grants(&self) -> &[Grant] {
        &self.builtin
    }

    /// the distributed grant store.
    pub fn store(&self) -> &GrantStore<S> {
        &self.store
    }

    fn local_snapshot(&self) -> Arc<HashMap<String, Vec<Grant>>> {
        let local = self.local.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ParseError};
    use crate::guard::Guard;
    use crate::x509::X509Pattern;
    use gatehouse_store::{MemoryStore, ReplicationMode};
    use gatehouse_types::{DEFAULT_KEY_PREFIX, GrantSpec};
    use serde_json::json;

    fn registry(kv: MemoryStore, options: RegistryOptions) -> GrantRegistry<MemoryStore> {
        let store = GrantStore::new(
            kv,
            DEFAULT_KEY_PREFIX,
            vec!["client-readwrite".to_string(), "network".to_string()],
        );
        GrantRegistry::new(vec![Grant::new(Guard::Any, "public")], store, options)
    }

    fn policies(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_merges_all_sources() {
        let kv = MemoryStore::default();
        let reg = registry(kv, RegistryOptions::default());

        reg.register_local(Grant::new(Guard::Localhost, "network"))
            .unwrap();
        reg.store()
            .create(&GrantSpec {
                guard_type: "access_token".to_string(),
                guard_data: json!({"id": "tok123"}),
                policy: "network".to_string(),
            })
            .await
            .unwrap();

        let grants = reg
            .grants_for(&policies(&["public", "network"]))
            .await
            .unwrap();
        let types: Vec<&str> = grants.iter().map(|g| g.guard_type().as_str()).collect();
        assert_eq!(types, vec!["any", "localhost", "access_token"]);
    }

    #[tokio::test]
    async fn test_unknown_policy_is_empty() {
        let reg = registry(MemoryStore::default(), RegistryOptions::default());
        let grants = reg.grants_for(&policies(&["nobody"])).await.unwrap();
        assert!(grants.is_empty());
    }

    #[test]
    fn test_register_local_rejects_empty_pattern() {
        let reg = registry(MemoryStore::default(), RegistryOptions::default());
        let err = reg
            .register_local(Grant::new(Guard::X509(X509Pattern::default()), "internal"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidGuard(ParseError::EmptyPattern)));
        assert!(reg.local_grants("internal").is_empty());
    }

    #[tokio::test]
    async fn test_stale_reads_lag_until_replicated() {
        let kv = MemoryStore::new(ReplicationMode::Manual);
        let reg = registry(kv.clone(), RegistryOptions::default());
        reg.store()
            .create(&GrantSpec {
                guard_type: "any".to_string(),
                guard_data: json!(null),
                policy: "network".to_string(),
            })
            .await
            .unwrap();

        let network = policies(&["network"]);
        assert!(reg.grants_for(&network).await.unwrap().is_empty());
        kv.replicate();
        assert_eq!(reg.grants_for(&network).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_linearizable_reads_see_unreplicated_writes() {
        let kv = MemoryStore::new(ReplicationMode::Manual);
        let reg = registry(
            kv,
            RegistryOptions {
                consistency: ReadConsistency::Linearizable,
                ..Default::default()
            },
        );
        reg.store()
            .create(&GrantSpec {
                guard_type: "any".to_string(),
                guard_data: json!(null),
                policy: "network".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(reg.grants_for(&policies(&["network"])).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_registration_and_reads() {
        let reg = Arc::new(registry(MemoryStore::default(), RegistryOptions::default()));
        let network = policies(&["network"]);

        let mut tasks = Vec::new();
        for i in 0..16 {
            let reg = Arc::clone(&reg);
            let network = network.clone();
            tasks.push(tokio::spawn(async move {
                reg.register_local(Grant::new(
                    Guard::AccessToken {
                        id: format!("tok{i}"),
                    },
                    "network",
                ))
                .unwrap();
                reg.grants_for(&network).await.unwrap().len()
            }));
        }
        for task in tasks {
            let seen = task.await.unwrap();
            assert!((1..=16).contains(&seen));
        }
        assert_eq!(reg.local_grants("network").len(), 16);
    }
}
