//! grant store adapter over the replicated key-value store.
//!
//! each policy's distributed grants live under `key_prefix + policy` as one
//! [`GrantList`]. reads decode leniently: a list that cannot be decoded is a
//! [`StoreFailure::Decode`], but an individual record that cannot be turned
//! into a [`Grant`] is skipped and logged. writes are read-modify-write with
//! compare-and-swap.

use gatehouse_store::{KvStore, ReadConsistency};
use gatehouse_types::GrantSpec;

use crate::error::{Error, Result, StoreFailure};
use crate::grant::Grant;
use crate::guard::Guard;
use crate::record::{GrantList, GrantRecord};

/// how many times a write retries after losing a compare-and-swap.
const MAX_WRITE_ATTEMPTS: usize = 8;

/// typed access to the grant lists held in a [`KvStore`].
#[derive(Clone)]
pub struct GrantStore<S> {
    kv: S,
    key_prefix: String,
    managed_policies: Vec<String>,
}

impl<S: KvStore> GrantStore<S> {
    /// wrap `kv`, storing lists under `key_prefix`.
    ///
    /// `managed_policies` bounds which policies the administrative
    /// operations may touch and which policies [`GrantStore::list`] reads.
    pub fn new(kv: S, key_prefix: impl Into<String>, managed_policies: Vec<String>) -> Self {
        Self {
            kv,
            key_prefix: key_prefix.into(),
            managed_policies,
        }
    }

    /// store key holding the list for `policy`.
    pub fn key_for(&self, policy: &str) -> String {
        format!("{}{}", self.key_prefix, policy)
    }

    /// the underlying key-value store.
    pub fn kv(&self) -> &S {
        &self.kv
    }

    /// policies administrative operations may modify.
    pub fn managed_policies(&self) -> &[String] {
        &self.managed_policies
    }

    /// read the raw records stored for `policy`.
    ///
    /// a key that was never written is an empty list.
    pub async fn load(
        &self,
        policy: &str,
        consistency: ReadConsistency,
    ) -> std::result::Result<Vec<GrantRecord>, StoreFailure> {
        let key = self.key_for(policy);
        let Some(entry) = self.kv.get(&key, consistency).await? else {
            return Ok(Vec::new());
        };
        let list = GrantList::from_cbor(&entry.value)
            .map_err(|reason| StoreFailure::Decode { key, reason })?;
        Ok(list.grants)
    }

    /// read the distributed grants for `policy`.
    ///
    /// records that fail to decode, or that claim a different policy than
    /// the key they are stored under, are skipped.
    pub async fn grants(
        &self,
        policy: &str,
        consistency: ReadConsistency,
    ) -> std::result::Result<Vec<Grant>, StoreFailure> {
        let records = self.load(policy, consistency).await?;
        Ok(records
            .iter()
            .filter_map(|record| decode_record(policy, record))
            .collect())
    }

    /// add a grant to its policy's list.
    ///
    /// if an equivalent grant is already stored the existing grant is
    /// returned and nothing is written.
    pub async fn create(&self, spec: &GrantSpec) -> Result<Grant> {
        self.ensure_managed(&spec.policy)?;
        let grant = Grant::from_spec(spec)?;
        let key = self.key_for(&grant.policy);

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let (mut records, version) = self.load_versioned(&key).await?;

            let existing = records
                .iter()
                .filter_map(|record| decode_record(&grant.policy, record))
                .find(|stored| stored.same_rule(&grant));
            if let Some(existing) = existing {
                tracing::debug!(
                    policy = %grant.policy,
                    guard_type = %grant.guard_type(),
                    "grant already exists"
                );
                return Ok(existing);
            }

            records.push(grant.to_record());
            if self.try_write(&key, version, records).await? {
                tracing::info!(
                    policy = %grant.policy,
                    guard_type = %grant.guard_type(),
                    "created grant"
                );
                return Ok(grant);
            }
        }

        Err(StoreFailure::Contention { key }.into())
    }

    /// remove every grant in `spec.policy` whose guard equals the spec's guard.
    ///
    /// returns how many grants were removed. removing a grant that does not
    /// exist succeeds with zero.
    pub async fn delete(&self, spec: &GrantSpec) -> Result<usize> {
        self.ensure_managed(&spec.policy)?;
        let guard = Guard::from_json(spec.guard_type.parse()?, &spec.guard_data)?;
        let key = self.key_for(&spec.policy);

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let (records, version) = self.load_versioned(&key).await?;
            let before = records.len();

            // records we cannot decode are kept; only an exact guard match is removed
            let kept: Vec<GrantRecord> = records
                .into_iter()
                .filter(|record| {
                    Grant::from_record(record)
                        .map(|stored| stored.guard != guard)
                        .unwrap_or(true)
                })
                .collect();

            let removed = before - kept.len();
            if removed == 0 {
                return Ok(0);
            }

            if self.try_write(&key, version, kept).await? {
                tracing::info!(
                    policy = %spec.policy,
                    guard_type = %guard.guard_type(),
                    removed,
                    "deleted grant"
                );
                return Ok(removed);
            }
        }

        Err(StoreFailure::Contention { key }.into())
    }

    /// every decodable grant across the managed policies, read linearizably.
    pub async fn list(&self) -> Result<Vec<Grant>> {
        let mut all = Vec::new();
        for policy in &self.managed_policies {
            all.extend(self.grants(policy, ReadConsistency::Linearizable).await?);
        }
        Ok(all)
    }

    fn ensure_managed(&self, policy: &str) -> Result<()> {
        if self.managed_policies.iter().any(|p| p == policy) {
            Ok(())
        } else {
            Err(Error::UnknownPolicy(policy.to_string()))
        }
    }

    async fn load_versioned(
        &self,
        key: &str,
    ) -> std::result::Result<(Vec<GrantRecord>, Option<u64>), StoreFailure> {
        let Some(entry) = self.kv.get(key, ReadConsistency::Linearizable).await? else {
            return Ok((Vec::new(), None));
        };
        let list = GrantList::from_cbor(&entry.value).map_err(|reason| StoreFailure::Decode {
            key: key.to_string(),
            reason,
        })?;
        Ok((list.grants, Some(entry.version)))
    }

    async fn try_write(
        &self,
        key: &str,
        version: Option<u64>,
        grants: Vec<GrantRecord>,
    ) -> std::result::Result<bool, StoreFailure> {
        let bytes = GrantList { grants }.to_cbor().map_err(StoreFailure::Encode)?;
        let written = self.kv.compare_and_swap(key, version, bytes).await?;
        if !written {
            tracing::debug!(key, "grant list changed underneath write, retrying");
        }
        Ok(written)
    }
}

fn decode_record(policy: &str, record: &GrantRecord) -> Option<Grant> {
    if record.policy != policy {
        tracing::warn!(
            policy,
            record_policy = %record.policy,
            guard_type = %record.guard_type,
            "skipping grant stored under another policy"
        );
        return None;
    }
    match Grant::from_record(record) {
        Ok(grant) => Some(grant),
        Err(e) => {
            tracing::warn!(
                policy,
                guard_type = %record.guard_type,
                error = %e,
                "skipping undecodable grant"
            );
            None
        }
    }
}
