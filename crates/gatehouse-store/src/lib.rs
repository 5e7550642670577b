//! key-value storage layer for gatehouse.
//!
//! distributed grants live in a replicated store as one serialized list per
//! policy. this crate defines the narrow contract the rest of gatehouse needs
//! from that store ([`KvStore`]) and provides two backends:
//! - [`MemoryStore`]: primary + replica maps with controllable replication lag
//! - [`SqlStore`]: durable sea-orm backed table
//!
//! [`AnyStore`] selects between them at runtime from [`StoreConfig`].

#![warn(missing_docs)]

mod entity;
mod error;
mod memory;
mod migration;
mod sql;

pub use error::Error;
pub use gatehouse_types::ReadConsistency;
pub use memory::{MemoryStore, ReplicationMode};
pub use sql::SqlStore;

use std::future::Future;

use gatehouse_types::{StoreBackend, StoreConfig};

/// result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// a stored value with the version it was written at.
///
/// versions start at 1 and increase by one on every successful write to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    /// raw stored bytes.
    pub value: Vec<u8>,
    /// write version of this value.
    pub version: u64,
}

/// replicated key-value store contract.
///
/// reads take an explicit [`ReadConsistency`]; writes are compare-and-swap so
/// callers can implement read-modify-write without lost updates.
pub trait KvStore: Send + Sync {
    /// verify the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// read a key. returns `None` if the key has never been written.
    fn get(
        &self,
        key: &str,
        consistency: ReadConsistency,
    ) -> impl Future<Output = Result<Option<Versioned>>> + Send;

    /// write `value` only if the key is currently at `expected_version`.
    ///
    /// `None` means the key must not exist yet. returns `false` without
    /// writing if the current version differs.
    fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: Vec<u8>,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// a store backend chosen at runtime.
#[derive(Clone)]
pub enum AnyStore {
    /// in-memory store.
    Memory(MemoryStore),
    /// sql-backed store.
    Sql(SqlStore),
}

impl AnyStore {
    /// open the backend described by `config`.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        match config.backend {
            StoreBackend::Memory => Ok(Self::Memory(MemoryStore::new(
                ReplicationMode::Synchronous,
            ))),
            StoreBackend::Sql => Ok(Self::Sql(SqlStore::connect(&config.connection_string).await?)),
        }
    }

    /// release backend resources. a no-op for the in-memory store.
    pub async fn close(&self) -> Result<()> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Sql(s) => s.close().await,
        }
    }
}

impl KvStore for AnyStore {
    async fn ping(&self) -> Result<()> {
        match self {
            Self::Memory(s) => s.ping().await,
            Self::Sql(s) => s.ping().await,
        }
    }

    async fn get(&self, key: &str, consistency: ReadConsistency) -> Result<Option<Versioned>> {
        match self {
            Self::Memory(s) => s.get(key, consistency).await,
            Self::Sql(s) => s.get(key, consistency).await,
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: Vec<u8>,
    ) -> Result<bool> {
        match self {
            Self::Memory(s) => s.compare_and_swap(key, expected_version, value).await,
            Self::Sql(s) => s.compare_and_swap(key, expected_version, value).await,
        }
    }
}
