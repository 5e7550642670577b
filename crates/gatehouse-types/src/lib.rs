//! core types for gatehouse - an authorization decision engine.
//!
//! this crate provides the data structures shared by every other gatehouse crate:
//! - [`CredentialContext`]: authenticated facts about a single request
//! - [`CertSubject`]: subject name of a validated x.509 client certificate
//! - [`GrantSpec`]: wire shape of a grant, as used by the admin api and config
//! - [`AccessTokenCredential`]: a configured access token
//! - [`Config`]: process configuration

mod access_token;
mod config;
mod credentials;
mod error;
mod grant_spec;

pub use access_token::{AccessTokenCredential, hash_secret, split_token};
pub use config::{
    Config, DEFAULT_KEY_PREFIX, ReadConsistency, StoreBackend, StoreConfig, normalize_route,
};
pub use credentials::{CertSubject, CredentialContext};
pub use error::Error;
pub use grant_spec::{GrantItem, GrantSpec};

/// result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;
