//! error types for gatehouse-types.

use thiserror::Error;

/// errors that can occur when validating core types.
#[derive(Debug, Error)]
pub enum Error {
    /// configuration is structurally invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// access token credential is malformed.
    #[error("invalid access token credential {id:?}: {reason}")]
    InvalidCredential {
        /// the token id the credential was configured for.
        id: String,
        /// why the credential was rejected.
        reason: String,
    },
}
