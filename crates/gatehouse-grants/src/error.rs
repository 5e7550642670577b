//! error types for gatehouse-grants.

use std::time::Duration;

use thiserror::Error;

use crate::guard::GuardType;

/// errors that can occur in gatehouse-grants.
#[derive(Debug, Error)]
pub enum Error {
    /// the route has no configured policy. this is a deployment defect,
    /// not an access decision.
    #[error("missing policy on route {route:?}")]
    MissingPolicy {
        /// normalized route key.
        route: String,
    },

    /// no grant matched the request's credentials.
    #[error("not authorized")]
    NotAuthorized,

    /// the replicated store could not be read or its contents decoded.
    #[error("grant store unavailable: {0}")]
    StoreUnavailable(#[from] StoreFailure),

    /// a guard payload failed validation at registration or creation time.
    #[error("invalid guard: {0}")]
    InvalidGuard(#[from] ParseError),

    /// administrative operation on a policy outside the managed set.
    #[error("unknown policy {0:?}")]
    UnknownPolicy(String),
}

/// why the replicated store was unavailable.
#[derive(Debug, Error)]
pub enum StoreFailure {
    /// the store rejected or failed the operation.
    #[error("{0}")]
    Store(#[from] gatehouse_store::Error),

    /// the stored grant list could not be decoded.
    #[error("cannot decode grant list at {key:?}: {reason}")]
    Decode {
        /// store key of the list.
        key: String,
        /// decoder error message.
        reason: String,
    },

    /// the grant list could not be encoded for writing.
    #[error("cannot encode grant list: {0}")]
    Encode(String),

    /// the read did not complete in time.
    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    /// concurrent writers kept winning the compare-and-swap.
    #[error("too much write contention on {key:?}")]
    Contention {
        /// store key of the list.
        key: String,
    },
}

/// parse errors for guard payloads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// guard type tag is not one of the known types.
    #[error("unknown guard type: {0}")]
    UnknownGuardType(String),

    /// guard data is not valid json or has the wrong shape.
    #[error("invalid guard data: {0}")]
    InvalidData(String),

    /// x.509 pattern names an attribute that does not exist.
    #[error("unknown x509 attribute: {0}")]
    UnknownAttribute(String),

    /// x.509 attribute value has the wrong type.
    #[error("invalid value for x509 attribute {name}: {reason}")]
    InvalidAttribute {
        /// attribute key as given.
        name: String,
        /// what was wrong with it.
        reason: String,
    },

    /// x.509 pattern mixes a nested `subject` object with flat attributes.
    #[error("x509 guard data cannot mix \"subject\" with flat attributes")]
    AmbiguousSubject,

    /// x.509 pattern constrains nothing, so it would match every certificate.
    #[error("x509 pattern must constrain at least one attribute")]
    EmptyPattern,

    /// access-token guard without an id.
    #[error("access token guard requires a non-empty id")]
    EmptyTokenId,

    /// guard type takes no payload but one was given.
    #[error("{0} guard takes no guard data")]
    UnexpectedData(GuardType),
}

/// result type for gatehouse-grants operations.
pub type Result<T> = std::result::Result<T, Error>;
