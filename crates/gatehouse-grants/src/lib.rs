//! grant-based authorization decisions for gatehouse.
//!
//! a grant pairs a guard (a predicate over the caller's credentials) with a
//! policy (an access tier). a route requires one or more policies, and a
//! request is permitted when any grant for any of those policies matches.
//! evaluation is deny-by-default with union composition.
//!
//! grants come from three places, merged per policy by [`GrantRegistry`]:
//! - builtin grants fixed at startup
//! - process-local grants added through [`Authorizer::register_local`] and
//!   [`Authorizer::register_internal`]; never replicated
//! - distributed grants read through [`GrantStore`] from the replicated store

#![warn(missing_docs)]

pub mod authorizer;
pub mod error;
pub mod grant;
pub mod guard;
pub mod matcher;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod x509;

pub use authorizer::{Authorizer, INTERNAL_POLICY};
pub use error::{Error, ParseError, Result, StoreFailure};
pub use grant::Grant;
pub use guard::{Guard, GuardType};
pub use matcher::matches;
pub use record::{GrantList, GrantRecord};
pub use registry::{GrantRegistry, RegistryOptions};
pub use resolver::PolicyResolver;
pub use store::GrantStore;
pub use x509::X509Pattern;
