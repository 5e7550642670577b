//! http handlers for gatehouse endpoints.

mod error;
mod grants;
mod health;

pub use error::ApiError;
pub use grants::{DeleteGrantResponse, ListGrantsResponse, create_grant, delete_grant, list_grants};
pub use health::health;
