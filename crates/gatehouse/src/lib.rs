//! gatehouse http server.
//!
//! serves the administrative grant api and puts every route behind the
//! authorizer: each request is turned into a [`CredentialContext`] by
//! [`authn::authorize_request`] and checked against the route's policies
//! before its handler runs.
//!
//! [`CredentialContext`]: gatehouse_types::CredentialContext

pub mod authn;
pub mod cli;
pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use gatehouse_grants::Authorizer;
use gatehouse_store::AnyStore;
use gatehouse_types::{AccessTokenCredential, Config};

pub use authn::PeerCertificates;

/// shared state for handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    /// authorization decision point, also owning the grant store.
    pub authorizer: Authorizer<AnyStore>,
    /// configured access tokens keyed by id.
    pub credentials: Arc<HashMap<String, AccessTokenCredential>>,
}

impl AppState {
    /// build state from an authorizer and the configured access tokens.
    pub fn new(authorizer: Authorizer<AnyStore>, config: &Config) -> Self {
        let credentials = config
            .access_tokens
            .iter()
            .map(|cred| (cred.id.clone(), cred.clone()))
            .collect();
        Self {
            authorizer,
            credentials: Arc::new(credentials),
        }
    }
}

/// create the axum router.
///
/// the authorization layer is applied per route, so unknown paths are a
/// plain 404 rather than a missing-policy error. `/health` is mounted after
/// the layer: it must report a failing store rather than be refused by it.
pub fn create_app(authorizer: Authorizer<AnyStore>, config: &Config) -> Router {
    let state = AppState::new(authorizer, config);

    Router::new()
        .route(
            "/create-authorization-grant",
            post(handlers::create_grant),
        )
        .route(
            "/delete-authorization-grant",
            post(handlers::delete_grant),
        )
        .route(
            "/list-authorization-grants",
            get(handlers::list_grants).post(handlers::list_grants),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authn::authorize_request,
        ))
        .route("/health", get(handlers::health))
        .with_state(state)
}
