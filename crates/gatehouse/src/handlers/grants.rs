//! administrative grant endpoints.
//!
//! these only touch distributed grants; builtin and process-local grants
//! are never listed or modified here.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use gatehouse_types::{GrantItem, GrantSpec};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::AppState;

/// response body for the list endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListGrantsResponse {
    /// every stored grant across the managed policies.
    pub items: Vec<GrantItem>,
}

/// response body for the delete endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteGrantResponse {}

/// POST /create-authorization-grant
pub async fn create_grant(
    State(state): State<AppState>,
    body: Result<Json<GrantSpec>, JsonRejection>,
) -> Result<Json<GrantItem>, ApiError> {
    let Json(spec) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let grant = state.authorizer.store().create(&spec).await?;
    Ok(Json(grant.to_item()))
}

/// POST /delete-authorization-grant
pub async fn delete_grant(
    State(state): State<AppState>,
    body: Result<Json<GrantSpec>, JsonRejection>,
) -> Result<Json<DeleteGrantResponse>, ApiError> {
    let Json(spec) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    state.authorizer.store().delete(&spec).await?;
    Ok(Json(DeleteGrantResponse {}))
}

/// GET|POST /list-authorization-grants
pub async fn list_grants(
    State(state): State<AppState>,
) -> Result<Json<ListGrantsResponse>, ApiError> {
    let grants = state.authorizer.store().list().await?;
    Ok(Json(ListGrantsResponse {
        items: grants.iter().map(|grant| grant.to_item()).collect(),
    }))
}
