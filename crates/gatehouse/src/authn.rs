//! request authentication and the authorization layer.
//!
//! every request is reduced to a [`CredentialContext`]:
//! - token id from `Authorization: Bearer {id}:{secret}` or
//!   `Authorization: Basic base64({id}:{secret})`, verified against the
//!   configured access tokens
//! - loopback flag from the peer socket address
//! - certificate subjects from a [`PeerCertificates`] extension, which the
//!   tls layer inserts after validating the client chain
//!
//! no `Authorization` header is not an error; the context is simply
//! anonymous. a header that is present but malformed or wrong is a 401.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use gatehouse_types::{CertSubject, CredentialContext, split_token};

use crate::AppState;
use crate::handlers::ApiError;

/// validated client certificate subjects for the current connection.
#[derive(Debug, Clone, Default)]
pub struct PeerCertificates(pub Vec<CertSubject>);

/// a presented `{id}:{secret}` token.
#[derive(Debug, PartialEq, Eq)]
struct PresentedToken {
    id: String,
    secret: String,
}

/// parse an `Authorization` header value.
///
/// returns `None` if the scheme is unsupported or the token is malformed.
fn parse_authorization(value: &str) -> Option<PresentedToken> {
    let (scheme, rest) = value.split_once(' ')?;
    let rest = rest.trim();

    let token = if scheme.eq_ignore_ascii_case("bearer") {
        rest.to_string()
    } else if scheme.eq_ignore_ascii_case("basic") {
        let decoded = STANDARD.decode(rest).ok()?;
        String::from_utf8(decoded).ok()?
    } else {
        return None;
    };

    let (id, secret) = split_token(&token)?;
    Some(PresentedToken {
        id: id.to_string(),
        secret: secret.to_string(),
    })
}

/// authenticate the token in `headers`, if any.
///
/// returns the verified token id.
fn authenticate_token(state: &AppState, headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::unauthorized("invalid Authorization header"))?;
    let token = parse_authorization(value)
        .ok_or_else(|| ApiError::unauthorized("invalid Authorization header format"))?;

    let verified = state
        .credentials
        .get(&token.id)
        .is_some_and(|cred| cred.verify(&token.secret));
    if !verified {
        tracing::info!(token_id = %token.id, "rejected access token");
        return Err(ApiError::unauthorized("invalid credentials"));
    }
    Ok(Some(token.id))
}

/// build the credential context for a request.
pub fn credential_context(state: &AppState, request: &Request) -> Result<CredentialContext, ApiError> {
    let mut ctx = CredentialContext::anonymous();

    if let Some(id) = authenticate_token(state, request.headers())? {
        ctx = ctx.with_token_id(id);
    }

    let loopback = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .is_some_and(|ConnectInfo(addr)| addr.ip().is_loopback());
    ctx = ctx.with_loopback(loopback);

    if let Some(PeerCertificates(subjects)) = request.extensions().get::<PeerCertificates>() {
        ctx = ctx.with_cert_subjects(subjects.iter().cloned());
    }

    Ok(ctx)
}

/// middleware: authorize the request path before running the handler.
pub async fn authorize_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = credential_context(&state, &request)?;
    state
        .authorizer
        .authorize(request.uri().path(), &ctx)
        .await?;
    Ok(next.run(request).await)
}
