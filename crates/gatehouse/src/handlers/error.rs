//! api error handling for http handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gatehouse_grants::Error as GrantsError;

/// api error type for handler responses
#[derive(Debug)]
pub enum ApiError {
    /// malformed request body or invalid grant (400)
    BadRequest(String),
    /// missing or invalid credentials (401)
    Unauthorized(String),
    /// no grant permits the request (403)
    Forbidden(String),
    /// route has no policy configured (500)
    MissingPolicy(String),
    /// grant store could not be read (503)
    Unavailable(String),
}

impl ApiError {
    /// create bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// create unauthorized error
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// the status code this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::MissingPolicy(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<GrantsError> for ApiError {
    fn from(err: GrantsError) -> Self {
        match &err {
            GrantsError::NotAuthorized => Self::Forbidden(err.to_string()),
            GrantsError::MissingPolicy { .. } => Self::MissingPolicy(err.to_string()),
            GrantsError::StoreUnavailable(_) => Self::Unavailable(err.to_string()),
            GrantsError::InvalidGuard(_) | GrantsError::UnknownPolicy(_) => {
                Self::BadRequest(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::MissingPolicy(msg)
            | ApiError::Unavailable(msg) => msg,
        };
        (status, message).into_response()
    }
}
