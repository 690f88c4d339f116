//! Error handling for the gateway.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use warden_core::DenyStatus;

/// Challenge sent with every 401.
pub const BASIC_CHALLENGE: &str = r#"Basic realm="warden""#;

/// Application error type.
///
/// Messages are deliberately generic: the caller never learns whether the
/// username, the credential or the identity source was the problem.
#[derive(Debug, Error)]
pub enum AppError {
    /// Identity not established.
    #[error("full authentication is required to access this resource")]
    Unauthorized,
    /// Identity established but not permitted.
    #[error("access is denied")]
    Forbidden,
}

/// Error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error flag.
    pub error: bool,
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        };

        let body = ErrorResponse {
            error: true,
            code: code.to_string(),
            message: self.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BASIC_CHALLENGE),
            );
        }
        response
    }
}

impl From<DenyStatus> for AppError {
    fn from(status: DenyStatus) -> Self {
        match status {
            DenyStatus::Unauthorized => AppError::Unauthorized,
            DenyStatus::Forbidden => AppError::Forbidden,
        }
    }
}
