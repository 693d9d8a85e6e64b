//! Wire response envelope.
//!
//! Success: `{ "success": true, "statusCode": 200, "message": "...", "data": {...} }`
//! Error:   `{ "success": false, "statusCode": 409, "message": "..." }`
//!
//! The field names and shapes are a stable contract with deployed clients.
//! With the `axum` feature, both [`ApiResponse`] and [`AuthError`] implement
//! `IntoResponse`.

use crate::error::{AuthError, ErrorKind};
use serde::{Deserialize, Serialize};

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// `true` on success.
    pub success: bool,

    /// HTTP status code, repeated in the body.
    pub status_code: u16,

    /// Human-readable message.
    pub message: String,

    /// Payload. Omitted when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`.
    #[must_use]
    pub fn ok(status_code: u16, message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            status_code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Successful response with no payload.
    #[must_use]
    pub fn message_only(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status_code,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    /// Error envelope for `err`.
    ///
    /// Internal errors are logged here with their diagnostic detail, and the
    /// client only sees "Internal server error.".
    #[must_use]
    pub fn from_error(err: &AuthError) -> Self {
        match err.kind() {
            ErrorKind::Internal => {
                tracing::error!(error = %err, "Internal server error");
            }
            _ if err.is_security_issue() => {
                tracing::warn!(error = %err, "Request rejected");
            }
            _ => {}
        }

        Self {
            success: false,
            status_code: err.status_code(),
            message: err.client_message(),
            data: None,
        }
    }
}

impl From<&AuthError> for ApiResponse<()> {
    fn from(err: &AuthError) -> Self {
        Self::from_error(err)
    }
}

#[cfg(feature = "axum")]
mod axum_impl {
    use super::{ApiResponse, AuthError};
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use serde::Serialize;

    impl<T: Serialize> IntoResponse for ApiResponse<T> {
        fn into_response(self) -> Response {
            let status =
                StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(self)).into_response()
        }
    }

    impl IntoResponse for AuthError {
        fn into_response(self) -> Response {
            ApiResponse::from_error(&self).into_response()
        }
    }
}
