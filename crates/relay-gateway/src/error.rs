// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation of typed errors into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_core::{ApiError, RelayError};
use tracing::error;

/// An [`ApiError`] paired with the request id, ready to render as the
/// canonical JSON envelope.
#[derive(Debug)]
pub struct ApiFailure {
    pub error: ApiError,
    pub request_id: String,
}

impl ApiFailure {
    pub fn new(error: ApiError, request_id: impl Into<String>) -> Self {
        Self {
            error,
            request_id: request_id.into(),
        }
    }

    /// Maps an internal error, logging anything that lands in the 5xx
    /// bucket with the request id.
    pub fn from_relay(err: RelayError, request_id: &str) -> Self {
        let api: ApiError = match &err {
            RelayError::Storage { .. } | RelayError::Internal(_) | RelayError::Decode(_) => {
                error!(request_id, error = %err, "internal error");
                err.into()
            }
            _ => err.into(),
        };
        Self::new(api, request_id)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.error.json_envelope(&self.request_id))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::ErrorCode;

    #[test]
    fn failure_renders_matching_status() {
        let failure = ApiFailure::new(
            ApiError::not_found(ErrorCode::SessionNotFound, "session", "s1"),
            "rid",
        );
        let response = failure.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_errors_become_500() {
        let failure = ApiFailure::from_relay(
            RelayError::Internal("boom".to_string()),
            "rid",
        );
        let response = failure.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
