// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the relay gateway.
//!
//! [`RelayError`] is the internal error used across crate boundaries.
//! [`ApiError`] and [`ErrorCode`] form the closed wire taxonomy: every
//! failure a client can observe is one of these codes, rendered either as a
//! JSON envelope (non-stream endpoints) or as an SSE `error` frame (the
//! stream endpoint). Both renderings share [`ErrorEnvelope`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The primary error type used across relay crates.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (invalid TOML, unparsable policy strings).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The OpenRouter API key is not configured.
    #[error("OpenRouter API key is not configured")]
    MissingApiKey,

    /// Upstream provider returned a non-success status or streamed an error.
    #[error("upstream error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// A provider chunk could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A full-text query the search engine rejected.
    #[error("invalid search query: {0}")]
    InvalidQuery(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Closed set of wire-level error codes.
///
/// Serializes to the stable SCREAMING_SNAKE_CASE names clients match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SessionNotFound,
    ProfileNotFound,
    DocumentNotFound,
    MessageNotFound,
    UsageLogNotFound,
    MissingApiKey,
    MissingFilename,
    InvalidQuery,
    FileSaveFailed,
    FileDeleteFailed,
    #[serde(rename = "OPENROUTER_ERROR")]
    OpenRouterError,
    StreamError,
    RateLimited,
}

impl ErrorCode {
    /// The HTTP status this code maps to on non-stream endpoints.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::SessionNotFound
            | ErrorCode::ProfileNotFound
            | ErrorCode::DocumentNotFound
            | ErrorCode::MessageNotFound
            | ErrorCode::UsageLogNotFound => 404,
            ErrorCode::MissingApiKey
            | ErrorCode::MissingFilename
            | ErrorCode::InvalidQuery => 400,
            ErrorCode::FileSaveFailed
            | ErrorCode::FileDeleteFailed
            | ErrorCode::StreamError => 500,
            ErrorCode::OpenRouterError => 502,
            ErrorCode::RateLimited => 429,
        }
    }

    /// Stable machine-readable name, identical to the serde rendering.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::ProfileNotFound => "PROFILE_NOT_FOUND",
            ErrorCode::DocumentNotFound => "DOCUMENT_NOT_FOUND",
            ErrorCode::MessageNotFound => "MESSAGE_NOT_FOUND",
            ErrorCode::UsageLogNotFound => "USAGE_LOG_NOT_FOUND",
            ErrorCode::MissingApiKey => "MISSING_API_KEY",
            ErrorCode::MissingFilename => "MISSING_FILENAME",
            ErrorCode::InvalidQuery => "INVALID_QUERY",
            ErrorCode::FileSaveFailed => "FILE_SAVE_FAILED",
            ErrorCode::FileDeleteFailed => "FILE_DELETE_FAILED",
            ErrorCode::OpenRouterError => "OPENROUTER_ERROR",
            ErrorCode::StreamError => "STREAM_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
        }
    }
}

/// A typed API failure carrying everything needed to render an envelope.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub resource_type: Option<&'static str>,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    /// Overrides the code's HTTP status in SSE payloads. Used to surface the
    /// upstream status for `OPENROUTER_ERROR` frames.
    pub status_override: Option<u16>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            resource_type: None,
            resource_id: None,
            details: None,
            status_override: None,
        }
    }

    /// A 404 for a missing resource, e.g. `not_found(SessionNotFound,
    /// "session", id)` renders message "Session not found".
    pub fn not_found(
        code: ErrorCode,
        resource_type: &'static str,
        resource_id: impl Into<String>,
    ) -> Self {
        let mut message: Vec<char> = resource_type.chars().collect();
        if let Some(first) = message.first_mut() {
            *first = first.to_ascii_uppercase();
        }
        let message: String = message.into_iter().collect();
        Self {
            code,
            message: format!("{message} not found"),
            resource_type: Some(resource_type),
            resource_id: Some(resource_id.into()),
            details: None,
            status_override: None,
        }
    }

    pub fn missing_api_key() -> Self {
        Self::new(
            ErrorCode::MissingApiKey,
            "OpenRouter API key is not configured",
        )
    }

    /// An upstream provider failure; `status` is the provider's HTTP status
    /// when one was observed.
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status_override: status,
            ..Self::new(ErrorCode::OpenRouterError, message)
        }
    }

    pub fn stream_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StreamError, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The status reported inside SSE `error` payloads.
    pub fn sse_status(&self) -> u16 {
        self.status_override.unwrap_or_else(|| self.code.http_status())
    }

    /// Envelope for JSON bodies (the HTTP status line carries the status).
    pub fn json_envelope(&self, request_id: &str) -> ErrorEnvelope {
        self.envelope(request_id, false)
    }

    /// Envelope for SSE `error` frames, which embed the status explicitly
    /// because the stream endpoint always answers 200.
    pub fn sse_envelope(&self, request_id: &str) -> ErrorEnvelope {
        self.envelope(request_id, true)
    }

    fn envelope(&self, request_id: &str, include_status: bool) -> ErrorEnvelope {
        ErrorEnvelope {
            error_code: self.code,
            status: include_status.then(|| self.sse_status()),
            message: self.message.clone(),
            request_id: request_id.to_string(),
            resource_type: self.resource_type.map(str::to_string),
            resource_id: self.resource_id.clone(),
            details: self.details.clone(),
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::MissingApiKey => ApiError::missing_api_key(),
            RelayError::Upstream { status, message } => ApiError::upstream(status, message),
            RelayError::InvalidQuery(message) => ApiError::new(ErrorCode::InvalidQuery, message),
            RelayError::Timeout { duration } => ApiError::stream_error(format!(
                "upstream read exceeded inactivity deadline of {}s",
                duration.as_secs()
            )),
            other => ApiError::stream_error(other.to_string()),
        }
    }
}

/// The serialized error shape shared by JSON bodies and SSE `error` frames.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error_code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_serialize_to_stable_names() {
        for (code, name) in [
            (ErrorCode::SessionNotFound, "SESSION_NOT_FOUND"),
            (ErrorCode::MissingApiKey, "MISSING_API_KEY"),
            (ErrorCode::OpenRouterError, "OPENROUTER_ERROR"),
            (ErrorCode::RateLimited, "RATE_LIMITED"),
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{name}\""));
            assert_eq!(code.as_str(), name);
        }
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(ErrorCode::SessionNotFound.http_status(), 404);
        assert_eq!(ErrorCode::MissingApiKey.http_status(), 400);
        assert_eq!(ErrorCode::OpenRouterError.http_status(), 502);
        assert_eq!(ErrorCode::StreamError.http_status(), 500);
        assert_eq!(ErrorCode::RateLimited.http_status(), 429);
    }

    #[test]
    fn missing_api_key_sse_envelope_matches_wire_shape() {
        let err = ApiError::missing_api_key();
        let payload =
            serde_json::to_string(&err.sse_envelope("abc123")).unwrap();
        assert_eq!(
            payload,
            r#"{"error_code":"MISSING_API_KEY","status":400,"message":"OpenRouter API key is not configured","request_id":"abc123"}"#
        );
    }

    #[test]
    fn json_envelope_omits_status() {
        let err = ApiError::not_found(ErrorCode::SessionNotFound, "session", "missing");
        let value =
            serde_json::to_value(err.json_envelope("rid")).unwrap();
        assert!(value.get("status").is_none());
        assert_eq!(value["error_code"], "SESSION_NOT_FOUND");
        assert_eq!(value["message"], "Session not found");
        assert_eq!(value["resource_type"], "session");
        assert_eq!(value["resource_id"], "missing");
    }

    #[test]
    fn upstream_error_carries_provider_status_in_sse() {
        let err = ApiError::upstream(Some(429), "OpenRouter stream failed");
        assert_eq!(err.sse_status(), 429);
        assert_eq!(err.code.http_status(), 502);
    }

    #[test]
    fn relay_error_maps_into_taxonomy() {
        let api: ApiError = RelayError::MissingApiKey.into();
        assert_eq!(api.code, ErrorCode::MissingApiKey);

        let api: ApiError = RelayError::Upstream {
            status: Some(500),
            message: "boom".into(),
        }
        .into();
        assert_eq!(api.code, ErrorCode::OpenRouterError);
        assert_eq!(api.sse_status(), 500);

        let api: ApiError = RelayError::InvalidQuery("fts5: syntax error".into()).into();
        assert_eq!(api.code, ErrorCode::InvalidQuery);

        let api: ApiError = RelayError::Internal("oops".into()).into();
        assert_eq!(api.code, ErrorCode::StreamError);
    }
}
