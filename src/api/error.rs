// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Errors returned by the remote generation API.

use serde::Deserialize;
use thiserror::Error;

pub const QUOTA_MESSAGE: &str =
    "The API quota has been exhausted. Wait a while or check your plan's limits.";
pub const INVALID_KEY_MESSAGE: &str =
    "The API key was rejected. Check the key in Settings and save it again.";
pub const GENERIC_MESSAGE: &str = "The generation service returned an error.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{message}")]
    Remote {
        http_status: Option<u16>,
        status: Option<String>,
        message: String,
    },
    #[error("HTTP {status}")]
    HttpStatus { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("{0}")]
    EmptyResult(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    status: Option<String>,
    #[serde(default)]
    message: String,
}

impl ApiError {
    /// Build an error from a non-success response, preferring the structured
    /// `{"error": {...}}` payload when the body carries one.
    pub fn from_response(http_status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => ApiError::Remote {
                http_status: envelope.error.code.or(Some(http_status)),
                status: envelope.error.status,
                message: envelope.error.message,
            },
            Err(_) => ApiError::HttpStatus {
                status: http_status,
                body: body.to_string(),
            },
        }
    }

    pub fn is_quota_exhausted(&self) -> bool {
        match self {
            ApiError::Remote {
                http_status, status, ..
            } => *http_status == Some(429) || status.as_deref() == Some("RESOURCE_EXHAUSTED"),
            ApiError::HttpStatus { status, .. } => *status == 429,
            _ => false,
        }
    }

    pub fn is_invalid_credential(&self) -> bool {
        match self {
            ApiError::Remote {
                http_status,
                status,
                message,
            } => {
                matches!(http_status, Some(401) | Some(403))
                    || status.as_deref() == Some("UNAUTHENTICATED")
                    || message.contains("API_KEY_INVALID")
                    || message.contains("API key not valid")
            }
            ApiError::HttpStatus { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }

    /// Message suitable for the status line.
    pub fn user_message(&self) -> String {
        if self.is_quota_exhausted() {
            return QUOTA_MESSAGE.to_string();
        }
        if self.is_invalid_credential() {
            return INVALID_KEY_MESSAGE.to_string();
        }
        let raw = match self {
            ApiError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        };
        if raw.trim().is_empty() {
            GENERIC_MESSAGE.to_string()
        } else {
            raw
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_quota_error() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = ApiError::from_response(429, body);
        assert!(err.is_quota_exhausted());
        assert_eq!(err.user_message(), QUOTA_MESSAGE);
    }

    #[test]
    fn test_invalid_key_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        let err = ApiError::from_response(400, body);
        assert!(!err.is_quota_exhausted());
        assert_eq!(err.user_message(), INVALID_KEY_MESSAGE);
    }

    #[test]
    fn test_remote_message_passthrough() {
        let body = r#"{"error":{"code":500,"message":"Internal error encountered.","status":"INTERNAL"}}"#;
        assert_eq!(
            ApiError::from_response(500, body).user_message(),
            "Internal error encountered."
        );
    }

    #[test]
    fn test_unstructured_body_falls_back() {
        let err = ApiError::from_response(502, "<html>bad gateway</html>");
        assert!(matches!(err, ApiError::HttpStatus { status: 502, .. }));
        assert_eq!(err.user_message(), "HTTP 502");

        let empty = ApiError::Remote {
            http_status: Some(500),
            status: None,
            message: String::new(),
        };
        assert_eq!(empty.user_message(), GENERIC_MESSAGE);
    }
}
