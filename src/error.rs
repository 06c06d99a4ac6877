//! Domain-specific error types for compare-brief

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main error type for brief generation, sharing, and storage
#[derive(Error, Debug)]
pub enum BriefError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Upstream error: {message}")]
    Upstream {
        message: String,
        status: Option<u16>,
    },

    #[error("AI returned invalid JSON: {message}")]
    InvalidAiResponse { message: String, raw: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Request superseded by a newer request")]
    Cancelled,

    #[error("This link is invalid or corrupted: {message}")]
    Decode { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BriefError {
    /// Short machine-readable tag, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            BriefError::Config { .. } => "config",
            BriefError::InvalidInput { .. } => "invalid_input",
            BriefError::Upstream { .. } => "upstream",
            BriefError::InvalidAiResponse { .. } => "invalid_ai_response",
            BriefError::Timeout { .. } => "timeout",
            BriefError::Cancelled => "cancelled",
            BriefError::Decode { .. } => "decode",
            BriefError::Serialization { .. } => "serialization",
            BriefError::Storage { .. } => "storage",
            BriefError::Internal { .. } => "internal",
        }
    }

    /// Whether re-invoking the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BriefError::Upstream { .. }
                | BriefError::InvalidAiResponse { .. }
                | BriefError::Timeout { .. }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BriefError::Config { .. } => StatusCode::SERVICE_UNAVAILABLE,
            BriefError::InvalidInput { .. } | BriefError::Decode { .. } => StatusCode::BAD_REQUEST,
            BriefError::Upstream { .. } | BriefError::InvalidAiResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            BriefError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            BriefError::Cancelled => StatusCode::CONFLICT,
            BriefError::Serialization { .. }
            | BriefError::Storage { .. }
            | BriefError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for BriefError {
    fn from(err: anyhow::Error) -> Self {
        BriefError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BriefError {
    fn from(err: serde_json::Error) -> Self {
        BriefError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BriefError {
    fn from(err: std::io::Error) -> Self {
        BriefError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for BriefError {
    fn from(err: reqwest::Error) -> Self {
        BriefError::Upstream {
            message: format!("HTTP request failed: {}", err),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

/// Convert BriefError to a JSON error response
impl IntoResponse for BriefError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "retryable": self.is_retryable(),
        });
        if let BriefError::InvalidAiResponse { raw, .. } = &self {
            body["raw"] = json!(raw);
        }
        (status, axum::Json(body)).into_response()
    }
}

/// Result type alias for compare-brief operations
pub type Result<T> = std::result::Result<T, BriefError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_taxonomy() {
        assert!(
            BriefError::Upstream {
                message: "reset".into(),
                status: None
            }
            .is_retryable()
        );
        assert!(
            BriefError::InvalidAiResponse {
                message: "eof".into(),
                raw: "nope".into()
            }
            .is_retryable()
        );
        assert!(
            BriefError::Timeout {
                operation: "provider call".into(),
                timeout_ms: 10
            }
            .is_retryable()
        );
        assert!(
            !BriefError::Config {
                message: "no key".into()
            }
            .is_retryable()
        );
        assert!(
            !BriefError::Decode {
                message: "bad".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_status_codes_are_distinct_per_class() {
        let config = BriefError::Config {
            message: "x".into(),
        };
        let input = BriefError::InvalidInput {
            message: "x".into(),
        };
        let upstream = BriefError::Upstream {
            message: "x".into(),
            status: Some(500),
        };
        assert_eq!(config.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(input.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_ai_message() {
        let err = BriefError::InvalidAiResponse {
            message: "expected value at line 1".into(),
            raw: "hello".into(),
        };
        assert!(err.to_string().starts_with("AI returned invalid JSON"));
        assert_eq!(err.kind(), "invalid_ai_response");
    }
}
