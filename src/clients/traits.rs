use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::BriefError;

/// One system + user exchange sent to a chat provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response envelope")]
    Envelope { raw: String },
    #[error("provider credential rejected")]
    Unauthorized,
}

impl From<ProviderError> for BriefError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Transport(message) => BriefError::Upstream {
                message,
                status: None,
            },
            ProviderError::Status { status, body } => BriefError::Upstream {
                message: format!("provider returned HTTP {status}: {body}"),
                status: Some(status),
            },
            ProviderError::Envelope { raw } => BriefError::InvalidAiResponse {
                message: "response had no message content".to_string(),
                raw,
            },
            ProviderError::Unauthorized => BriefError::Config {
                message: "AI provider rejected the configured API key".to_string(),
            },
        }
    }
}

/// An external model that answers with free-form text
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Perform exactly one call and return the raw assistant text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError>;
}
