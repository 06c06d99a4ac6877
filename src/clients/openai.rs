//! OpenAI-compatible chat completions client

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::clients::traits::{ChatProvider, ChatRequest, ProviderError};
use crate::config::ProviderConfig;

#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

impl OpenAiChatClient {
    pub fn new(config: &ProviderConfig, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatProvider for OpenAiChatClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        debug!(
            "Requesting brief (model={}, prompt_chars={})",
            self.model,
            request.user.len()
        );

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &text));
        }

        let envelope: Value = serde_json::from_str(&text)
            .map_err(|_| ProviderError::Envelope { raw: text.clone() })?;
        extract_content(&envelope).ok_or(ProviderError::Envelope { raw: text })
    }
}

fn classify_status(status: u16, body: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Unauthorized,
        _ => ProviderError::Status {
            status,
            body: truncate_snippet(body.trim(), 500),
        },
    }
}

/// `choices[0].message.content` of a chat completion.
pub fn extract_content(envelope: &Value) -> Option<String> {
    envelope
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
}

fn truncate_snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_content() {
        let env = json!({"choices": [{"message": {"role": "assistant", "content": " {\"a\":1} "}}]});
        assert_eq!(extract_content(&env), Some("{\"a\":1}".to_string()));
        assert_eq!(extract_content(&json!({"choices": []})), None);
        assert_eq!(extract_content(&json!({"error": "x"})), None);
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(classify_status(401, ""), ProviderError::Unauthorized));
        match classify_status(503, &"x".repeat(800)) {
            ProviderError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body.chars().count(), 501);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = CompletionRequest {
            model: "m",
            messages: [
                Message {
                    role: "system",
                    content: "s",
                },
                Message {
                    role: "user",
                    content: "u",
                },
            ],
            temperature: 0.5,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["response_format"]["type"], "json_object");
    }
}
