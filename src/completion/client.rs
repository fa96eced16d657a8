//! Ollama chat client
//!
//! Non-streaming completions over `POST /api/chat`. Every pipeline stage
//! sends a single user turn and waits for the whole reply.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::errors::{ClinicalError, Result};
use crate::providers::{ChatMessage, CompletionProvider};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default chat model
pub const DEFAULT_MODEL: &str = "llama3.2:3b";

/// Default request timeout; local inference on CPU can be slow
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Ollama chat client
#[derive(Debug, Clone)]
pub struct OllamaChatClient {
    client: Client,
    base_url: String,
}

impl OllamaChatClient {
    /// Create client for the default local endpoint
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create client with custom endpoint and timeout
    pub fn with_config(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClinicalError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionProvider for OllamaChatClient {
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let request = ChatRequest {
            model,
            messages,
            stream: false,
        };

        debug!(model, turns = messages.len(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClinicalError::completion(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClinicalError::completion(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClinicalError::completion(format!("Failed to parse response: {}", e)))?;

        Ok(body.message.content)
    }
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OllamaChatClient::new().unwrap();
        assert_eq!(client.base_url(), DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client =
            OllamaChatClient::with_config("http://localhost:11434/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_request_shape() {
        let messages = vec![ChatMessage::user("Patient description: cough")];
        let request = ChatRequest {
            model: DEFAULT_MODEL,
            messages: &messages,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3.2:3b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"model":"llama3.2:3b","message":{"role":"assistant","content":" Acute MI "},"done":true}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.message.content, " Acute MI ");
    }

    #[tokio::test]
    #[ignore] // Integration test - requires Ollama
    async fn test_chat_roundtrip() {
        let client = OllamaChatClient::new().unwrap();
        let reply = client
            .chat(DEFAULT_MODEL, &[ChatMessage::user("Reply with the word ok.")])
            .await
            .unwrap();
        assert!(!reply.trim().is_empty());
    }
}
