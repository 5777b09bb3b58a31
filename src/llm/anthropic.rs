//! Claude 3.5 Sonnet integration.
//!
//! Prefers the Azure Databricks serving endpoint. When that is not
//! configured, falls back to the Anthropic Messages API directly.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

use super::http::{text_at, HttpSender, PathSeg};
use super::{ProviderError, TextGenerator};
use crate::catalog::Provider;
use crate::types::PromptRequest;

const ANTHROPIC_VERSION: &str = "2023-06-01";

const CONTENT_TEXT: [PathSeg; 3] = [PathSeg::Key("content"), PathSeg::Index(0), PathSeg::Key("text")];

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

impl MessagesRequest {
    fn user(request: &PromptRequest, model: Option<String>) -> Self {
        Self {
            model,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ClaudeClient {
    http: HttpSender,
    databricks_endpoint: Option<String>,
    databricks_key: Option<SecretString>,
    anthropic_key: Option<SecretString>,
    anthropic_url: String,
    anthropic_model: String,
}

impl ClaudeClient {
    pub fn new(
        http: HttpSender,
        databricks_endpoint: Option<String>,
        databricks_key: Option<SecretString>,
        anthropic_key: Option<SecretString>,
        anthropic_url: String,
        anthropic_model: String,
    ) -> Self {
        Self {
            http,
            databricks_endpoint,
            databricks_key,
            anthropic_key,
            anthropic_url,
            anthropic_model,
        }
    }

    async fn call_databricks(
        &self,
        endpoint: &str,
        key: &SecretString,
        request: &PromptRequest,
    ) -> Result<String, ProviderError> {
        let body = MessagesRequest::user(request, None);
        let reply = self
            .http
            .post_json(
                endpoint,
                &[("Authorization", format!("Bearer {}", key.expose_secret()))],
                &body,
            )
            .await?;
        text_at(&reply, &CONTENT_TEXT).ok_or_else(|| self.http.malformed("missing content[0].text"))
    }

    async fn call_anthropic(
        &self,
        key: &SecretString,
        request: &PromptRequest,
    ) -> Result<String, ProviderError> {
        let body = MessagesRequest::user(request, Some(self.anthropic_model.clone()));
        let reply = self
            .http
            .post_json(
                &self.anthropic_url,
                &[
                    ("x-api-key", key.expose_secret().clone()),
                    ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                ],
                &body,
            )
            .await?;
        text_at(&reply, &CONTENT_TEXT).ok_or_else(|| self.http.malformed("missing content[0].text"))
    }
}

#[async_trait]
impl TextGenerator for ClaudeClient {
    async fn generate(&self, request: &PromptRequest) -> Result<String, ProviderError> {
        let started = Instant::now();
        let text = match (&self.databricks_endpoint, &self.databricks_key, &self.anthropic_key) {
            (Some(endpoint), Some(key), _) => {
                debug!(model = %request.model, "Routing Claude via Azure Databricks");
                self.call_databricks(endpoint, key, request).await?
            }
            (_, _, Some(key)) => {
                debug!(model = %request.model, "Routing Claude via Anthropic API");
                self.call_anthropic(key, request).await?
            }
            _ => return Err(ProviderError::NotConfigured("Claude".into())),
        };

        info!(
            model = %request.model,
            chars = text.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Claude completion"
        );
        Ok(text)
    }

    fn provider(&self) -> Provider {
        Provider::Claude
    }

    fn is_configured(&self) -> bool {
        self.databricks_key.is_some() || self.anthropic_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationParams;

    #[test]
    fn test_messages_request_shape() {
        let req = PromptRequest {
            model: "claude-3-5-sonnet".into(),
            prompt: "Analyser".into(),
            params: GenerationParams {
                max_tokens: 1200,
                ..GenerationParams::default()
            },
        };
        let databricks = serde_json::to_value(MessagesRequest::user(&req, None)).unwrap();
        assert!(databricks.get("model").is_none());
        assert_eq!(databricks["max_tokens"], 1200);
        assert_eq!(databricks["messages"][0]["role"], "user");

        let direct = serde_json::to_value(MessagesRequest::user(
            &req,
            Some("claude-3-5-sonnet-20241022".into()),
        ))
        .unwrap();
        assert_eq!(direct["model"], "claude-3-5-sonnet-20241022");
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let client = ClaudeClient::new(
            HttpSender::new("Claude", std::time::Duration::from_secs(1), 0).unwrap(),
            Some("https://db.example".into()),
            None,
            None,
            "https://api.anthropic.com/v1/messages".into(),
            "claude-3-5-sonnet-20241022".into(),
        );
        assert!(!client.is_configured());
        let req = PromptRequest {
            model: "claude-3-5-sonnet".into(),
            prompt: "p".into(),
            params: GenerationParams::default(),
        };
        assert_eq!(
            client.generate(&req).await.unwrap_err().to_string(),
            "Claude not configured"
        );
    }
}
