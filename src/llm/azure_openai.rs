//! Azure OpenAI integration (GPT-4o, GPT-4o-mini, o3-mini).
//!
//! Calls the deployment-scoped Chat Completions endpoint. Model names
//! from the catalog are mapped to Azure deployment names; anything else
//! goes to the generic deployment when one is configured.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use super::http::HttpSender;
use super::{ProviderError, TextGenerator, ASSISTANT_SYSTEM_MESSAGE};
use crate::catalog::Provider;
use crate::types::PromptRequest;

// ---------------------------------------------------------------------------
// API types (shared with the other OpenAI-compatible vendors)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    #[serde(default)]
    pub message: Option<ChatMessage>,
}

impl ChatRequest {
    /// System + user message pair for a rendered prompt.
    pub(crate) fn for_prompt(request: &PromptRequest) -> Self {
        Self {
            model: None,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: ASSISTANT_SYSTEM_MESSAGE.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            max_tokens: request.params.max_tokens,
            reasoning_effort: None,
        }
    }
}

/// Pull the first choice's content out of a chat completion reply.
pub(crate) fn first_choice_text(
    sender: &HttpSender,
    body: serde_json::Value,
) -> Result<String, ProviderError> {
    let parsed: ChatResponse =
        serde_json::from_value(body).map_err(|e| sender.malformed(&e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .map(|m| m.content)
        .ok_or_else(|| sender.malformed("no choices in completion"))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Azure deployment names per catalog model.
#[derive(Debug, Clone)]
pub struct Deployments {
    pub gpt4o: String,
    pub gpt4o_mini: String,
    pub o3_mini: String,
    pub fallback: Option<String>,
}

impl Deployments {
    pub fn for_model(&self, model: &str) -> Option<&str> {
        match model {
            "gpt-4o" => Some(&self.gpt4o),
            "gpt-4o-mini" => Some(&self.gpt4o_mini),
            "o3-mini" => Some(&self.o3_mini),
            _ => self.fallback.as_deref(),
        }
    }
}

impl Default for Deployments {
    fn default() -> Self {
        Self {
            gpt4o: "gpt-4o".into(),
            gpt4o_mini: "gpt-4o-mini".into(),
            o3_mini: "o3-mini".into(),
            fallback: None,
        }
    }
}

pub struct AzureOpenAiClient {
    http: HttpSender,
    endpoint: Option<String>,
    api_key: Option<SecretString>,
    api_version: String,
    deployments: Deployments,
}

impl AzureOpenAiClient {
    pub fn new(
        http: HttpSender,
        endpoint: Option<String>,
        api_key: Option<SecretString>,
        api_version: String,
        deployments: Deployments,
    ) -> Self {
        Self {
            http,
            endpoint,
            api_key,
            api_version,
            deployments,
        }
    }

    fn completions_url(&self, endpoint: &str, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            deployment,
            self.api_version
        )
    }
}

#[async_trait]
impl TextGenerator for AzureOpenAiClient {
    async fn generate(&self, request: &PromptRequest) -> Result<String, ProviderError> {
        let started = Instant::now();
        let (Some(endpoint), Some(key)) = (&self.endpoint, &self.api_key) else {
            return Err(ProviderError::NotConfigured("Azure OpenAI".into()));
        };
        let deployment = self.deployments.for_model(&request.model).ok_or_else(|| {
            ProviderError::NotConfigured(format!("Azure OpenAI deployment for {}", request.model))
        })?;

        let mut body = ChatRequest::for_prompt(request);
        body.model = Some(deployment.to_string());
        if request.model == "o3-mini" {
            body.reasoning_effort = request.params.reasoning_effort.clone();
        }

        let url = self.completions_url(endpoint, deployment);
        let reply = self
            .http
            .post_json(&url, &[("api-key", key.expose_secret().clone())], &body)
            .await?;
        let text = first_choice_text(&self.http, reply)?;

        info!(
            model = %request.model,
            deployment,
            chars = text.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Azure OpenAI completion"
        );
        Ok(text)
    }

    fn provider(&self) -> Provider {
        Provider::AzureOpenAi
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationParams;
    use std::time::Duration;

    fn client(endpoint: Option<&str>) -> AzureOpenAiClient {
        AzureOpenAiClient::new(
            HttpSender::new("Azure OpenAI", Duration::from_secs(5), 0).unwrap(),
            endpoint.map(str::to_string),
            Some(SecretString::new("k".into())),
            "2024-08-01-preview".into(),
            Deployments::default(),
        )
    }

    #[test]
    fn test_deployment_mapping() {
        let mut d = Deployments::default();
        assert_eq!(d.for_model("gpt-4o-mini"), Some("gpt-4o-mini"));
        assert_eq!(d.for_model("davinci"), None);
        d.fallback = Some("generic".into());
        assert_eq!(d.for_model("davinci"), Some("generic"));
    }

    #[test]
    fn test_completions_url_trims_slash() {
        let c = client(Some("https://x.openai.azure.com/"));
        assert_eq!(
            c.completions_url("https://x.openai.azure.com/", "gpt-4o"),
            "https://x.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-08-01-preview"
        );
    }

    #[test]
    fn test_chat_request_shape() {
        let req = PromptRequest {
            model: "gpt-4o".into(),
            prompt: "Forklar bongen".into(),
            params: GenerationParams::default(),
        };
        let json = serde_json::to_value(ChatRequest::for_prompt(&req)).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Forklar bongen");
        assert_eq!(json["max_tokens"], 500);
        assert!(json.get("reasoning_effort").is_none());
        assert!(json.get("model").is_none());
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_not_configured() {
        let req = PromptRequest {
            model: "gpt-4o".into(),
            prompt: "p".into(),
            params: GenerationParams::default(),
        };
        let err = client(None).generate(&req).await.unwrap_err();
        assert!(err.is_not_configured());
    }
}
