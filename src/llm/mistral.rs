//! Mistral Large via Azure AI Model-as-a-Service.
//!
//! The serverless endpoint speaks the OpenAI chat format, so request and
//! response types are shared with the Azure OpenAI client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Instant;
use tracing::info;

use super::azure_openai::{first_choice_text, ChatRequest};
use super::http::HttpSender;
use super::{ProviderError, TextGenerator};
use crate::catalog::Provider;
use crate::types::PromptRequest;

pub struct MistralClient {
    http: HttpSender,
    endpoint: Option<String>,
    api_key: Option<SecretString>,
}

impl MistralClient {
    pub fn new(http: HttpSender, endpoint: Option<String>, api_key: Option<SecretString>) -> Self {
        Self {
            http,
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl TextGenerator for MistralClient {
    async fn generate(&self, request: &PromptRequest) -> Result<String, ProviderError> {
        let started = Instant::now();
        let (Some(endpoint), Some(key)) = (&self.endpoint, &self.api_key) else {
            return Err(ProviderError::NotConfigured("Mistral Large in Azure".into()));
        };

        let url = format!("{}/v1/chat/completions", endpoint.trim_end_matches('/'));
        let body = ChatRequest::for_prompt(request);
        let reply = self
            .http
            .post_json(
                &url,
                &[("Authorization", format!("Bearer {}", key.expose_secret()))],
                &body,
            )
            .await?;
        let text = first_choice_text(&self.http, reply)?;

        info!(
            model = %request.model,
            chars = text.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Mistral completion"
        );
        Ok(text)
    }

    fn provider(&self) -> Provider {
        Provider::Mistral
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
