//! Gemini 1.5 Flash integration.
//!
//! Prefers the Azure API Management facade; falls back to Google's
//! `generateContent` endpoint with an API key.
//!
//! Both backends take the same request body.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

use super::http::{text_at, HttpSender, PathSeg};
use super::{ProviderError, TextGenerator};
use crate::catalog::Provider;
use crate::types::PromptRequest;

const CANDIDATE_TEXT: [PathSeg; 6] = [
    PathSeg::Key("candidates"),
    PathSeg::Index(0),
    PathSeg::Key("content"),
    PathSeg::Key("parts"),
    PathSeg::Index(0),
    PathSeg::Key("text"),
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    max_output_tokens: u32,
}

impl GenerateContentRequest {
    fn from_prompt(request: &PromptRequest) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.params.temperature,
                top_p: request.params.top_p,
                max_output_tokens: request.params.max_tokens,
            },
        }
    }
}

pub struct GeminiClient {
    http: HttpSender,
    apim_endpoint: Option<String>,
    apim_key: Option<SecretString>,
    google_key: Option<SecretString>,
    google_url: String,
}

impl GeminiClient {
    pub fn new(
        http: HttpSender,
        apim_endpoint: Option<String>,
        apim_key: Option<SecretString>,
        google_key: Option<SecretString>,
        google_url: String,
    ) -> Self {
        Self {
            http,
            apim_endpoint,
            apim_key,
            google_key,
            google_url,
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &PromptRequest) -> Result<String, ProviderError> {
        let started = Instant::now();
        let body = GenerateContentRequest::from_prompt(request);

        let reply = match (&self.apim_endpoint, &self.apim_key, &self.google_key) {
            (Some(endpoint), Some(key), _) => {
                self.http
                    .post_json(
                        endpoint,
                        &[("Ocp-Apim-Subscription-Key", key.expose_secret().clone())],
                        &body,
                    )
                    .await?
            }
            (_, _, Some(key)) => {
                // Not `?key=`: transport errors echo the URL.
                self.http
                    .post_json(
                        &self.google_url,
                        &[("x-goog-api-key", key.expose_secret().clone())],
                        &body,
                    )
                    .await?
            }
            _ => return Err(ProviderError::NotConfigured("Gemini".into())),
        };

        let text = text_at(&reply, &CANDIDATE_TEXT)
            .ok_or_else(|| self.http.malformed("missing candidates[0].content.parts[0].text"))?;

        info!(
            model = %request.model,
            chars = text.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Gemini completion"
        );
        Ok(text)
    }

    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn is_configured(&self) -> bool {
        self.apim_key.is_some() || self.google_key.is_some()
    }
}
