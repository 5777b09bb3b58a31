//! Hugging Face Inference API fallback.
//!
//! Any model name outside the catalog lands here. A dedicated Inference
//! Endpoint is used when configured; otherwise the serverless API is
//! tried on the model route and then the text-generation pipeline route.
//! The payload and the reply shape depend on the model family.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::http::HttpSender;
use super::{ProviderError, TextGenerator};
use crate::catalog::Provider;
use crate::types::PromptRequest;

/// Keys tried, in order, on each reply object.
const LIST_TEXT_KEYS: [&str; 4] = ["generated_text", "summary_text", "answer", "label"];
const OBJECT_TEXT_KEYS: [&str; 3] = ["generated_text", "summary_text", "answer"];

pub struct HuggingFaceClient {
    http: HttpSender,
    token: Option<SecretString>,
    endpoint_url: Option<String>,
    api_base_url: String,
}

impl HuggingFaceClient {
    pub fn new(
        http: HttpSender,
        token: Option<SecretString>,
        endpoint_url: Option<String>,
        api_base_url: String,
    ) -> Self {
        Self {
            http,
            token,
            endpoint_url,
            api_base_url,
        }
    }

    fn candidate_urls(&self, model: &str) -> Vec<String> {
        match &self.endpoint_url {
            Some(url) => vec![url.clone()],
            None => {
                let base = self.api_base_url.trim_end_matches('/');
                vec![
                    format!("{base}/models/{model}"),
                    format!("{base}/pipeline/text-generation/{model}"),
                ]
            }
        }
    }

    /// Request body for the model family.
    pub fn payload(request: &PromptRequest) -> Value {
        let model = request.model.to_lowercase();
        let p = &request.params;

        if model.contains("bart") {
            json!({
                "inputs": request.prompt,
                "parameters": {
                    "max_length": p.max_length.min(500),
                    "temperature": p.temperature,
                    "do_sample": true,
                }
            })
        } else if model.contains("roberta") {
            json!({
                "inputs": {
                    "question": "What does this mean?",
                    "context": request.prompt,
                }
            })
        } else if model.contains("sentence-transformers") {
            json!({
                "inputs": {
                    "source_sentence": request.prompt,
                    "sentences": ["This is similar.", "This is different."],
                }
            })
        } else {
            json!({
                "inputs": request.prompt,
                "parameters": {
                    "max_length": p.max_length.min(250),
                    "temperature": p.temperature,
                    "top_p": p.top_p,
                    "do_sample": true,
                }
            })
        }
    }

    /// Pull generated text out of the various reply shapes.
    pub fn extract_text(reply: &Value) -> String {
        match reply {
            Value::Array(items) if !items.is_empty() => {
                let first = &items[0];
                if first.is_object() {
                    first_text(first, &LIST_TEXT_KEYS).unwrap_or_else(|| first.to_string())
                } else {
                    value_text(first)
                }
            }
            Value::Object(_) => {
                first_text(reply, &OBJECT_TEXT_KEYS).unwrap_or_else(|| reply.to_string())
            }
            other => value_text(other),
        }
    }
}

fn first_text(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .map(value_text)
        .find(|s| !s.is_empty())
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceClient {
    async fn generate(&self, request: &PromptRequest) -> Result<String, ProviderError> {
        let started = Instant::now();
        let payload = Self::payload(request);
        let headers: Vec<(&str, String)> = self
            .token
            .as_ref()
            .map(|t| vec![("Authorization", format!("Bearer {}", t.expose_secret()))])
            .unwrap_or_default();

        let mut last_error = None;
        for url in self.candidate_urls(&request.model) {
            debug!(model = %request.model, url = %url, "Calling Hugging Face");
            match self.http.post_json(&url, &headers, &payload).await {
                Ok(reply) => {
                    let text = Self::extract_text(&reply);
                    info!(
                        model = %request.model,
                        chars = text.len(),
                        latency_ms = started.elapsed().as_millis() as u64,
                        "Hugging Face generation"
                    );
                    return Ok(text);
                }
                Err(ProviderError::Api { status: 404, body, .. }) => {
                    warn!(model = %request.model, body = %body, "Model route returned 404");
                    last_error = Some(ProviderError::ModelNotFound(request.model.clone()));
                }
                Err(e @ ProviderError::Transport { .. }) => {
                    last_error = Some(e);
                }
                Err(ProviderError::Unauthorized(_)) => {
                    return Err(ProviderError::Unauthorized("Hugging Face".into()));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::ModelNotFound(request.model.clone())))
    }

    fn provider(&self) -> Provider {
        Provider::HuggingFace
    }

    fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}
