//! Scriptable in-memory provider.
//!
//! Records every prompt it receives and answers from a per-model script,
//! so tests can assert on what reached the vendor layer without any
//! network access.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rikstoto_wrapper::catalog::Provider;
use rikstoto_wrapper::llm::{ProviderError, TextGenerator};
use rikstoto_wrapper::types::PromptRequest;

#[derive(Clone)]
pub struct MockProvider {
    provider: Provider,
    configured: bool,
    replies: Arc<Mutex<HashMap<String, String>>>,
    requests: Arc<Mutex<Vec<PromptRequest>>>,
    /// If set, every call fails with a vendor error carrying this body.
    force_error: Arc<Mutex<Option<String>>>,
    delay: Option<Duration>,
}

impl MockProvider {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            configured: true,
            replies: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            force_error: Arc::new(Mutex::new(None)),
            delay: None,
        }
    }

    pub fn unconfigured(provider: Provider) -> Self {
        Self {
            configured: false,
            ..Self::new(provider)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn reply(&self, model: &str, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(model.to_string(), text.to_string());
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<PromptRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockProvider {
    async fn generate(&self, request: &PromptRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if !self.configured {
            return Err(ProviderError::NotConfigured(self.provider.as_str().to_string()));
        }
        if let Some(body) = self.force_error.lock().unwrap().clone() {
            return Err(ProviderError::Api {
                provider: self.provider.as_str().to_string(),
                status: 400,
                body,
            });
        }

        let scripted = self.replies.lock().unwrap().get(&request.model).cloned();
        Ok(scripted.unwrap_or_else(|| format!("{} svarte", request.model)))
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
