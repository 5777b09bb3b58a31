//! LLM vendor integrations.
//!
//! Defines the `TextGenerator` trait and one client per vendor backend:
//! Azure OpenAI, Mistral (Azure AI), Claude (Azure Databricks or
//! Anthropic), Gemini (Azure API Management or Google) and the Hugging
//! Face Inference API as the catch-all fallback.

pub mod anthropic;
pub mod azure_openai;
pub mod gemini;
pub mod http;
pub mod huggingface;
pub mod mistral;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::Provider;
use crate::config::{AppConfig, Credentials};
use crate::types::{ModelsConfigured, PromptRequest};

use anthropic::ClaudeClient;
use azure_openai::{AzureOpenAiClient, Deployments};
use gemini::GeminiClient;
use http::HttpSender;
use huggingface::HuggingFaceClient;
use mistral::MistralClient;

/// System message sent to every chat-style vendor.
pub const ASSISTANT_SYSTEM_MESSAGE: &str = "Du er en hjelpsom AI-assistent for Norsk Rikstoto.";

/// Failure of a single vendor call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0} not configured")]
    NotConfigured(String),

    #[error("{0}")]
    ModelLoading(String),

    #[error("Model '{0}' not found. It may be private or require different access. Try another model.")]
    ModelNotFound(String),

    #[error("Authentication failed for {0}. Please check the API key.")]
    Unauthorized(String),

    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("{provider} error {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider} returned an unexpected response: {detail}")]
    MalformedResponse { provider: String, detail: String },
}

impl ProviderError {
    /// The vendor answered 503: the model is warming up.
    pub fn is_loading(&self) -> bool {
        matches!(self, ProviderError::ModelLoading(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout(_))
    }

    pub fn is_not_configured(&self) -> bool {
        matches!(self, ProviderError::NotConfigured(_))
    }
}

/// Abstraction over a vendor text-generation backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run the rendered prompt and return the generated text.
    async fn generate(&self, request: &PromptRequest) -> Result<String, ProviderError>;

    /// Which backend this client talks to.
    fn provider(&self) -> Provider;

    /// Whether credentials for this backend are present.
    fn is_configured(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// One client per provider, routed by model name.
#[derive(Clone)]
pub struct ProviderRegistry {
    azure_openai: Arc<dyn TextGenerator>,
    mistral: Arc<dyn TextGenerator>,
    claude: Arc<dyn TextGenerator>,
    gemini: Arc<dyn TextGenerator>,
    huggingface: Arc<dyn TextGenerator>,
}

impl ProviderRegistry {
    pub fn new(
        azure_openai: Arc<dyn TextGenerator>,
        mistral: Arc<dyn TextGenerator>,
        claude: Arc<dyn TextGenerator>,
        gemini: Arc<dyn TextGenerator>,
        huggingface: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            azure_openai,
            mistral,
            claude,
            gemini,
            huggingface,
        }
    }

    /// Route every provider to the same generator.
    pub fn uniform(generator: Arc<dyn TextGenerator>) -> Self {
        Self::new(
            generator.clone(),
            generator.clone(),
            generator.clone(),
            generator.clone(),
            generator,
        )
    }

    /// Build the real vendor clients from configuration and credentials.
    pub fn from_config(cfg: &AppConfig, creds: Credentials) -> Result<Self> {
        let timeout = Duration::from_secs(cfg.http.request_timeout_secs);
        let retries = cfg.http.max_retries;
        let sender = |name: &'static str| {
            HttpSender::new(name, timeout, retries)
                .with_context(|| format!("Failed to build {name} HTTP client"))
        };

        let azure = AzureOpenAiClient::new(
            sender("Azure OpenAI")?,
            creds.azure_openai_endpoint,
            creds.azure_openai_key,
            creds.azure_openai_api_version,
            Deployments {
                gpt4o: creds.gpt4o_deployment,
                gpt4o_mini: creds.gpt4o_mini_deployment,
                o3_mini: creds.o3_mini_deployment,
                fallback: creds.fallback_deployment,
            },
        );
        let mistral = MistralClient::new(sender("Mistral")?, creds.mistral_endpoint, creds.mistral_key);
        let claude = ClaudeClient::new(
            sender("Claude")?,
            creds.databricks_claude_endpoint,
            creds.databricks_key,
            creds.anthropic_key,
            cfg.providers.claude.anthropic_api_url.clone(),
            cfg.providers.claude.anthropic_model.clone(),
        );
        let gemini = GeminiClient::new(
            sender("Gemini")?,
            creds.gemini_apim_endpoint,
            creds.gemini_apim_key,
            creds.google_key,
            cfg.providers.gemini.google_api_url.clone(),
        );
        let huggingface = HuggingFaceClient::new(
            sender("Hugging Face")?,
            creds.huggingface_token,
            creds.inference_endpoint_url,
            cfg.providers.huggingface.api_base_url.clone(),
        );

        Ok(Self::new(
            Arc::new(azure),
            Arc::new(mistral),
            Arc::new(claude),
            Arc::new(gemini),
            Arc::new(huggingface),
        ))
    }

    pub fn get(&self, provider: Provider) -> &Arc<dyn TextGenerator> {
        match provider {
            Provider::AzureOpenAi => &self.azure_openai,
            Provider::Mistral => &self.mistral,
            Provider::Claude => &self.claude,
            Provider::Gemini => &self.gemini,
            Provider::HuggingFace => &self.huggingface,
        }
    }

    /// Client responsible for `model`.
    pub fn route(&self, model: &str) -> &Arc<dyn TextGenerator> {
        self.get(Provider::for_model(model))
    }

    pub fn models_configured(&self) -> ModelsConfigured {
        ModelsConfigured {
            azure_openai: self.azure_openai.is_configured(),
            mistral: self.mistral.is_configured(),
            claude: self.claude.is_configured(),
            gemini: self.gemini.is_configured(),
        }
    }

    pub fn huggingface_configured(&self) -> bool {
        self.huggingface.is_configured()
    }
}
