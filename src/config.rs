//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field has a default, so a missing file still yields a usable
//! configuration. Vendor secrets are referenced by env-var name in the
//! config and resolved once at startup into [`Credentials`].

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Directory holding a pre-built frontend. Served only if it exists.
    pub frontend_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["http://localhost:3001".to_string()],
            frontend_dir: "../frontend/build".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL shared by the session JSON cache and the response cache.
    pub ttl_minutes: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_minutes: 30 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    /// Upper bound for each model in `/generate-all`.
    pub parallel_timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 1,
            parallel_timeout_secs: 30,
            probe_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub azure_openai: AzureOpenAiConfig,
    pub mistral: MistralConfig,
    pub claude: ClaudeConfig,
    pub gemini: GeminiConfig,
    pub huggingface: HuggingFaceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AzureOpenAiConfig {
    pub api_key_env: String,
    pub endpoint_env: String,
    pub api_version_env: String,
    pub default_api_version: String,
    pub gpt4o_deployment_env: String,
    pub gpt4o_mini_deployment_env: String,
    pub o3_mini_deployment_env: String,
    pub fallback_deployment_env: String,
}

impl Default for AzureOpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "AZURE_OPENAI_API_KEY".into(),
            endpoint_env: "AZURE_OPENAI_ENDPOINT".into(),
            api_version_env: "AZURE_OPENAI_API_VERSION".into(),
            default_api_version: "2024-08-01-preview".into(),
            gpt4o_deployment_env: "AZURE_OPENAI_GPT4O_DEPLOYMENT".into(),
            gpt4o_mini_deployment_env: "AZURE_OPENAI_GPT4O_MINI_DEPLOYMENT".into(),
            o3_mini_deployment_env: "AZURE_OPENAI_O3_MINI_DEPLOYMENT".into(),
            fallback_deployment_env: "AZURE_OPENAI_DEPLOYMENT_NAME".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MistralConfig {
    pub endpoint_env: String,
    pub api_key_env: String,
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            endpoint_env: "AZURE_MISTRAL_ENDPOINT".into(),
            api_key_env: "AZURE_MISTRAL_API_KEY".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClaudeConfig {
    pub databricks_endpoint_env: String,
    pub databricks_api_key_env: String,
    pub anthropic_api_key_env: String,
    pub anthropic_api_url: String,
    pub anthropic_model: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            databricks_endpoint_env: "AZURE_DATABRICKS_CLAUDE_ENDPOINT".into(),
            databricks_api_key_env: "AZURE_DATABRICKS_API_KEY".into(),
            anthropic_api_key_env: "ANTHROPIC_API_KEY".into(),
            anthropic_api_url: "https://api.anthropic.com/v1/messages".into(),
            anthropic_model: "claude-3-5-sonnet-20241022".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeminiConfig {
    pub apim_endpoint_env: String,
    pub apim_key_env: String,
    pub google_api_key_env: String,
    pub google_api_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            apim_endpoint_env: "AZURE_APIM_GEMINI_ENDPOINT".into(),
            apim_key_env: "AZURE_APIM_GEMINI_KEY".into(),
            google_api_key_env: "GOOGLE_API_KEY".into(),
            google_api_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HuggingFaceConfig {
    pub token_env: String,
    pub endpoint_url_env: String,
    pub api_base_url: String,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            token_env: "HUGGINGFACE_TOKEN".into(),
            endpoint_url_env: "INFERENCE_ENDPOINT_URL".into(),
            api_base_url: "https://api-inference.huggingface.co".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            let cfg = Self::load(path)?;
            info!(path, "Configuration loaded");
            Ok(cfg)
        } else {
            warn!(path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved credentials
// ---------------------------------------------------------------------------

/// Vendor credentials and endpoints resolved from the environment.
///
/// Empty variables count as unset.
#[derive(Debug, Default)]
pub struct Credentials {
    pub azure_openai_key: Option<SecretString>,
    pub azure_openai_endpoint: Option<String>,
    pub azure_openai_api_version: String,
    pub gpt4o_deployment: String,
    pub gpt4o_mini_deployment: String,
    pub o3_mini_deployment: String,
    pub fallback_deployment: Option<String>,

    pub mistral_endpoint: Option<String>,
    pub mistral_key: Option<SecretString>,

    pub databricks_claude_endpoint: Option<String>,
    pub databricks_key: Option<SecretString>,
    pub anthropic_key: Option<SecretString>,

    pub gemini_apim_endpoint: Option<String>,
    pub gemini_apim_key: Option<SecretString>,
    pub google_key: Option<SecretString>,

    pub huggingface_token: Option<SecretString>,
    pub inference_endpoint_url: Option<String>,
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_secret(name: &str) -> Option<SecretString> {
    env_opt(name).map(SecretString::new)
}

impl Credentials {
    pub fn from_env(providers: &ProvidersConfig) -> Self {
        let az = &providers.azure_openai;
        Self {
            azure_openai_key: env_secret(&az.api_key_env),
            azure_openai_endpoint: env_opt(&az.endpoint_env),
            azure_openai_api_version: env_opt(&az.api_version_env)
                .unwrap_or_else(|| az.default_api_version.clone()),
            gpt4o_deployment: env_opt(&az.gpt4o_deployment_env)
                .unwrap_or_else(|| "gpt-4o".into()),
            gpt4o_mini_deployment: env_opt(&az.gpt4o_mini_deployment_env)
                .unwrap_or_else(|| "gpt-4o-mini".into()),
            o3_mini_deployment: env_opt(&az.o3_mini_deployment_env)
                .unwrap_or_else(|| "o3-mini".into()),
            fallback_deployment: env_opt(&az.fallback_deployment_env),

            mistral_endpoint: env_opt(&providers.mistral.endpoint_env),
            mistral_key: env_secret(&providers.mistral.api_key_env),

            databricks_claude_endpoint: env_opt(&providers.claude.databricks_endpoint_env),
            databricks_key: env_secret(&providers.claude.databricks_api_key_env),
            anthropic_key: env_secret(&providers.claude.anthropic_api_key_env),

            gemini_apim_endpoint: env_opt(&providers.gemini.apim_endpoint_env),
            gemini_apim_key: env_secret(&providers.gemini.apim_key_env),
            google_key: env_secret(&providers.gemini.google_api_key_env),

            huggingface_token: env_secret(&providers.huggingface.token_env),
            inference_endpoint_url: env_opt(&providers.huggingface.endpoint_url_env),
        }
    }
}
