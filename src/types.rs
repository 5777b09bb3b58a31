//! Shared request/response types for the wrapper API.
//!
//! These are the DTOs exchanged with the frontend and passed between the
//! generation service and the provider clients. Field names follow the
//! snake_case JSON the console already speaks.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

pub const DEFAULT_MAX_LENGTH: u32 = 500;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 0.9;
pub const DEFAULT_TOP_K: u32 = 50;

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Information about an available AI model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub display_name: String,
    pub description: String,
}

/// Default prompt and sampling values for a catalog model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDefaults {
    pub system_prompt: String,
    pub temperature: f64,
    pub max_length: u32,
    pub top_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelDefaultsResponse {
    /// Serialized as an object keyed by model name, in catalog order.
    #[serde(serialize_with = "ordered_map")]
    pub defaults: Vec<(String, ModelDefaults)>,
    pub models: Vec<ModelInfo>,
}

fn ordered_map<S: Serializer>(entries: &[(String, ModelDefaults)], s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(entries.iter().map(|(name, defaults)| (name, defaults)))
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Sampling parameters forwarded to a provider.
///
/// `max_length` and `max_tokens` carry the same value; chat vendors read
/// `max_tokens`, Hugging Face reads `max_length`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationParams {
    pub max_length: u32,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            max_tokens: DEFAULT_MAX_LENGTH,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
            reasoning_effort: None,
        }
    }
}

/// A fully rendered prompt addressed to one model.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub model: String,
    pub prompt: String,
    pub params: GenerationParams,
}

/// Body of `POST /generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub model_name: String,
    /// Prompt template; `{{json}}` / `{json}` are replaced with the data.
    pub system_prompt: String,
    #[serde(default)]
    pub json_data: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default = "default_true")]
    pub use_cache: bool,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub top_k: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationResponse {
    pub generated_text: String,
    pub model_used: String,
    pub prompt_length: usize,
    pub parameters: GenerationParams,
    pub api_mode: bool,
    pub from_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_age_seconds: Option<i64>,
}

/// Body of `POST /prepare-json`.
#[derive(Debug, Clone, Deserialize)]
pub struct PrepareJsonRequest {
    pub json_data: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareJsonResponse {
    pub status: String,
    pub valid: bool,
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl_minutes: Option<i64>,
}

/// Per-model overrides in a parallel run.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub top_k: Option<u32>,
}

impl ModelConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            system_prompt: None,
            temperature: None,
            max_length: None,
            top_p: None,
            top_k: None,
        }
    }
}

/// Body of `POST /generate-all`.
#[derive(Debug, Clone, Deserialize)]
pub struct ParallelGenerationRequest {
    pub models: Vec<ModelConfig>,
    /// May be empty when `session_id` refers to prepared JSON.
    #[serde(default)]
    pub json_data: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default = "default_true")]
    pub use_cache: bool,
}

/// Outcome of one model inside a parallel run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelResult {
    pub model_name: String,
    pub display_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seconds.
    pub generation_time: f64,
    pub from_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters_used: Option<GenerationParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelGenerationResponse {
    pub results: Vec<ModelResult>,
    pub total_time: f64,
    pub models_run: usize,
    pub successful: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Health / probe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelsConfigured {
    pub azure_openai: bool,
    pub mistral: bool,
    pub claude: bool,
    pub gemini: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub mode: String,
    pub token_configured: bool,
    pub azure_configured: bool,
    pub models_configured: ModelsConfigured,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeResult {
    pub model: String,
    pub provider: String,
    pub status: String,
    /// Milliseconds.
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub models_tested: Vec<ProbeResult>,
}
