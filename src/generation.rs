//! Generation service: prompt rendering, caching and provider dispatch.
//!
//! Sits between the HTTP handlers and the provider registry. Owns the
//! session JSON cache and the response cache, and runs the parallel
//! fan-out used by the comparison view.

use futures::future::join_all;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{response_key, sha256_hex, ResponseCache, SessionCache, SessionJson};
use crate::catalog::{self, FALLBACK_PROMPT};
use crate::config::AppConfig;
use crate::llm::{ProviderError, ProviderRegistry};
use crate::prompt;
use crate::types::*;

const PROBE_PROMPT: &str = "Hello, this is a test";
const PROBE_MAX_TOKENS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Body or session JSON on `/generate` failed to parse.
    #[error("Invalid JSON data")]
    InvalidJson,

    /// JSON on `/generate-all` failed to parse.
    #[error("Invalid JSON: {0}")]
    InvalidParallelJson(String),

    #[error("No models enabled")]
    NoModelsEnabled,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Timeouts applied around whole provider calls.
#[derive(Debug, Clone, Copy)]
pub struct ServiceTimeouts {
    pub parallel: Duration,
    pub probe: Duration,
}

impl ServiceTimeouts {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            parallel: Duration::from_secs(cfg.http.parallel_timeout_secs),
            probe: Duration::from_secs(cfg.http.probe_timeout_secs),
        }
    }
}

pub struct GenerationService {
    registry: ProviderRegistry,
    sessions: SessionCache,
    responses: ResponseCache,
    timeouts: ServiceTimeouts,
}

impl GenerationService {
    pub fn new(registry: ProviderRegistry, cache_ttl: chrono::Duration, timeouts: ServiceTimeouts) -> Self {
        Self {
            registry,
            sessions: SessionCache::new(cache_ttl),
            responses: ResponseCache::new(cache_ttl),
            timeouts,
        }
    }

    pub fn from_config(cfg: &AppConfig, registry: ProviderRegistry) -> Self {
        Self::new(
            registry,
            chrono::Duration::minutes(cfg.cache.ttl_minutes),
            ServiceTimeouts::from_config(cfg),
        )
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn cache_ttl_minutes(&self) -> i64 {
        self.sessions.ttl().num_minutes()
    }

    // ---- Session JSON ----

    /// Validate JSON and store it for later requests in the same session.
    ///
    /// Invalid JSON is reported in the response body, not as an error.
    pub async fn prepare_json(&self, request: PrepareJsonRequest) -> PrepareJsonResponse {
        match serde_json::from_str::<Value>(&request.json_data) {
            Ok(json) => {
                let session_id = request
                    .session_id
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                let hash = sha256_hex(&request.json_data);
                self.sessions
                    .insert(
                        session_id.clone(),
                        SessionJson {
                            json: json.clone(),
                            hash,
                        },
                    )
                    .await;
                info!(session_id = %session_id, "JSON prepared for session");

                PrepareJsonResponse {
                    status: "ready".into(),
                    valid: true,
                    session_id: Some(session_id),
                    data: Some(json),
                    message: "JSON validated and cached for fast AI generation".into(),
                    cache_ttl_minutes: Some(self.cache_ttl_minutes()),
                }
            }
            Err(e) => PrepareJsonResponse {
                status: "error".into(),
                valid: false,
                session_id: None,
                data: None,
                message: format!("Invalid JSON: {e}"),
                cache_ttl_minutes: None,
            },
        }
    }

    async fn session_json(&self, session_id: Option<&str>) -> Option<Value> {
        let id = session_id?;
        self.sessions.get(id).await.map(|(entry, _)| entry.json)
    }

    // ---- Single generation ----

    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let json_text = match self.session_json(request.session_id.as_deref()).await {
            Some(json) => Some(json.to_string()),
            None => request.json_data.clone(),
        };

        let prompt = match json_text.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => {
                let pretty = prompt::pretty_json(raw).map_err(|_| GenerationError::InvalidJson)?;
                prompt::render(&request.system_prompt, &pretty)
            }
            None => request.system_prompt.clone(),
        };

        let max_length = request.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
        let params = GenerationParams {
            max_length,
            max_tokens: max_length,
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: request.top_p.unwrap_or(DEFAULT_TOP_P),
            top_k: request.top_k.unwrap_or(DEFAULT_TOP_K),
            reasoning_effort: None,
        };

        let cache_key = request
            .use_cache
            .then(|| response_key(&request.model_name, &prompt, params.temperature, params.max_length));

        if let Some(key) = &cache_key {
            if let Some((cached, age)) = self.responses.get(key).await {
                debug!(model = %request.model_name, age_secs = age.num_seconds(), "Response cache hit");
                return Ok(GenerationResponse {
                    from_cache: true,
                    cache_age_seconds: Some(age.num_seconds()),
                    ..cached
                });
            }
        }

        let prompt_request = PromptRequest {
            model: request.model_name.clone(),
            prompt,
            params,
        };

        let generator = self.registry.route(&request.model_name);
        let started = Instant::now();
        let generated_text = generator.generate(&prompt_request).await.map_err(|e| {
            warn!(
                model = %request.model_name,
                provider = %generator.provider(),
                error = %e,
                "Generation failed"
            );
            e
        })?;
        info!(
            model = %request.model_name,
            provider = %generator.provider(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Generation complete"
        );

        let response = GenerationResponse {
            generated_text,
            model_used: request.model_name,
            prompt_length: prompt::prompt_length(&prompt_request.prompt),
            parameters: prompt_request.params,
            api_mode: true,
            from_cache: false,
            cache_age_seconds: None,
        };

        if let Some(key) = cache_key {
            self.responses.insert(key, response.clone()).await;
        }

        Ok(response)
    }

    // ---- Parallel generation ----

    /// Run every enabled model concurrently against the same JSON.
    pub async fn generate_all(
        &self,
        request: ParallelGenerationRequest,
    ) -> Result<ParallelGenerationResponse, GenerationError> {
        let started = Instant::now();

        let raw = if request.json_data.trim().is_empty() {
            self.session_json(request.session_id.as_deref())
                .await
                .map(|json| json.to_string())
                .unwrap_or_default()
        } else {
            request.json_data.clone()
        };
        let json_str =
            prompt::pretty_json(&raw).map_err(|e| GenerationError::InvalidParallelJson(e.to_string()))?;

        let enabled: Vec<&ModelConfig> = request.models.iter().filter(|m| m.enabled).collect();
        if enabled.is_empty() {
            return Err(GenerationError::NoModelsEnabled);
        }

        info!(models = enabled.len(), "Starting parallel generation");

        let limit = self.timeouts.parallel;
        let use_cache = request.use_cache;
        let runs = enabled.iter().map(|model| {
            let json_str = &json_str;
            async move {
                match tokio::time::timeout(limit, self.generate_for_model(model, json_str, use_cache))
                    .await
                {
                    Ok(result) => result,
                    Err(elapsed) => {
                        warn!(model = %model.name, "Model timed out in parallel run");
                        ModelResult {
                            model_name: model.name.clone(),
                            display_name: model.name.clone(),
                            success: false,
                            generated_text: None,
                            error: Some(format!("Timeout or error: {elapsed}")),
                            generation_time: limit.as_secs_f64(),
                            from_cache: false,
                            parameters_used: None,
                        }
                    }
                }
            }
        });
        let results = join_all(runs).await;

        let successful = results.iter().filter(|r| r.success).count();
        let failed = results.len() - successful;
        let total_time = started.elapsed().as_secs_f64();
        info!(successful, failed, total_time, "Parallel generation complete");

        Ok(ParallelGenerationResponse {
            models_run: enabled.len(),
            results,
            total_time,
            successful,
            failed,
        })
    }

    /// One model of a parallel run. Never fails; errors land in the result.
    pub async fn generate_for_model(&self, model: &ModelConfig, json_str: &str, use_cache: bool) -> ModelResult {
        let started = Instant::now();

        let Some(info) = catalog::model_info(&model.name) else {
            return ModelResult {
                model_name: model.name.clone(),
                display_name: model.name.clone(),
                success: false,
                generated_text: None,
                error: Some(format!("Model {} not found", model.name)),
                generation_time: started.elapsed().as_secs_f64(),
                from_cache: false,
                parameters_used: None,
            };
        };

        let defaults = catalog::model_defaults(&model.name);
        let template = model
            .system_prompt
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(defaults.as_ref().map(|d| d.system_prompt.as_str()))
            .unwrap_or(FALLBACK_PROMPT);
        let prompt = prompt::render(template, json_str);
        let params = resolve_params(model, defaults.as_ref());

        let cache_key = use_cache.then(|| response_key(&model.name, &prompt, params.temperature, params.max_length));
        if let Some(key) = &cache_key {
            if let Some((cached, _)) = self.responses.get(key).await {
                return ModelResult {
                    model_name: model.name.clone(),
                    display_name: info.display_name,
                    success: true,
                    generated_text: Some(cached.generated_text),
                    error: None,
                    generation_time: started.elapsed().as_secs_f64(),
                    from_cache: true,
                    parameters_used: Some(params),
                };
            }
        }

        let request = PromptRequest {
            model: model.name.clone(),
            prompt,
            params,
        };
        let outcome = self.registry.route(&model.name).generate(&request).await;
        let generation_time = started.elapsed().as_secs_f64();

        match outcome {
            Ok(text) => {
                if let Some(key) = cache_key {
                    let response = GenerationResponse {
                        generated_text: text.clone(),
                        model_used: model.name.clone(),
                        prompt_length: prompt::prompt_length(&request.prompt),
                        parameters: request.params.clone(),
                        api_mode: true,
                        from_cache: false,
                        cache_age_seconds: None,
                    };
                    self.responses.insert(key, response).await;
                }
                ModelResult {
                    model_name: model.name.clone(),
                    display_name: info.display_name,
                    success: true,
                    generated_text: Some(text),
                    error: None,
                    generation_time,
                    from_cache: false,
                    parameters_used: Some(request.params),
                }
            }
            Err(e) => {
                warn!(model = %model.name, error = %e, "Model failed in parallel run");
                ModelResult {
                    model_name: model.name.clone(),
                    display_name: info.display_name,
                    success: false,
                    generated_text: None,
                    error: Some(e.to_string()),
                    generation_time,
                    from_cache: false,
                    parameters_used: Some(request.params),
                }
            }
        }
    }

    // ---- Probe ----

    /// Send a short test prompt to every catalog model.
    pub async fn probe_models(&self) -> ProbeResponse {
        let limit = self.timeouts.probe;
        let probes = catalog::available_models().into_iter().map(|model| async move {
            let generator = self.registry.route(&model.name);
            let request = PromptRequest {
                model: model.name.clone(),
                prompt: PROBE_PROMPT.to_string(),
                params: GenerationParams {
                    max_length: PROBE_MAX_TOKENS,
                    max_tokens: PROBE_MAX_TOKENS,
                    ..GenerationParams::default()
                },
            };

            let started = Instant::now();
            let status = match tokio::time::timeout(limit, generator.generate(&request)).await {
                Ok(Ok(_)) => "available".to_string(),
                Ok(Err(e)) if e.is_loading() => "loading".to_string(),
                Ok(Err(e)) if e.is_not_configured() => "not configured".to_string(),
                Ok(Err(e)) => format!("error ({e})"),
                Err(_) => "error (timeout)".to_string(),
            };

            ProbeResult {
                provider: generator.provider().to_string(),
                model: model.name,
                status,
                latency_ms: started.elapsed().as_millis() as u64,
            }
        });

        ProbeResponse {
            models_tested: join_all(probes).await,
        }
    }
}

/// Override, else catalog default, else global default.
fn resolve_params(model: &ModelConfig, defaults: Option<&ModelDefaults>) -> GenerationParams {
    let max_length = model
        .max_length
        .or(defaults.map(|d| d.max_length))
        .unwrap_or(DEFAULT_MAX_LENGTH);
    GenerationParams {
        max_length,
        max_tokens: max_length,
        temperature: model
            .temperature
            .or(defaults.map(|d| d.temperature))
            .unwrap_or(DEFAULT_TEMPERATURE),
        top_p: model.top_p.or(defaults.map(|d| d.top_p)).unwrap_or(DEFAULT_TOP_P),
        top_k: model.top_k.unwrap_or(DEFAULT_TOP_K),
        reasoning_effort: if model.name == "o3-mini" {
            defaults.and_then(|d| d.reasoning_effort.clone())
        } else {
            None
        },
    }
}
