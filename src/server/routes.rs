//! REST route handlers.
//!
//! Handlers are thin: they unpack the request, call the generation
//! service or the fixture tools, and map errors to `ApiError`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use crate::catalog;
use crate::fixtures::{self, AnalysisReport, Coupon, FixtureRequest};
use crate::generation::GenerationService;
use crate::types::*;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ServerState {
    pub generation: GenerationService,
}

impl ServerState {
    pub fn new(generation: GenerationService) -> Self {
        Self { generation }
    }
}

pub type AppState = Arc<ServerState>;

pub const API_BANNER: &str = "Rikstoto AI Model Wrapper API";
const MODELS_CACHE_CONTROL: &str = "public, max-age=3600";

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub async fn api_root() -> Json<Value> {
    Json(json!({ "message": API_BANNER }))
}

pub async fn list_models() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, MODELS_CACHE_CONTROL)],
        Json(catalog::available_models()),
    )
}

pub async fn model_defaults() -> Json<ModelDefaultsResponse> {
    Json(ModelDefaultsResponse {
        defaults: catalog::all_defaults(),
        models: catalog::available_models(),
    })
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

pub async fn prepare_json(
    State(state): State<AppState>,
    body: Result<Json<PrepareJsonRequest>, JsonRejection>,
) -> Result<Json<PrepareJsonResponse>, ApiError> {
    let Json(request) = body?;
    Ok(Json(state.generation.prepare_json(request).await))
}

pub async fn generate(
    State(state): State<AppState>,
    body: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let Json(request) = body?;
    let response = state.generation.generate(request).await?;
    Ok(Json(response))
}

pub async fn generate_all(
    State(state): State<AppState>,
    body: Result<Json<ParallelGenerationRequest>, JsonRejection>,
) -> Result<Json<ParallelGenerationResponse>, ApiError> {
    let Json(request) = body?;
    let response = state.generation.generate_all(request).await?;
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.generation.registry();
    let models_configured = registry.models_configured();
    Json(HealthResponse {
        status: "healthy".into(),
        mode: "api".into(),
        token_configured: registry.huggingface_configured(),
        azure_configured: models_configured.azure_openai,
        models_configured,
    })
}

pub async fn test_models(State(state): State<AppState>) -> Json<ProbeResponse> {
    let response = state.generation.probe_models().await;
    let available = response
        .models_tested
        .iter()
        .filter(|p| p.status == "available")
        .count();
    info!(available, total = response.models_tested.len(), "Model probe finished");
    Json(response)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn generate_fixture(
    body: Result<Json<FixtureRequest>, JsonRejection>,
) -> Result<Json<Coupon>, ApiError> {
    let Json(request) = body?;
    let coupon = tokio::task::spawn_blocking(move || fixtures::generate(&request))
        .await
        .map_err(|e| ApiError::Internal(format!("Fixture generation aborted: {e}")))??;
    info!(
        product = %coupon.product,
        correct = coupon.result.correct_races,
        payout = coupon.result.payout,
        "Generated coupon fixture"
    );
    Ok(Json(coupon))
}

pub async fn analyze_fixture(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let Json(data) = body?;
    Ok(Json(fixtures::analyze(&data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Provider;
    use crate::generation::ServiceTimeouts;
    use crate::llm::{MockTextGenerator, ProviderRegistry};
    use std::time::Duration;

    fn state() -> AppState {
        let mut mock = MockTextGenerator::new();
        mock.expect_provider().return_const(Provider::AzureOpenAi);
        mock.expect_is_configured().return_const(true);
        mock.expect_generate().returning(|_| Ok("ok".into()));
        let service = GenerationService::new(
            ProviderRegistry::uniform(Arc::new(mock)),
            chrono::Duration::minutes(30),
            ServiceTimeouts {
                parallel: Duration::from_secs(1),
                probe: Duration::from_secs(1),
            },
        );
        Arc::new(ServerState::new(service))
    }

    #[tokio::test]
    async fn test_api_root_handler() {
        let Json(body) = api_root().await;
        assert_eq!(body["message"], API_BANNER);
    }

    #[tokio::test]
    async fn test_model_defaults_handler() {
        let Json(resp) = model_defaults().await;
        assert_eq!(resp.models.len(), 6);
        assert_eq!(resp.defaults.len(), 6);
        let (name, gemini) = &resp.defaults[5];
        assert_eq!(name, "gemini-1-5-flash");
        assert_eq!(gemini.temperature, 1.0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let Json(resp) = health(State(state())).await;
        assert_eq!(resp.status, "healthy");
        assert_eq!(resp.mode, "api");
        assert!(resp.token_configured);
        assert!(resp.models_configured.gemini);
    }

    #[tokio::test]
    async fn test_generate_fixture_handler() {
        let req = FixtureRequest {
            correct_races: Some(6),
            seed: Some(3),
            ..FixtureRequest::default()
        };
        let Json(coupon) = generate_fixture(Ok(Json(req))).await.unwrap();
        assert_eq!(coupon.result.correct_races, 6);
        assert_eq!(coupon.race_results.len(), 7);
    }

    #[tokio::test]
    async fn test_generate_fixture_rejects_bad_request() {
        let req = FixtureRequest {
            correct_races: Some(9),
            ..FixtureRequest::default()
        };
        let err = generate_fixture(Ok(Json(req))).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_generate_fixture_oversized_target_is_bad_request() {
        let req = FixtureRequest {
            correct_races: Some(7),
            target_payout: Some(u64::MAX),
            seed: Some(1),
            ..FixtureRequest::default()
        };
        let err = generate_fixture(Ok(Json(req))).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Target payout 18446744073709551615 exceeds"));
    }
}
