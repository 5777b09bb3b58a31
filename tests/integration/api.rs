//! Full request flows through the router with scripted providers.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use rikstoto_wrapper::catalog::Provider;
use rikstoto_wrapper::config::ServerConfig;
use rikstoto_wrapper::generation::{GenerationService, ServiceTimeouts};
use rikstoto_wrapper::llm::ProviderRegistry;
use rikstoto_wrapper::server::build_router;
use rikstoto_wrapper::server::routes::ServerState;

use crate::mock_provider::MockProvider;

struct Harness {
    app: Router,
    azure: MockProvider,
    mistral: MockProvider,
    claude: MockProvider,
    gemini: MockProvider,
    huggingface: MockProvider,
}

impl Harness {
    fn new() -> Self {
        Self::with(
            MockProvider::new(Provider::Mistral),
            MockProvider::new(Provider::Gemini),
        )
    }

    fn with(mistral: MockProvider, gemini: MockProvider) -> Self {
        let azure = MockProvider::new(Provider::AzureOpenAi);
        let claude = MockProvider::new(Provider::Claude);
        let huggingface = MockProvider::new(Provider::HuggingFace);

        let registry = ProviderRegistry::new(
            Arc::new(azure.clone()),
            Arc::new(mistral.clone()),
            Arc::new(claude.clone()),
            Arc::new(gemini.clone()),
            Arc::new(huggingface.clone()),
        );
        let service = GenerationService::new(
            registry,
            chrono::Duration::minutes(30),
            ServiceTimeouts {
                parallel: Duration::from_secs(2),
                probe: Duration::from_millis(300),
            },
        );
        let cfg = ServerConfig {
            frontend_dir: "/nonexistent/frontend/build".into(),
            ..ServerConfig::default()
        };

        Self {
            app: build_router(Arc::new(ServerState::new(service)), &cfg),
            azure,
            mistral,
            claude,
            gemini,
            huggingface,
        }
    }

    async fn post(&self, uri: &str, body: Value) -> Response {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.app.clone().oneshot(req).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.app.clone().oneshot(req).await.unwrap()
    }
}

async fn body_json(resp: Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_generate_routes_to_vendor_by_model() {
    let h = Harness::new();
    for model in ["gpt-4o", "mistral-large", "claude-3-5-sonnet", "gemini-1-5-flash", "gpt2"] {
        let resp = h
            .post(
                "/generate",
                json!({"model_name": model, "system_prompt": "Hei", "use_cache": false}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK, "{model}");
    }

    assert_eq!(h.azure.calls(), 1);
    assert_eq!(h.mistral.calls(), 1);
    assert_eq!(h.claude.calls(), 1);
    assert_eq!(h.gemini.calls(), 1);
    assert_eq!(h.huggingface.requests()[0].model, "gpt2");
}

#[tokio::test]
async fn test_repeated_generate_is_served_from_cache() {
    let h = Harness::new();
    h.azure.reply("gpt-4o-mini", "V75 ser jevn ut");
    let body = json!({
        "model_name": "gpt-4o-mini",
        "system_prompt": "Oppsummer {{json}}",
        "json_data": "{\"bane\": \"Bjerke\"}"
    });

    let first = body_json(h.post("/generate", body.clone()).await).await;
    assert_eq!(first["from_cache"], false);
    assert!(first.get("cache_age_seconds").is_none());

    let second = body_json(h.post("/generate", body).await).await;
    assert_eq!(second["from_cache"], true);
    assert_eq!(second["generated_text"], "V75 ser jevn ut");
    assert!(second["cache_age_seconds"].as_i64().unwrap() >= 0);
    assert_eq!(h.azure.calls(), 1);
}

#[tokio::test]
async fn test_cache_bypass_and_parameter_change() {
    let h = Harness::new();
    let body = json!({
        "model_name": "claude-3-5-sonnet",
        "system_prompt": "Hei",
        "use_cache": false
    });
    h.post("/generate", body.clone()).await;
    h.post("/generate", body).await;
    assert_eq!(h.claude.calls(), 2);

    // Temperature is part of the cache key.
    h.post("/generate", json!({"model_name": "gpt-4o", "system_prompt": "Hei", "temperature": 0.2})).await;
    h.post("/generate", json!({"model_name": "gpt-4o", "system_prompt": "Hei", "temperature": 0.9})).await;
    assert_eq!(h.azure.calls(), 2);
    assert_eq!(h.azure.requests()[0].params.temperature, 0.2);
}

#[tokio::test]
async fn test_prepared_session_feeds_parallel_run() {
    let h = Harness::new();
    let prepared = body_json(
        h.post("/prepare-json", json!({"json_data": "{\"race\": 3, \"winner\": 7}"})).await,
    )
    .await;
    assert_eq!(prepared["valid"], true);
    assert_eq!(prepared["cache_ttl_minutes"], 30);
    let session_id = prepared["session_id"].as_str().unwrap().to_string();

    h.claude.set_error("overloaded");
    let resp = h
        .post(
            "/generate-all",
            json!({
                "session_id": session_id,
                "models": [
                    {"name": "gemini-1-5-flash"},
                    {"name": "claude-3-5-sonnet"},
                    {"name": "o3-mini", "system_prompt": "Vinner: {{json}}"},
                    {"name": "mistral-large", "enabled": false}
                ]
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;

    assert_eq!(json["models_run"], 3);
    assert_eq!(json["successful"], 2);
    assert_eq!(json["failed"], 1);
    let names: Vec<&str> = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["model_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["gemini-1-5-flash", "claude-3-5-sonnet", "o3-mini"]);
    assert!(json["results"][1]["error"].as_str().unwrap().contains("overloaded"));
    assert_eq!(h.mistral.calls(), 0);

    let o3 = &h.azure.requests()[0];
    assert!(o3.prompt.starts_with("Vinner: "));
    assert!(o3.prompt.contains("\"winner\": 7"));
    assert_eq!(o3.params.reasoning_effort.as_deref(), Some("medium"));
    assert!(h.gemini.requests()[0].prompt.contains("\"race\": 3"));
}

#[tokio::test]
async fn test_parallel_run_reuses_single_generation_cache() {
    let h = Harness::new();
    let models = json!([{"name": "gpt-4o"}]);
    let data = "{\"pool\": 1000}";

    let first = body_json(h.post("/generate-all", json!({"models": models, "json_data": data})).await).await;
    assert_eq!(first["results"][0]["from_cache"], false);

    let second = body_json(h.post("/generate-all", json!({"models": models, "json_data": data})).await).await;
    assert_eq!(second["results"][0]["from_cache"], true);
    assert_eq!(second["results"][0]["success"], true);
    assert_eq!(h.azure.calls(), 1);
}

#[tokio::test]
async fn test_parallel_models_run_concurrently() {
    let h = Harness::with(
        MockProvider::new(Provider::Mistral).with_delay(Duration::from_millis(400)),
        MockProvider::new(Provider::Gemini).with_delay(Duration::from_millis(400)),
    );
    let json = body_json(
        h.post(
            "/generate-all",
            json!({
                "models": [{"name": "mistral-large"}, {"name": "gemini-1-5-flash"}],
                "json_data": "{}",
                "use_cache": false
            }),
        )
        .await,
    )
    .await;
    assert_eq!(json["successful"], 2);
    assert!(json["total_time"].as_f64().unwrap() < 0.8);
}

#[tokio::test]
async fn test_vendor_error_is_bad_request() {
    let h = Harness::new();
    h.gemini.set_error("quota exceeded");
    let resp = h
        .post("/generate", json!({"model_name": "gemini-1-5-flash", "system_prompt": "Hei"}))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert!(json["detail"].as_str().unwrap().contains("quota exceeded"));

    h.gemini.clear_error();
    let resp = h
        .post("/generate", json!({"model_name": "gemini-1-5-flash", "system_prompt": "Hei"}))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_probe_reports_each_catalog_model() {
    let h = Harness::with(
        MockProvider::unconfigured(Provider::Mistral),
        MockProvider::new(Provider::Gemini).with_delay(Duration::from_secs(2)),
    );
    let json = body_json(h.get("/test-models").await).await;
    let tested = json["models_tested"].as_array().unwrap();
    assert_eq!(tested.len(), 6);

    let status = |model: &str| {
        tested
            .iter()
            .find(|p| p["model"] == model)
            .map(|p| p["status"].as_str().unwrap().to_string())
            .unwrap()
    };
    assert_eq!(status("gpt-4o"), "available");
    assert_eq!(status("claude-3-5-sonnet"), "available");
    assert_eq!(status("mistral-large"), "not configured");
    assert_eq!(status("gemini-1-5-flash"), "error (timeout)");

    assert!(h.azure.requests().iter().all(|r| r.params.max_tokens == 10));
}

#[tokio::test]
async fn test_health_reflects_configured_vendors() {
    let h = Harness::with(
        MockProvider::unconfigured(Provider::Mistral),
        MockProvider::new(Provider::Gemini),
    );
    let json = body_json(h.get("/health").await).await;
    assert_eq!(json["azure_configured"], true);
    assert_eq!(json["token_configured"], true);
    assert_eq!(json["models_configured"]["mistral"], false);
    assert_eq!(json["models_configured"]["gemini"], true);
}

#[tokio::test]
async fn test_tampered_fixture_fails_analysis() {
    let h = Harness::new();
    let resp = h
        .post(
            "/fixtures/generate",
            json!({"product": "V75", "correct_races": 7, "target_payout": 25000, "seed": 5}),
        )
        .await;
    let mut coupon = body_json(resp).await;
    assert_eq!(coupon["result"]["won"], true);

    let clean = body_json(h.post("/fixtures/analyze", coupon.clone()).await).await;
    assert_eq!(clean["summary"]["total_errors"], 0);
    assert_ne!(clean["summary"]["overall_status"], "FAIL");

    coupon["result"]["won"] = json!(false);
    let tampered = body_json(h.post("/fixtures/analyze", coupon).await).await;
    assert_eq!(tampered["summary"]["overall_status"], "FAIL");
    assert!(tampered["errors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e.as_str().unwrap().contains("won=false")));
}
