//! Wire contracts of the vendor clients against a local mock server.

use httpmock::prelude::*;
use secrecy::SecretString;
use serde_json::json;
use std::time::Duration;

use rikstoto_wrapper::llm::anthropic::ClaudeClient;
use rikstoto_wrapper::llm::azure_openai::{AzureOpenAiClient, Deployments};
use rikstoto_wrapper::llm::gemini::GeminiClient;
use rikstoto_wrapper::llm::http::HttpSender;
use rikstoto_wrapper::llm::huggingface::HuggingFaceClient;
use rikstoto_wrapper::llm::mistral::MistralClient;
use rikstoto_wrapper::llm::{ProviderError, TextGenerator};
use rikstoto_wrapper::types::{GenerationParams, PromptRequest};

fn sender(name: &'static str) -> HttpSender {
    HttpSender::new(name, Duration::from_secs(5), 0).unwrap()
}

fn secret(s: &str) -> Option<SecretString> {
    Some(SecretString::new(s.to_string()))
}

fn prompt(model: &str) -> PromptRequest {
    PromptRequest {
        model: model.into(),
        prompt: "Analyser løp 3".into(),
        params: GenerationParams::default(),
    }
}

fn chat_reply(text: &str) -> serde_json::Value {
    json!({"choices": [{"message": {"role": "assistant", "content": text}}]})
}

#[tokio::test]
async fn test_azure_openai_deployment_call() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/openai/deployments/prod-4o/chat/completions")
                .query_param("api-version", "2024-08-01-preview")
                .header("api-key", "azure-key")
                .body_contains("\"model\":\"prod-4o\"")
                .body_contains("Du er en hjelpsom AI-assistent");
            then.status(200).json_body(chat_reply("Favoritt i løp 3"));
        })
        .await;

    let client = AzureOpenAiClient::new(
        sender("Azure OpenAI"),
        Some(format!("{}/", server.base_url())),
        secret("azure-key"),
        "2024-08-01-preview".into(),
        Deployments {
            gpt4o: "prod-4o".into(),
            ..Deployments::default()
        },
    );

    let text = client.generate(&prompt("gpt-4o")).await.unwrap();
    assert_eq!(text, "Favoritt i løp 3");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_azure_openai_reasoning_effort_only_for_o3_mini() {
    let server = MockServer::start_async().await;
    let o3 = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/openai/deployments/o3-mini/chat/completions")
                .body_contains("\"reasoning_effort\":\"high\"");
            then.status(200).json_body(chat_reply("resonnert"));
        })
        .await;

    let client = AzureOpenAiClient::new(
        sender("Azure OpenAI"),
        Some(server.base_url()),
        secret("k"),
        "2024-08-01-preview".into(),
        Deployments::default(),
    );

    let mut request = prompt("o3-mini");
    request.params.reasoning_effort = Some("high".into());
    assert_eq!(client.generate(&request).await.unwrap(), "resonnert");
    o3.assert_async().await;

    // Unknown model without a fallback deployment.
    let err = client.generate(&prompt("gpt-3.5")).await.unwrap_err();
    assert!(err.is_not_configured());
}

#[tokio::test]
async fn test_mistral_bearer_call() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("Authorization", "Bearer mistral-key")
                .body_contains("Analyser løp 3");
            then.status(200).json_body(chat_reply("Mistral mener 5"));
        })
        .await;

    let client = MistralClient::new(sender("Mistral"), Some(server.base_url()), secret("mistral-key"));
    assert_eq!(client.generate(&prompt("mistral-large")).await.unwrap(), "Mistral mener 5");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_claude_prefers_databricks() {
    let server = MockServer::start_async().await;
    let databricks = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/serving-endpoints/claude/invocations")
                .header("Authorization", "Bearer dbx-key");
            then.status(200)
                .json_body(json!({"content": [{"type": "text", "text": "fra Databricks"}]}));
        })
        .await;
    let anthropic = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(200).json_body(json!({"content": [{"text": "fra Anthropic"}]}));
        })
        .await;

    let client = ClaudeClient::new(
        sender("Claude"),
        Some(server.url("/serving-endpoints/claude/invocations")),
        secret("dbx-key"),
        secret("anthropic-key"),
        server.url("/v1/messages"),
        "claude-3-5-sonnet-20241022".into(),
    );

    let text = client.generate(&prompt("claude-3-5-sonnet")).await.unwrap();
    assert_eq!(text, "fra Databricks");
    databricks.assert_async().await;
    assert_eq!(anthropic.hits_async().await, 0);
}

#[tokio::test]
async fn test_claude_falls_back_to_anthropic() {
    let server = MockServer::start_async().await;
    let anthropic = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/messages")
                .header("x-api-key", "anthropic-key")
                .header("anthropic-version", "2023-06-01")
                .body_contains("\"model\":\"claude-3-5-sonnet-20241022\"");
            then.status(200).json_body(json!({"content": [{"text": "fra Anthropic"}]}));
        })
        .await;

    let client = ClaudeClient::new(
        sender("Claude"),
        None,
        None,
        secret("anthropic-key"),
        server.url("/v1/messages"),
        "claude-3-5-sonnet-20241022".into(),
    );

    assert_eq!(client.generate(&prompt("claude-3-5-sonnet")).await.unwrap(), "fra Anthropic");
    anthropic.assert_async().await;
}

#[tokio::test]
async fn test_claude_missing_content_is_malformed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(200).json_body(json!({"content": []}));
        })
        .await;

    let client = ClaudeClient::new(
        sender("Claude"),
        None,
        None,
        secret("k"),
        server.url("/v1/messages"),
        "claude-3-5-sonnet-20241022".into(),
    );
    let err = client.generate(&prompt("claude-3-5-sonnet")).await.unwrap_err();
    assert!(matches!(err, ProviderError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_gemini_apim_and_google_keys() {
    let server = MockServer::start_async().await;
    let apim = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/apim/gemini")
                .header("Ocp-Apim-Subscription-Key", "apim-key")
                .body_contains("\"maxOutputTokens\":500");
            then.status(200).json_body(json!({
                "candidates": [{"content": {"parts": [{"text": "via APIM"}]}}]
            }));
        })
        .await;
    let google = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent")
                .header("x-goog-api-key", "google-key");
            then.status(200).json_body(json!({
                "candidates": [{"content": {"parts": [{"text": "via Google"}]}}]
            }));
        })
        .await;
    let google_url = server.url("/v1beta/models/gemini-1.5-flash:generateContent");

    let via_apim = GeminiClient::new(
        sender("Gemini"),
        Some(server.url("/apim/gemini")),
        secret("apim-key"),
        secret("google-key"),
        google_url.clone(),
    );
    assert_eq!(via_apim.generate(&prompt("gemini-1-5-flash")).await.unwrap(), "via APIM");

    let via_google = GeminiClient::new(sender("Gemini"), None, None, secret("google-key"), google_url);
    assert_eq!(via_google.generate(&prompt("gemini-1-5-flash")).await.unwrap(), "via Google");

    apim.assert_async().await;
    google.assert_async().await;
}

#[tokio::test]
async fn test_huggingface_falls_back_to_pipeline_route() {
    let server = MockServer::start_async().await;
    let model_route = server
        .mock_async(|when, then| {
            when.method(POST).path("/models/gpt2");
            then.status(404).body("Not Found");
        })
        .await;
    let pipeline = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/pipeline/text-generation/gpt2")
                .header("Authorization", "Bearer hf-token");
            then.status(200)
                .json_body(json!([{"generated_text": "Analyser løp 3 og velg 4"}]));
        })
        .await;

    let client = HuggingFaceClient::new(sender("Hugging Face"), secret("hf-token"), None, server.base_url());
    let text = client.generate(&prompt("gpt2")).await.unwrap();
    assert_eq!(text, "Analyser løp 3 og velg 4");
    model_route.assert_async().await;
    pipeline.assert_async().await;
}

#[tokio::test]
async fn test_huggingface_not_found_on_every_route() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(404);
        })
        .await;

    let client = HuggingFaceClient::new(sender("Hugging Face"), None, None, server.base_url());
    let err = client.generate(&prompt("org/private-model")).await.unwrap_err();
    assert!(matches!(err, ProviderError::ModelNotFound(ref m) if m == "org/private-model"));
}

#[tokio::test]
async fn test_huggingface_loading_is_not_retried_on_pipeline() {
    let server = MockServer::start_async().await;
    let model_route = server
        .mock_async(|when, then| {
            when.method(POST).path("/models/bigscience/bloom");
            then.status(503).json_body(json!({"error": "Model is currently loading"}));
        })
        .await;
    let pipeline = server
        .mock_async(|when, then| {
            when.method(POST).path("/pipeline/text-generation/bigscience/bloom");
            then.status(200).json_body(json!([{"generated_text": "x"}]));
        })
        .await;

    let client = HuggingFaceClient::new(sender("Hugging Face"), secret("t"), None, server.base_url());
    let err = client.generate(&prompt("bigscience/bloom")).await.unwrap_err();
    assert!(err.is_loading());
    model_route.assert_async().await;
    assert_eq!(pipeline.hits_async().await, 0);
}

#[tokio::test]
async fn test_huggingface_dedicated_endpoint() {
    let server = MockServer::start_async().await;
    let endpoint = server
        .mock_async(|when, then| {
            when.method(POST).path("/endpoint").body_contains("\"source_sentence\"");
            then.status(200).json_body(json!([0.91, 0.12]));
        })
        .await;

    let client = HuggingFaceClient::new(
        sender("Hugging Face"),
        secret("t"),
        Some(server.url("/endpoint")),
        "http://unused.invalid".into(),
    );
    let text = client
        .generate(&prompt("sentence-transformers/all-MiniLM-L6-v2"))
        .await
        .unwrap();
    assert_eq!(text, "0.91");
    endpoint.assert_async().await;
}
