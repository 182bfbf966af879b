mod common;

use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::json;

use ai_tutor::llm_providers::LLMMessage;
use ai_tutor::{LLMProviderFactory, LLMProviderType};
use common::spawn_stub_llm;

/// Bind a throwaway chat-completions endpoint and return its base URL.
async fn spawn_llm_endpoint(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

#[test]
fn test_message_constructors_set_roles() {
    let system = LLMMessage::system("Stay on topic.");
    assert_eq!(system.role, "system");
    assert_eq!(system.content, "Stay on topic.");

    let user = LLMMessage::user("What is a tensor?");
    assert_eq!(user.role, "user");
    assert_eq!(user.content, "What is a tensor?");
}

#[test]
fn test_factory_applies_provider_defaults() {
    let provider = LLMProviderFactory::create_provider(
        LLMProviderType::Together,
        "key".to_string(),
        None,
        None,
        30,
    );
    assert_eq!(provider.provider_name(), "Together");
    assert_eq!(provider.model_name(), "mistralai/Mixtral-8x7B-Instruct-v0.1");

    let provider = LLMProviderFactory::create_provider(
        LLMProviderType::OpenAI,
        "key".to_string(),
        None,
        None,
        30,
    );
    assert_eq!(provider.provider_name(), "OpenAI");
    assert_eq!(provider.model_name(), "gpt-4o-mini");

    let provider = LLMProviderFactory::create_provider(
        LLMProviderType::OpenAI,
        "key".to_string(),
        None,
        Some("gpt-4o".to_string()),
        30,
    );
    assert_eq!(provider.model_name(), "gpt-4o");
}

#[tokio::test]
async fn test_complete_round_trip_against_stub() {
    let base = spawn_stub_llm("stubbed completion").await;
    let provider = LLMProviderFactory::create_provider(
        LLMProviderType::OpenAI,
        "test-key".to_string(),
        Some(base),
        None,
        5,
    );

    let reply = provider
        .make_request(Some("You are terse."), "Say something.")
        .await
        .unwrap();
    assert_eq!(reply, "stubbed completion");
}

#[tokio::test]
async fn test_unreachable_endpoint_is_an_error() {
    // Port 9 is the discard service; nothing answers there.
    let provider = LLMProviderFactory::create_provider(
        LLMProviderType::OpenAI,
        "test-key".to_string(),
        Some("http://127.0.0.1:9/v1".to_string()),
        None,
        1,
    );

    let result = provider.make_request(None, "hello").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_empty_choices_is_an_error() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({"choices": []})) }),
    );
    let base = spawn_llm_endpoint(router).await;

    let provider = LLMProviderFactory::create_provider(
        LLMProviderType::OpenAI,
        "test-key".to_string(),
        Some(base),
        None,
        5,
    );

    let err = provider.make_request(None, "hello").await.unwrap_err();
    assert!(err.to_string().contains("No choices"));
}

#[tokio::test]
async fn test_upstream_http_error_is_surfaced() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "provider exploded") }),
    );
    let base = spawn_llm_endpoint(router).await;

    let provider = LLMProviderFactory::create_provider(
        LLMProviderType::OpenAI,
        "test-key".to_string(),
        Some(base),
        None,
        5,
    );

    let err = provider.make_request(None, "hello").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("OpenAI API request failed"));
    assert!(message.contains("provider exploded"));
}
