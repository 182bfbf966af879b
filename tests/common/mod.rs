#![allow(dead_code)]

use axum::{routing::post, Json, Router};
use axum_test::{TestServer, TestServerConfig};
use serde_json::json;

use ai_tutor::api::{create_router, AppState};
use ai_tutor::auth_service::AuthService;
use ai_tutor::chat_service::ChatService;
use ai_tutor::config::SessionConfig;
use ai_tutor::content::{QuestionBank, ResourceLibrary, TopicCatalog};
use ai_tutor::database::Database;
use ai_tutor::llm_providers::LLMProviderType;
use ai_tutor::llm_service::LLMService;
use ai_tutor::progress::ProgressTracker;
use ai_tutor::quiz_engine::QuizEngine;
use ai_tutor::session_store::SessionStore;

/// Two-question machine-learning bank with known answers (A then B).
pub fn small_bank() -> QuestionBank {
    QuestionBank::from_json_str(
        r#"{
            "machine-learning": {
                "questions": [
                    {
                        "question": "Which learning type uses labeled data?",
                        "options": ["A. Supervised", "B. Unsupervised"],
                        "correct": "A"
                    },
                    {
                        "question": "Which task predicts a number?",
                        "options": ["A. Classification", "B. Regression"],
                        "correct": "B"
                    }
                ]
            }
        }"#,
    )
    .unwrap()
}

/// Five topic-level entries plus one subtopic entry, all under
/// machine-learning.
pub fn small_library() -> ResourceLibrary {
    ResourceLibrary::from_json_str(
        r#"{
            "machine-learning": {
                "resources": [
                    {"title": "Course A", "url": "https://example.com/a"},
                    {"title": "Course B", "url": "https://example.com/b"},
                    {"title": "Course C", "url": "https://example.com/c"},
                    {"title": "Course D", "url": "https://example.com/d"},
                    {"title": "Course E", "url": "https://example.com/e"}
                ],
                "subtopics": {
                    "Supervised Learning": {
                        "resources": [
                            {"title": "Supervised Notes", "url": "https://example.com/sup"}
                        ]
                    }
                }
            }
        }"#,
    )
    .unwrap()
}

/// App wired to an unroutable LLM endpoint. Any path that actually reaches
/// the LLM fails fast with an upstream error.
pub async fn spawn_app() -> TestServer {
    spawn_app_with_llm("http://127.0.0.1:9").await
}

pub async fn spawn_app_with_llm(llm_base_url: &str) -> TestServer {
    spawn_app_with_parts(llm_base_url, small_bank(), small_library()).await
}

pub async fn spawn_app_with_parts(
    llm_base_url: &str,
    bank: QuestionBank,
    resources: ResourceLibrary,
) -> TestServer {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let sessions = SessionStore::with_ttl_days(7);
    let llm = LLMService::new_with_provider(
        "test-key".to_string(),
        Some(llm_base_url.to_string()),
        LLMProviderType::OpenAI,
        None,
        2,
    );
    let progress = ProgressTracker::new(db.clone(), bank.clone());
    let quiz = QuizEngine::new(bank, progress.clone());
    let chat_service = ChatService::new(
        db.clone(),
        llm,
        TopicCatalog::builtin(),
        resources.clone(),
        quiz,
        progress,
    );
    let auth_service = AuthService::new(db, sessions);

    let state = AppState {
        auth_service,
        chat_service,
        resources,
        session: SessionConfig {
            ttl_days: 7,
            cookie_secure: false,
        },
    };

    let config = TestServerConfig::builder().save_cookies().build();
    TestServer::new_with_config(create_router(state), config).unwrap()
}

/// Minimal OpenAI-dialect completion endpoint on an ephemeral port, always
/// answering with `reply`. Returns the base URL to hand to the provider.
pub async fn spawn_stub_llm(reply: &'static str) -> String {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move || async move {
            Json(json!({
                "choices": [{"message": {"role": "assistant", "content": reply}}]
            }))
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/v1", addr)
}

pub async fn register_and_login(server: &TestServer, username: &str) {
    server
        .post("/api/register")
        .json(&json!({"username": username, "password": "s3cret-pw"}))
        .await
        .assert_status_ok();

    server
        .post("/api/login")
        .json(&json!({"username": username, "password": "s3cret-pw"}))
        .await
        .assert_status_ok();
}
