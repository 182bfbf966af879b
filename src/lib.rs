pub mod api;
pub mod auth_service;
pub mod chat_service;
pub mod config;
pub mod content;
pub mod database;
pub mod errors;
pub mod llm_providers;
pub mod llm_service;
pub mod logging;
pub mod models;
pub mod progress;
pub mod quiz_engine;
pub mod session_store;

pub use auth_service::AuthService;
pub use chat_service::ChatService;
pub use config::Config;
pub use content::{QuestionBank, ResourceLibrary, TopicCatalog};
pub use database::Database;
pub use errors::*;
pub use llm_providers::{LLMProvider, LLMProviderFactory, LLMProviderType};
pub use llm_service::LLMService;
pub use models::*;
pub use progress::{ProgressSignal, ProgressTracker, ProgressUpdate};
pub use quiz_engine::QuizEngine;
pub use session_store::SessionStore;
