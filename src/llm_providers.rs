use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Common message structure for LLM requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMMessage {
    pub role: String,
    pub content: String,
}

impl LLMMessage {
    pub fn system(content: impl Into<String>) -> Self {
        LLMMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        LLMMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling defaults shared by both providers
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Enum-based LLM provider implementation for better compatibility
#[derive(Debug, Clone)]
pub enum LLMProvider {
    Together(TogetherProvider),
    OpenAI(OpenAIProvider),
}

impl LLMProvider {
    /// Send an ordered list of chat turns and return the completion text.
    pub async fn complete(&self, messages: Vec<LLMMessage>) -> Result<String> {
        match self {
            LLMProvider::Together(provider) => provider.complete(messages).await,
            LLMProvider::OpenAI(provider) => provider.complete(messages).await,
        }
    }

    /// Convenience wrapper building the usual system-then-user turn pair.
    pub async fn make_request(&self, system_message: Option<&str>, prompt: &str) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(sys_msg) = system_message {
            messages.push(LLMMessage::system(sys_msg));
        }
        messages.push(LLMMessage::user(prompt));
        self.complete(messages).await
    }

    /// Get the provider name for logging
    pub fn provider_name(&self) -> &'static str {
        match self {
            LLMProvider::Together(provider) => provider.provider_name(),
            LLMProvider::OpenAI(provider) => provider.provider_name(),
        }
    }

    /// Get the model name being used
    pub fn model_name(&self) -> &str {
        match self {
            LLMProvider::Together(provider) => provider.model_name(),
            LLMProvider::OpenAI(provider) => provider.model_name(),
        }
    }
}

/// Wire structures for the chat-completions dialect both providers speak
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<LLMMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatCompletionChoice {
    message: LLMMessage,
}

/// Together AI provider implementation
#[derive(Debug, Clone)]
pub struct TogetherProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    request_timeout: Duration,
}

impl TogetherProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
        request_timeout_secs: u64,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.together.xyz/v1".to_string()),
            model: model.unwrap_or_else(|| "mistralai/Mixtral-8x7B-Instruct-v0.1".to_string()),
            request_timeout: Duration::from_secs(request_timeout_secs),
        }
    }

    pub async fn complete(&self, messages: Vec<LLMMessage>) -> Result<String> {
        let request_body = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        };

        info!(
            provider = self.provider_name(),
            model = %self.model,
            base_url = %self.base_url,
            turns = request_body.messages.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(self.request_timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = self.provider_name(),
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(anyhow::anyhow!(
                "Together AI API request failed: {}",
                error_text
            ));
        }

        let completion: ChatCompletionResponse = response.json().await?;

        if completion.choices.is_empty() {
            return Err(anyhow::anyhow!("No choices in Together AI response"));
        }

        let response_content = completion.choices[0].message.content.clone();
        info!(
            provider = self.provider_name(),
            response_length = response_content.len(),
            "Successfully received LLM response"
        );

        Ok(response_content)
    }

    pub fn provider_name(&self) -> &'static str {
        "Together"
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI provider implementation
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    request_timeout: Duration,
}

impl OpenAIProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
        request_timeout_secs: u64,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            request_timeout: Duration::from_secs(request_timeout_secs),
        }
    }

    pub async fn complete(&self, messages: Vec<LLMMessage>) -> Result<String> {
        let request_body = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        };

        info!(
            provider = self.provider_name(),
            model = %self.model,
            base_url = %self.base_url,
            turns = request_body.messages.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(self.request_timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = self.provider_name(),
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(anyhow::anyhow!("OpenAI API request failed: {}", error_text));
        }

        let completion: ChatCompletionResponse = response.json().await?;

        if completion.choices.is_empty() {
            return Err(anyhow::anyhow!("No choices in OpenAI response"));
        }

        let response_content = completion.choices[0].message.content.clone();
        info!(
            provider = self.provider_name(),
            response_length = response_content.len(),
            "Successfully received LLM response"
        );

        Ok(response_content)
    }

    pub fn provider_name(&self) -> &'static str {
        "OpenAI"
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

/// Factory for creating LLM providers based on provider type
pub struct LLMProviderFactory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum LLMProviderType {
    Together,
    OpenAI,
}

impl LLMProviderFactory {
    /// Create a new LLM provider instance based on provider type
    pub fn create_provider(
        provider_type: LLMProviderType,
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
        request_timeout_secs: u64,
    ) -> LLMProvider {
        match provider_type {
            LLMProviderType::Together => LLMProvider::Together(TogetherProvider::new(
                api_key,
                base_url,
                model,
                request_timeout_secs,
            )),
            LLMProviderType::OpenAI => LLMProvider::OpenAI(OpenAIProvider::new(
                api_key,
                base_url,
                model,
                request_timeout_secs,
            )),
        }
    }
}
