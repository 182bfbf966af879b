use anyhow::Result;
use tracing::info;

use crate::llm_providers::{LLMProvider, LLMProviderFactory, LLMProviderType};

#[derive(Clone)]
pub struct LLMService {
    provider: LLMProvider,
}

impl LLMService {
    #[allow(dead_code)]
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self::new_with_provider(api_key, base_url, LLMProviderType::Together, None, 30)
    }

    pub fn new_with_provider(
        api_key: String,
        base_url: Option<String>,
        provider_type: LLMProviderType,
        model: Option<String>,
        request_timeout_secs: u64,
    ) -> Self {
        let provider = LLMProviderFactory::create_provider(
            provider_type,
            api_key,
            base_url,
            model,
            request_timeout_secs,
        );

        Self { provider }
    }

    /// Get the provider name for logging and testing
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Get the model name being used
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Fetch a one-to-two sentence introduction for a topic.
    pub async fn topic_introduction(&self, topic_name: &str) -> Result<String> {
        info!(topic = %topic_name, "Requesting topic introduction");

        let system_message = "You are an AI tutor. Provide a very brief, engaging explanation \
             of the topic in 1-2 sentences. Keep it simple and interesting.";
        let prompt = format!(
            "Explain {} in a simple way that a beginner can understand.",
            topic_name
        );

        self.provider
            .make_request(Some(system_message), &prompt)
            .await
    }

    /// Answer a free-form student question under the tutor instruction,
    /// scoped to the topic the student is currently studying.
    pub async fn tutor_reply(&self, topic_name: &str, message: &str) -> Result<String> {
        info!(
            topic = %topic_name,
            message_length = message.len(),
            "Requesting tutor reply"
        );

        let system_message = format!(
            r#"You are an AI tutor with expertise in all areas of artificial intelligence.
Provide helpful, accurate, and educational responses about any AI-related topic, including but not limited to:
- Technical concepts and explanations
- Learning resources and roadmaps
- Career guidance and industry trends
- Practical applications and real-world examples
- Best practices and recommendations
Keep responses focused on AI and related fields. The student is currently studying {}."#,
            topic_name
        );

        self.provider
            .make_request(Some(&system_message), message)
            .await
    }
}
