use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::content::{ResourceLibrary, TopicCatalog, sample_entries};
use crate::database::Database;
use crate::errors::ApiError;
use crate::llm_service::LLMService;
use crate::models::{
    ChatDetail, ChatMessage, ChatRecord, ChatReply, ChatRequest, ChatSummary, SaveChatRequest,
    User,
};
use crate::progress::{ProgressSignal, ProgressTracker};
use crate::quiz_engine::QuizEngine;

/// Substrings that mark a message as on-topic for the tutor. Matching is
/// lowercase substring containment, so singular forms cover plurals.
const AI_KEYWORDS: &[&str] = &[
    "ai",
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "neural network",
    "algorithm",
    "model",
    "training",
    "dataset",
    "data",
    "learn",
    "predict",
    "classification",
    "regression",
    "clustering",
    "nlp",
    "computer vision",
    "robotics",
    "automation",
    "supervised",
    "unsupervised",
    "reinforcement",
    "ethics",
    "bias",
    "framework",
    "python",
    "tensorflow",
    "pytorch",
    "keras",
    "scikit",
    "opencv",
    "roadmap",
    "career",
    "course",
    "study",
    "guide",
    "path",
    "recommendation",
    "project",
    "application",
];

/// Substrings that mark a message as a request for learning materials.
const RESOURCE_KEYWORDS: &[&str] = &["resource", "material", "book", "tutorial", "recommend"];

/// At most this many resource entries are returned in a chat reply.
const MAX_SAMPLED_RESOURCES: usize = 4;

const OFF_TOPIC_REPLY: &str = "I am an AI learning assistant. Please ask me questions related \
     to artificial intelligence. I can help you with AI concepts, learning resources, career \
     guidance, technical details, or any other AI-related topics.";

/// Resolves each chat request to exactly one reply shape: an in-flight quiz
/// owns the conversation, an empty message asks for a topic introduction,
/// and everything else is gated by keyword before reaching the LLM.
#[derive(Clone)]
pub struct ChatService {
    db: Database,
    llm: LLMService,
    catalog: TopicCatalog,
    resources: ResourceLibrary,
    quiz: QuizEngine,
    progress: ProgressTracker,
}

impl ChatService {
    pub fn new(
        db: Database,
        llm: LLMService,
        catalog: TopicCatalog,
        resources: ResourceLibrary,
        quiz: QuizEngine,
        progress: ProgressTracker,
    ) -> Self {
        Self {
            db,
            llm,
            catalog,
            resources,
            quiz,
            progress,
        }
    }

    pub async fn handle_chat(
        &self,
        user: &User,
        request: ChatRequest,
    ) -> Result<ChatReply, ApiError> {
        let topic = match request.topic.as_deref() {
            Some(topic) if !topic.is_empty() => topic,
            _ => {
                return Err(ApiError::ValidationError("Topic is required".to_string()));
            }
        };

        // An in-flight quiz owns the conversation until it completes.
        if let Some(cursor) = request
            .quiz_state
            .as_ref()
            .filter(|cursor| !cursor.quiz_id.is_empty())
        {
            let answer = request.message.as_deref().map(str::trim).unwrap_or("");
            if answer.is_empty() {
                return Err(ApiError::ValidationError(
                    "Message is required to answer the quiz".to_string(),
                ));
            }
            return self.quiz.answer(user.id, cursor, answer).await;
        }

        let message = match request.message.as_deref().map(str::trim) {
            Some(message) if !message.is_empty() => message,
            _ => return self.topic_introduction(user, topic).await,
        };

        let message_lower = message.to_lowercase();

        if message_lower.contains("quiz") {
            return self.quiz.start(user.id, topic);
        }

        if RESOURCE_KEYWORDS
            .iter()
            .any(|keyword| message_lower.contains(keyword))
        {
            // The pool spans the topic's own list and its subtopic lists.
            let entries = self.resources.for_topic_with_subtopics(topic);
            let sampled = sample_entries(&entries, MAX_SAMPLED_RESOURCES);
            debug!(
                user_id = %user.id,
                topic = %topic,
                available = entries.len(),
                returned = sampled.len(),
                "Resource request detected"
            );
            return Ok(ChatReply::Resources { resources: sampled });
        }

        if !AI_KEYWORDS
            .iter()
            .any(|keyword| message_lower.contains(keyword))
        {
            debug!(
                user_id = %user.id,
                topic = %topic,
                "Message failed the AI keyword gate, redirecting"
            );
            return Ok(ChatReply::Text {
                response: OFF_TOPIC_REPLY.to_string(),
            });
        }

        let topic_name = self.catalog.display_name(topic);
        let response = self.llm.tutor_reply(topic_name, message).await?;

        self.persist_turns(
            user,
            topic,
            vec![
                ChatMessage {
                    role: "user".to_string(),
                    content: message.to_string(),
                },
                ChatMessage {
                    role: "assistant".to_string(),
                    content: response.clone(),
                },
            ],
        )
        .await?;

        self.progress
            .apply(user.id, topic, ProgressSignal::Increment(1))
            .await?;

        Ok(ChatReply::Text { response })
    }

    /// No message yet: introduce the topic and list its subtopics.
    async fn topic_introduction(&self, user: &User, topic: &str) -> Result<ChatReply, ApiError> {
        let info = self
            .catalog
            .get(topic)
            .ok_or_else(|| ApiError::ValidationError("Invalid topic".to_string()))?;

        let intro = self.llm.topic_introduction(&info.name).await?;

        let bullets = info
            .subtopics
            .iter()
            .map(|subtopic| format!("- {}", subtopic))
            .collect::<Vec<_>>()
            .join("\n");
        let response = format!(
            "{}\n\nHere are some subtopics you can explore under {}:\n{}",
            intro, info.name, bullets
        );

        self.persist_turns(
            user,
            topic,
            vec![ChatMessage {
                role: "assistant".to_string(),
                content: response.clone(),
            }],
        )
        .await?;

        Ok(ChatReply::Introduction {
            response,
            subtopics: info.subtopics.clone(),
        })
    }

    /// Each exchange becomes its own record; existing records are never
    /// touched by the orchestrator.
    async fn persist_turns(
        &self,
        user: &User,
        topic: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<(), ApiError> {
        let preview = messages.first().map(|m| make_preview(&m.content));
        let record = ChatRecord {
            id: Uuid::new_v4(),
            user_id: user.id,
            topic: topic.to_string(),
            messages,
            quiz_state: None,
            preview,
            timestamp: Utc::now(),
        };
        self.db.insert_chat(&record).await?;
        Ok(())
    }

    /// Store a client-assembled transcript. With a `chat_id` the named record
    /// is replaced wholesale, but only when the caller owns it.
    pub async fn save_chat(
        &self,
        user: &User,
        request: SaveChatRequest,
    ) -> Result<ChatRecord, ApiError> {
        if request.topic.is_empty() {
            return Err(ApiError::ValidationError("Topic is required".to_string()));
        }

        let preview = request.messages.first().map(|m| make_preview(&m.content));
        let record = ChatRecord {
            id: request.chat_id.unwrap_or_else(Uuid::new_v4),
            user_id: user.id,
            topic: request.topic,
            messages: request.messages,
            quiz_state: request.quiz_state,
            preview,
            timestamp: Utc::now(),
        };

        match request.chat_id {
            Some(chat_id) => {
                if !self.db.overwrite_chat(&record).await? {
                    return Err(ApiError::NotFound(format!("Chat '{}' not found", chat_id)));
                }
                info!(
                    user_id = %user.id,
                    chat_id = %chat_id,
                    message_count = record.messages.len(),
                    "Chat overwritten"
                );
            }
            None => {
                self.db.insert_chat(&record).await?;
                info!(
                    user_id = %user.id,
                    chat_id = %record.id,
                    message_count = record.messages.len(),
                    "Chat saved"
                );
            }
        }

        Ok(record)
    }

    /// List the caller's saved chats, newest first.
    pub async fn history(&self, user: &User) -> Result<Vec<ChatSummary>, ApiError> {
        let records = self.db.get_chats_for_user(user.id).await?;
        Ok(records.iter().map(ChatSummary::from).collect())
    }

    /// Load one saved chat in full. Unknown ids and chats owned by another
    /// user both come back as not found.
    pub async fn fetch_chat(&self, user: &User, chat_id: Uuid) -> Result<ChatDetail, ApiError> {
        let record = self
            .db
            .get_chat(chat_id, user.id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Chat '{}' not found", chat_id)))?;

        Ok(ChatDetail {
            topic: record.topic,
            messages: record.messages,
            quiz_state: record.quiz_state,
        })
    }
}

static HTML_TAG: OnceLock<Regex> = OnceLock::new();

fn html_tag_regex() -> &'static Regex {
    HTML_TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("invalid HTML tag pattern"))
}

/// First-message preview for the history list: HTML tags stripped, cut to 50
/// characters with a trailing ellipsis when longer.
pub fn make_preview(content: &str) -> String {
    let stripped = html_tag_regex().replace_all(content, "");
    if stripped.chars().count() > 50 {
        let cut: String = stripped.chars().take(50).collect();
        format!("{}...", cut)
    } else {
        stripped.into_owned()
    }
}
