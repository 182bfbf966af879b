use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    /// Derives the level from the average of all per-topic percentages.
    pub fn from_average(average: f64) -> Self {
        if average >= 100.0 {
            Level::Advanced
        } else if average >= 50.0 {
            Level::Intermediate
        } else {
            Level::Beginner
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }

    /// Unknown values fall back to beginner rather than failing the row load.
    pub fn parse(value: &str) -> Self {
        match value {
            "advanced" => Level::Advanced,
            "intermediate" => Level::Intermediate,
            _ => Level::Beginner,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub level: Level,
    pub progress: HashMap<String, i32>, // topic key -> percentage, 0..=100
}

// Client-facing view of a user; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    pub level: Level,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            username: user.username.clone(),
            level: user.level,
        }
    }
}

/// Soft session check result. `user` is `None` when the cookie is missing,
/// expired, or otherwise unusable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSessionResponse {
    pub user: Option<UserInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub progress: HashMap<String, i32>,
    pub level: Level,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>, // rendered lines, e.g. "A) Paris"
    pub correct: String,      // answer letter, e.g. "A"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
}

// Server-side state of one quiz run, keyed by (user, quiz) while in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub quiz_id: String,
    pub questions: Vec<QuizQuestion>,
    pub current_index: usize,
    pub correct_count: usize,
    pub answers: Vec<AnswerRecord>,
    pub started_at: DateTime<Utc>,
}

// Opaque resume token the client threads back with each quiz answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizStateCursor {
    pub quiz_id: String,
    pub current_question: usize,
    pub total_questions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "user" or "assistant"
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub topic: String,
    pub messages: Vec<ChatMessage>,
    pub quiz_state: Option<QuizStateCursor>,
    pub preview: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: Uuid,
    pub topic: String,
    pub preview: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&ChatRecord> for ChatSummary {
    fn from(record: &ChatRecord) -> Self {
        ChatSummary {
            id: record.id,
            topic: record.topic.clone(),
            preview: record.preview.clone(),
            timestamp: record.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDetail {
    pub topic: String,
    pub messages: Vec<ChatMessage>,
    pub quiz_state: Option<QuizStateCursor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub topic: Option<String>,
    pub quiz_state: Option<QuizStateCursor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveChatRequest {
    pub chat_id: Option<Uuid>, // present = overwrite that chat, absent = create new
    pub topic: String,
    pub messages: Vec<ChatMessage>,
    pub quiz_state: Option<QuizStateCursor>,
}

/// Every chat turn resolves to exactly one of these shapes. The tag tells the
/// client how to render the payload without sniffing for optional fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatReply {
    Introduction {
        response: String,
        subtopics: Vec<String>,
    },
    Quiz {
        response: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        quiz_state: Option<QuizStateCursor>,
        quiz_completed: bool,
    },
    Resources {
        resources: Vec<ResourceEntry>,
    },
    Text {
        response: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_average_boundaries() {
        assert_eq!(Level::from_average(100.0), Level::Advanced);
        assert_eq!(Level::from_average(99.9), Level::Intermediate);
        assert_eq!(Level::from_average(50.0), Level::Intermediate);
        assert_eq!(Level::from_average(49.9), Level::Beginner);
        assert_eq!(Level::from_average(0.0), Level::Beginner);
    }

    #[test]
    fn test_level_parse_round_trips_and_defaults() {
        assert_eq!(Level::parse("advanced"), Level::Advanced);
        assert_eq!(Level::parse("intermediate"), Level::Intermediate);
        assert_eq!(Level::parse("beginner"), Level::Beginner);
        assert_eq!(Level::parse("garbage"), Level::Beginner);
        assert_eq!(Level::parse(Level::Advanced.as_str()), Level::Advanced);
    }

    #[test]
    fn test_chat_reply_serializes_with_kind_tag() {
        let reply = ChatReply::Quiz {
            response: "Question 1 of 3".to_string(),
            quiz_state: Some(QuizStateCursor {
                quiz_id: "machine-learning".to_string(),
                current_question: 0,
                total_questions: 3,
            }),
            quiz_completed: false,
        };
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["kind"], "quiz");
        assert_eq!(value["quiz_state"]["quiz_id"], "machine-learning");
        assert_eq!(value["quiz_completed"], false);

        let done = ChatReply::Quiz {
            response: "Quiz complete!".to_string(),
            quiz_state: None,
            quiz_completed: true,
        };
        let value = serde_json::to_value(&done).unwrap();
        assert_eq!(value["kind"], "quiz");
        assert!(value.get("quiz_state").is_none());

        let text = ChatReply::Text {
            response: "hello".to_string(),
        };
        assert_eq!(serde_json::to_value(&text).unwrap()["kind"], "text");

        let intro = ChatReply::Introduction {
            response: "welcome".to_string(),
            subtopics: vec!["Supervised Learning".to_string()],
        };
        let value = serde_json::to_value(&intro).unwrap();
        assert_eq!(value["kind"], "introduction");
        assert_eq!(value["subtopics"][0], "Supervised Learning");
    }

    #[test]
    fn test_user_info_hides_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            level: Level::Beginner,
            progress: HashMap::new(),
        };
        let info = UserInfo::from(&user);
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["username"], "alice");
        assert_eq!(value["level"], "beginner");
        assert!(value.get("password_hash").is_none());
    }
}
