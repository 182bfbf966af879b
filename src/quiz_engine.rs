use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

use crate::content::QuestionBank;
use crate::errors::ApiError;
use crate::models::{AnswerRecord, ChatReply, QuizAttempt, QuizQuestion, QuizStateCursor};
use crate::progress::{ProgressSignal, ProgressTracker};

/// Drives one multiple-choice quiz per (user, topic) pair. Attempts live in
/// process memory; the client threads a `QuizStateCursor` through successive
/// chat requests, which also lets an attempt be rebuilt after a restart or
/// when a saved chat is resumed.
#[derive(Clone)]
pub struct QuizEngine {
    bank: QuestionBank,
    progress: ProgressTracker,
    attempts: Arc<Mutex<HashMap<(Uuid, String), QuizAttempt>>>,
}

impl QuizEngine {
    pub fn new(bank: QuestionBank, progress: ProgressTracker) -> Self {
        Self {
            bank,
            progress,
            attempts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Begin a quiz over the topic's full question list and pose the first
    /// question. Any half-finished attempt for the same topic is discarded.
    pub fn start(&self, user_id: Uuid, topic: &str) -> Result<ChatReply, ApiError> {
        let questions = match self.bank.questions(topic) {
            Some(questions) if !questions.is_empty() => questions,
            _ => {
                return Err(ApiError::NotFound(format!(
                    "No quiz available for topic '{}'",
                    topic
                )));
            }
        };

        let total = questions.len();
        let attempt = QuizAttempt {
            quiz_id: topic.to_string(),
            questions: questions.to_vec(),
            current_index: 0,
            correct_count: 0,
            answers: Vec::new(),
            started_at: Utc::now(),
        };
        let first = format_question(&attempt.questions[0], 0, total);

        {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.insert((user_id, topic.to_string()), attempt);
        }

        info!(
            user_id = %user_id,
            quiz_id = %topic,
            total_questions = total,
            "Quiz started"
        );

        Ok(ChatReply::Quiz {
            response: format!(
                "Time for a quiz! Reply with the letter of your answer.\n\n{}",
                first
            ),
            quiz_state: Some(QuizStateCursor {
                quiz_id: topic.to_string(),
                current_question: 0,
                total_questions: total,
            }),
            quiz_completed: false,
        })
    }

    /// Score one answer against the current question. On the last question
    /// the attempt is summarized into progress and dropped; otherwise the
    /// next question is posed with an advanced cursor.
    pub async fn answer(
        &self,
        user_id: Uuid,
        cursor: &QuizStateCursor,
        message: &str,
    ) -> Result<ChatReply, ApiError> {
        let quiz_id = cursor.quiz_id.as_str();

        // Both lookups are hard errors and must precede any state change.
        let bank_questions = self.bank.questions(quiz_id).ok_or_else(|| {
            ApiError::NotFound(format!("Quiz '{}' not found", quiz_id))
        })?;
        if cursor.current_question >= bank_questions.len() {
            return Err(ApiError::NotFound(format!(
                "Question {} is out of range for quiz '{}'",
                cursor.current_question, quiz_id
            )));
        }

        // The stored attempt is left untouched until the progress write for
        // this answer has succeeded; a 502 mid-quiz leaves the same cursor
        // replayable against the same question.
        let key = (user_id, quiz_id.to_string());
        let existing = {
            let attempts = self.attempts.lock().unwrap();
            attempts.get(&key).cloned()
        };

        // A valid cursor without a live attempt means the process restarted
        // or a saved chat was resumed; pick up from the cursor position with
        // an empty answer log.
        let mut attempt = existing.unwrap_or_else(|| QuizAttempt {
            quiz_id: quiz_id.to_string(),
            questions: bank_questions.to_vec(),
            current_index: cursor.current_question,
            correct_count: 0,
            answers: Vec::new(),
            started_at: Utc::now(),
        });

        let index = attempt.current_index;
        let total = attempt.questions.len();
        let question = attempt.questions[index].clone();

        let user_answer = message.trim();
        let is_correct = user_answer.eq_ignore_ascii_case(&question.correct);

        attempt.answers.push(AnswerRecord {
            question: question.question.clone(),
            user_answer: user_answer.to_string(),
            correct_answer: question.correct.clone(),
            is_correct,
        });
        if is_correct {
            attempt.correct_count += 1;
        }

        if index == total - 1 {
            let correct = attempt.correct_count;
            let summary = build_summary(&attempt);

            info!(
                user_id = %user_id,
                quiz_id = %quiz_id,
                score = correct,
                total_questions = total,
                "Quiz completed"
            );

            self.progress
                .apply(user_id, quiz_id, ProgressSignal::QuizScore { correct })
                .await?;

            self.attempts.lock().unwrap().remove(&key);

            return Ok(ChatReply::Quiz {
                response: summary,
                quiz_state: None,
                quiz_completed: true,
            });
        }

        attempt.current_index = index + 1;
        let feedback = if is_correct {
            "Correct!".to_string()
        } else {
            format!("Not quite. The correct answer was {}.", question.correct)
        };
        let next = format_question(&attempt.questions[index + 1], index + 1, total);
        let next_cursor = QuizStateCursor {
            quiz_id: quiz_id.to_string(),
            current_question: index + 1,
            total_questions: total,
        };

        if is_correct {
            self.progress
                .apply(user_id, quiz_id, ProgressSignal::Increment(1))
                .await?;
        }

        {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.insert(key, attempt);
        }

        Ok(ChatReply::Quiz {
            response: format!("{}\n\n{}", feedback, next),
            quiz_state: Some(next_cursor),
            quiz_completed: false,
        })
    }

    /// Drop attempts started more than `max_age` ago. Returns how many were
    /// removed.
    pub fn evict_stale(&self, max_age: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut attempts = self.attempts.lock().unwrap();
        let before = attempts.len();
        attempts.retain(|_, attempt| attempt.started_at > cutoff);
        before - attempts.len()
    }
}

fn format_question(question: &QuizQuestion, index: usize, total: usize) -> String {
    format!(
        "Question {} of {}:\n\n{}\n\n{}",
        index + 1,
        total,
        question.question,
        question.options.join("\n")
    )
}

fn build_summary(attempt: &QuizAttempt) -> String {
    let total = attempt.questions.len();
    let percent = if total > 0 {
        attempt.correct_count * 100 / total
    } else {
        0
    };

    let mut lines = vec![format!(
        "Quiz complete! You scored {} out of {} ({}%).\n",
        attempt.correct_count, total, percent
    )];
    for (i, answer) in attempt.answers.iter().enumerate() {
        if answer.is_correct {
            lines.push(format!("{}. ✓ {}", i + 1, answer.question));
        } else {
            lines.push(format!(
                "{}. ✗ {} (your answer: {}, correct answer: {})",
                i + 1,
                answer.question,
                answer.user_answer,
                answer.correct_answer
            ));
        }
    }

    let encouragement = if percent >= 80 {
        "Excellent work! You have a strong grasp of this topic."
    } else if percent >= 60 {
        "Good job! A little more practice and you will have it down."
    } else {
        "Keep studying! Review the material and try the quiz again."
    };
    lines.push(format!("\n{}", encouragement));

    lines.join("\n")
}
