use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::content::QuestionBank;
use crate::database::Database;
use crate::errors::ApiError;
use crate::models::Level;

/// A progress-affecting event observed while tutoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressSignal {
    /// A finished quiz: `correct` answers out of the topic's bank size.
    QuizScore { correct: usize },
    /// A flat credit, e.g. for asking a substantive question.
    Increment(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub topic_percentage: i32,
    pub level: Level,
}

/// Applies progress signals to a user's per-topic percentages and keeps the
/// derived level in step. The read-modify-write on one user's progress map is
/// serialized through a per-user async lock so concurrent quiz completions
/// cannot drop each other's credit; different users never contend.
#[derive(Clone)]
pub struct ProgressTracker {
    db: Database,
    bank: QuestionBank,
    user_locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ProgressTracker {
    pub fn new(db: Database, bank: QuestionBank) -> Self {
        Self {
            db,
            bank,
            user_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock_for(&self, user_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.user_locks.lock().unwrap();
        locks.entry(user_id).or_default().clone()
    }

    /// Drop lock entries no in-flight update holds. Returns how many were
    /// removed; a pruned user gets a fresh lock on their next event.
    pub fn prune_locks(&self) -> usize {
        let mut locks = self.user_locks.lock().unwrap();
        let before = locks.len();
        // A strong count of one means only the map refers to the lock.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    /// Apply one signal to `topic` for `user_id`. Returns the updated topic
    /// percentage and level, or `None` when the user does not exist.
    pub async fn apply(
        &self,
        user_id: Uuid,
        topic: &str,
        signal: ProgressSignal,
    ) -> Result<Option<ProgressUpdate>, ApiError> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let user = match self.db.get_user(user_id).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let current = user.progress.get(topic).copied().unwrap_or(0);

        let delta = match signal {
            ProgressSignal::QuizScore { correct } => {
                match self.bank.total_questions(topic) {
                    Some(total) if total > 0 => {
                        let percentage = (correct as i64 * 100) / total as i64;
                        if percentage == 100 {
                            10
                        } else if percentage >= 60 {
                            3
                        } else {
                            1
                        }
                    }
                    // Total unknown: the percentage cannot be computed, so no
                    // quiz credit is granted and nothing is written.
                    _ => {
                        debug!(
                            user_id = %user_id,
                            topic = %topic,
                            "Quiz score for topic absent from question bank, skipping"
                        );
                        return Ok(Some(ProgressUpdate {
                            topic_percentage: current,
                            level: user.level,
                        }));
                    }
                }
            }
            ProgressSignal::Increment(n) => n,
        };

        let mut progress = user.progress.clone();
        let updated = (current + delta).clamp(0, 100);
        progress.insert(topic.to_string(), updated);

        let sum: i64 = progress.values().map(|v| *v as i64).sum();
        let average = sum as f64 / progress.len() as f64;
        let level = Level::from_average(average);

        if !self.db.update_progress(user_id, &progress, level).await? {
            return Ok(None);
        }

        info!(
            user_id = %user_id,
            topic = %topic,
            delta = delta,
            topic_percentage = updated,
            level = %level,
            "Progress updated"
        );

        Ok(Some(ProgressUpdate {
            topic_percentage: updated,
            level,
        }))
    }
}
