use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        let db = Database { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Close the pool; in-flight and later queries fail. Used on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                level TEXT NOT NULL DEFAULT 'beginner',
                progress TEXT NOT NULL DEFAULT '{}'
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                topic TEXT NOT NULL,
                messages TEXT NOT NULL,
                quiz_state TEXT,
                preview TEXT,
                timestamp TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        // History listing filters by user and sorts newest first
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chats_user_timestamp ON chats(user_id, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // User operations
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            level: Level::Beginner,
            progress: HashMap::new(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, level, progress)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.level.as_str())
        .bind(serde_json::to_string(&user.progress)?)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_user(row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_user(row)?)),
            None => Ok(None),
        }
    }

    /// Writes the full progress map and the derived level in one statement.
    pub async fn update_progress(
        &self,
        user_id: Uuid,
        progress: &HashMap<String, i32>,
        level: Level,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET progress = ?1, level = ?2 WHERE id = ?3")
            .bind(serde_json::to_string(progress)?)
            .bind(level.as_str())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn row_to_user(&self, row: sqlx::sqlite::SqliteRow) -> Result<User> {
        Ok(User {
            id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            level: Level::parse(&row.get::<String, _>("level")),
            progress: serde_json::from_str(&row.get::<String, _>("progress"))?,
        })
    }

    // Chat operations
    pub async fn insert_chat(&self, chat: &ChatRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chats (id, user_id, topic, messages, quiz_state, preview, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(chat.id.to_string())
        .bind(chat.user_id.to_string())
        .bind(&chat.topic)
        .bind(serde_json::to_string(&chat.messages)?)
        .bind(
            chat.quiz_state
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(&chat.preview)
        .bind(chat.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replaces the stored document wholesale. Scoped by user so one user
    /// cannot overwrite another's chat.
    pub async fn overwrite_chat(&self, chat: &ChatRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE chats
            SET topic = ?1, messages = ?2, quiz_state = ?3, preview = ?4, timestamp = ?5
            WHERE id = ?6 AND user_id = ?7
            "#,
        )
        .bind(&chat.topic)
        .bind(serde_json::to_string(&chat.messages)?)
        .bind(
            chat.quiz_state
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(&chat.preview)
        .bind(chat.timestamp.to_rfc3339())
        .bind(chat.id.to_string())
        .bind(chat.user_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_chat(&self, id: Uuid, user_id: Uuid) -> Result<Option<ChatRecord>> {
        let row = sqlx::query("SELECT * FROM chats WHERE id = ?1 AND user_id = ?2")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_chat(row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_chats_for_user(&self, user_id: Uuid) -> Result<Vec<ChatRecord>> {
        let rows = sqlx::query("SELECT * FROM chats WHERE user_id = ?1 ORDER BY timestamp DESC")
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        let mut chats = Vec::new();
        for row in rows {
            chats.push(self.row_to_chat(row)?);
        }

        Ok(chats)
    }

    fn row_to_chat(&self, row: sqlx::sqlite::SqliteRow) -> Result<ChatRecord> {
        Ok(ChatRecord {
            id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            user_id: Uuid::parse_str(&row.get::<String, _>("user_id"))?,
            topic: row.get("topic"),
            messages: serde_json::from_str(&row.get::<String, _>("messages"))?,
            quiz_state: row
                .get::<Option<String>, _>("quiz_state")
                .and_then(|s| serde_json::from_str(&s).ok()),
            preview: row.get("preview"),
            timestamp: chrono::DateTime::parse_from_rfc3339(&row.get::<String, _>("timestamp"))?
                .with_timezone(&Utc),
        })
    }
}
