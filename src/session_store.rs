use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct SessionEntry {
    username: String,
    expires_at: DateTime<Utc>,
}

/// In-memory session store with sliding expiration
///
/// Every successful lookup pushes the deadline out by the full TTL, so a
/// session stays alive as long as the client keeps using it. Sessions do not
/// survive a process restart.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn with_ttl_days(days: i64) -> Self {
        Self::new(Duration::days(days))
    }

    /// Mint a fresh token for the user and record its expiry.
    pub async fn create_session(&self, username: &str) -> String {
        let token = Self::generate_token();
        let entry = SessionEntry {
            username: username.to_string(),
            expires_at: Utc::now() + self.ttl,
        };

        let mut sessions = self.sessions.write().await;

        // Drop stale entries before adding a new one
        Self::cleanup_expired_entries(&mut sessions, Utc::now());

        sessions.insert(token.clone(), entry);
        debug!(
            "Session created for user {}, active sessions: {}",
            username,
            sessions.len()
        );

        token
    }

    /// Resolve a token to its username, refreshing the sliding deadline.
    /// Expired entries are removed on sight.
    pub async fn validate_session(&self, token: &str) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();

        if let Some(entry) = sessions.get_mut(token) {
            if entry.expires_at > now {
                entry.expires_at = now + self.ttl;
                debug!("Session refreshed for user {}", entry.username);
                return Some(entry.username.clone());
            }
            debug!("Session expired for user {}, removing", entry.username);
            sessions.remove(token);
        }

        None
    }

    /// Remove a session outright (logout). Returns whether it existed.
    pub async fn remove_session(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(token) {
            Some(entry) => {
                info!("Session removed for user {}", entry.username);
                true
            }
            None => false,
        }
    }

    /// Manual cleanup - removes expired entries
    pub async fn cleanup(&self) {
        let mut sessions = self.sessions.write().await;
        Self::cleanup_expired_entries(&mut sessions, Utc::now());
    }

    /// Number of stored sessions, including any not yet purged
    pub async fn active_sessions(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    fn cleanup_expired_entries(sessions: &mut HashMap<String, SessionEntry>, now: DateTime<Utc>) {
        let expired_keys: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired_keys {
            if let Some(entry) = sessions.remove(&key) {
                debug!("Removed expired session for user {}", entry.username);
            }
        }
    }

    /// 32 random bytes, hex-encoded. OsRng so tokens are not guessable.
    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}
