use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::{RngCore, rngs::OsRng};
use tracing::info;

use crate::database::Database;
use crate::errors::{ApiError, classify_storage_error};
use crate::models::{User, UserInfo};
use crate::session_store::SessionStore;
use crate::{log_validation, log_api_warn};

/// Registration, login and session resolution. Passwords are stored as
/// Argon2id PHC strings; plaintext never leaves this module.
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    sessions: SessionStore,
}

impl AuthService {
    pub fn new(db: Database, sessions: SessionStore) -> Self {
        Self { db, sessions }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<String, ApiError> {
        if username.is_empty() || password.is_empty() {
            log_validation!(
                failure,
                "auth_service",
                error = "missing username or password"
            );
            return Err(ApiError::ValidationError(
                "Username and password are required".to_string(),
            ));
        }

        if self.db.get_user_by_username(username).await?.is_some() {
            log_api_warn!("register", "Username already taken");
            return Err(ApiError::DuplicateResource(
                "Username already exists".to_string(),
            ));
        }

        let password_hash = hash_password(password)?;

        // The pre-check above races with concurrent registrations; the UNIQUE
        // constraint is the authority and its violation maps to the same 409.
        let user = match self.db.create_user(username, &password_hash).await {
            Ok(user) => user,
            Err(e) => return Err(classify_storage_error(&e)),
        };

        info!(user_id = %user.id, username = %user.username, "User registered");
        log_validation!(success, "auth_service", "registration accepted");

        Ok("Registration successful! You can now login.".to_string())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(String, UserInfo), ApiError> {
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::ValidationError(
                "Username and password are required".to_string(),
            ));
        }

        let user = match self.db.get_user_by_username(username).await? {
            Some(user) => user,
            None => {
                log_api_warn!("login", "Unknown username");
                return Err(ApiError::AuthenticationRequired(
                    "Invalid credentials".to_string(),
                ));
            }
        };

        if !verify_password(password, &user.password_hash)? {
            log_api_warn!("login", user_id = user.id, "Password mismatch");
            return Err(ApiError::AuthenticationRequired(
                "Invalid credentials".to_string(),
            ));
        }

        let token = self.sessions.create_session(&user.username).await;
        info!(user_id = %user.id, username = %user.username, "User logged in");

        Ok((token, UserInfo::from(&user)))
    }

    /// Drop the session behind the token. Unknown tokens are a quiet no-op.
    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.remove_session(token).await
    }

    /// Resolve a session token to its user, sliding the expiry forward.
    /// `None` covers both an invalid token and a vanished user.
    pub async fn current_user(&self, token: &str) -> Result<Option<User>, ApiError> {
        let username = match self.sessions.validate_session(token).await {
            Some(username) => username,
            None => return Ok(None),
        };

        let user = self.db.get_user_by_username(&username).await?;
        Ok(user)
    }
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| anyhow::anyhow!("Salt encoding error: {}", e))?;

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing error: {}", e))?
        .to_string();

    Ok(password_hash)
}

fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Stored hash is malformed: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
