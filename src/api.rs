use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, CookieManagerLayer, Cookies};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth_service::AuthService,
    chat_service::ChatService,
    config::SessionConfig,
    content::ResourceLibrary,
    errors::{ApiError, ErrorContext},
    models::{
        ChatDetail, ChatRecord, ChatReply, ChatRequest, ChatSummary, CheckSessionResponse,
        LoginRequest, ProgressInfo, RegisterRequest, ResourceEntry, SaveChatRequest, User,
        UserInfo,
    },
};

// Import logging macros
use crate::{log_api_error, log_api_start, log_api_success, log_api_warn};

/// Name of the session cookie issued on login.
pub const SESSION_COOKIE: &str = "session_token";

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub chat_service: ChatService,
    pub resources: ResourceLibrary,
    pub session: SessionConfig,
}

#[derive(Deserialize)]
pub struct ResourceQuery {
    pub topic: Option<String>,
    pub subtopic: Option<String>,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn session_cookie(token: String, config: &SessionConfig) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_secure(config.cookie_secure);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(Duration::days(config.ttl_days));
    cookie
}

// Removal only matches the original cookie when the path agrees.
fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie
}

/// Resolve the session cookie to a full user record or fail with a 401-shaped
/// error for the caller to convert.
async fn require_user(state: &AppState, cookies: &Cookies) -> Result<User, ApiError> {
    let token = match cookies.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => {
            return Err(ApiError::AuthenticationRequired(
                "Missing session cookie".to_string(),
            ))
        }
    };

    match state.auth_service.current_user(&token).await? {
        Some(user) => Ok(user),
        None => Err(ApiError::AuthenticationRequired(
            "Session expired or invalid".to_string(),
        )),
    }
}

// Auth endpoints

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ApiResponse<()>>)> {
    info!(username = %request.username, "Registering new user");

    match state
        .auth_service
        .register(&request.username, &request.password)
        .await
    {
        Ok(message) => {
            log_api_success!("register", "user registered successfully");
            Ok(Json(ApiResponse::success(message)))
        }
        Err(e) => {
            let context = ErrorContext::new("register", "user").with_id(&request.username);
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, (StatusCode, Json<ApiResponse<()>>)> {
    info!(username = %request.username, "Logging in user");

    match state
        .auth_service
        .login(&request.username, &request.password)
        .await
    {
        Ok((token, user_info)) => {
            cookies.add(session_cookie(token, &state.session));
            log_api_success!("login", "user logged in successfully");
            Ok(Json(ApiResponse::success(user_info)))
        }
        Err(e) => {
            // Same reply for unknown usernames and wrong passwords.
            let context = ErrorContext::new("login", "user")
                .with_id(&request.username)
                .with_user_message("Invalid credentials");
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Json<ApiResponse<String>> {
    log_api_start!("logout");

    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        if state.auth_service.logout(cookie.value()).await {
            log_api_success!("logout", "session invalidated");
        } else {
            log_api_warn!("logout", "session was already invalid");
        }
    }
    cookies.remove(removal_cookie());

    Json(ApiResponse::success("Logged out successfully".to_string()))
}

/// Soft session check for page loads. Always 200; an unusable session just
/// reads as anonymous.
pub async fn check_session(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Json<ApiResponse<CheckSessionResponse>> {
    log_api_start!("check_session");

    let user = match cookies.get(SESSION_COOKIE) {
        Some(cookie) => match state.auth_service.current_user(cookie.value()).await {
            Ok(user) => user.as_ref().map(UserInfo::from),
            Err(e) => {
                log_api_error!("check_session", error = e, "session lookup failed");
                None
            }
        },
        None => None,
    };

    Json(ApiResponse::success(CheckSessionResponse { user }))
}

// Learner endpoints

pub async fn get_progress(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<ApiResponse<ProgressInfo>>, (StatusCode, Json<ApiResponse<()>>)> {
    log_api_start!("get_progress");

    let user = match require_user(&state, &cookies).await {
        Ok(user) => user,
        Err(e) => {
            let context = ErrorContext::new("get_progress", "session");
            return Err(e.to_response_with_context(context));
        }
    };

    log_api_success!("get_progress", user_id = user.id, "progress retrieved");
    Ok(Json(ApiResponse::success(ProgressInfo {
        progress: user.progress,
        level: user.level,
    })))
}

pub async fn chat(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatReply>>, (StatusCode, Json<ApiResponse<()>>)> {
    log_api_start!("chat");

    let user = match require_user(&state, &cookies).await {
        Ok(user) => user,
        Err(e) => {
            let context = ErrorContext::new("chat", "session");
            return Err(e.to_response_with_context(context));
        }
    };

    match state.chat_service.handle_chat(&user, request).await {
        Ok(reply) => {
            log_api_success!("chat", user_id = user.id, "chat turn completed");
            Ok(Json(ApiResponse::success(reply)))
        }
        Err(e) => {
            let context = ErrorContext::new("chat", "chat").with_id(&user.id.to_string());
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn get_history(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<ApiResponse<Vec<ChatSummary>>>, (StatusCode, Json<ApiResponse<()>>)> {
    log_api_start!("get_history");

    let user = match require_user(&state, &cookies).await {
        Ok(user) => user,
        Err(e) => {
            let context = ErrorContext::new("get_history", "session");
            return Err(e.to_response_with_context(context));
        }
    };

    match state.chat_service.history(&user).await {
        Ok(summaries) => {
            log_api_success!("get_history", count = summaries.len(), "chat history listed");
            Ok(Json(ApiResponse::success(summaries)))
        }
        Err(e) => {
            let context = ErrorContext::new("get_history", "chat");
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn get_chat(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ChatDetail>>, (StatusCode, Json<ApiResponse<()>>)> {
    log_api_start!("get_chat", chat_id = id);

    let user = match require_user(&state, &cookies).await {
        Ok(user) => user,
        Err(e) => {
            let context = ErrorContext::new("get_chat", "session");
            return Err(e.to_response_with_context(context));
        }
    };

    match state.chat_service.fetch_chat(&user, id).await {
        Ok(detail) => {
            log_api_success!("get_chat", chat_id = id, "chat retrieved");
            Ok(Json(ApiResponse::success(detail)))
        }
        Err(e) => {
            let context = ErrorContext::new("get_chat", "chat")
                .with_id(&id.to_string())
                .with_user_message("Chat not found");
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn save_chat(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(request): Json<SaveChatRequest>,
) -> Result<Json<ApiResponse<ChatRecord>>, (StatusCode, Json<ApiResponse<()>>)> {
    log_api_start!("save_chat");

    let user = match require_user(&state, &cookies).await {
        Ok(user) => user,
        Err(e) => {
            let context = ErrorContext::new("save_chat", "session");
            return Err(e.to_response_with_context(context));
        }
    };

    match state.chat_service.save_chat(&user, request).await {
        Ok(record) => {
            log_api_success!("save_chat", chat_id = record.id, "chat saved");
            Ok(Json(ApiResponse::success(record)))
        }
        Err(e) => {
            let context = ErrorContext::new("save_chat", "chat")
                .with_id(&user.id.to_string())
                .with_user_message("Chat not found");
            Err(e.to_response_with_context(context))
        }
    }
}

/// Unauthenticated resource browser. Unlike the chat path this returns the
/// full list for a topic, unsampled.
pub async fn get_resources(
    State(state): State<AppState>,
    Query(params): Query<ResourceQuery>,
) -> Json<ApiResponse<Vec<ResourceEntry>>> {
    log_api_start!("get_resources");

    let entries = match params.topic.as_deref() {
        Some(topic) => state.resources.for_topic(topic, params.subtopic.as_deref()),
        None => state.resources.all_entries(),
    };

    log_api_success!("get_resources", count = entries.len(), "resources listed");
    Json(ApiResponse::success(entries))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/check-session", get(check_session))
        .route("/api/progress", get(get_progress))
        .route("/api/chat", post(chat))
        .route("/api/history", get(get_history))
        .route("/api/chat/:id", get(get_chat))
        .route("/api/save-chat", post(save_chat))
        .route("/api/resources", get(get_resources))
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
