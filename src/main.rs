use anyhow::Result;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ai_tutor::{
    api::{create_router, AppState},
    auth_service::AuthService,
    chat_service::ChatService,
    config::{Config, LoggingConfig},
    content::{QuestionBank, ResourceLibrary, TopicCatalog},
    database::Database,
    llm_service::LLMService,
    log_system_event,
    progress::ProgressTracker,
    quiz_engine::QuizEngine,
    session_store::SessionStore,
};

// Expired sessions are also rejected on read; the sweep caps the memory held
// by stale sessions, abandoned quiz attempts, and idle progress locks.
const MAINTENANCE_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

// Quizzes run for minutes; an attempt this old was abandoned.
const QUIZ_ATTEMPT_TTL_HOURS: i64 = 24;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logging comes up before the full config load so config events are visible
    let logging_config = LoggingConfig::from_env()?;
    let _guard = setup_logging(&logging_config)?;

    let config = Config::from_env()?;
    config.validate()?;

    log_system_event!(startup, component = "server", "Starting AI tutor server");

    let db = Database::new(&config.database.url).await?;
    log_system_event!(startup, component = "database", "Database initialized");

    let question_bank = QuestionBank::load(&config.content.question_bank_path);
    let resources = ResourceLibrary::load(&config.content.resources_path);
    let catalog = TopicCatalog::builtin();
    info!(
        topics = catalog.len(),
        question_bank_path = %config.content.question_bank_path,
        resources_path = %config.content.resources_path,
        "Content loaded"
    );

    let llm_service = LLMService::new_with_provider(
        config.llm.api_key.clone(),
        config.llm.base_url.clone(),
        config.llm.provider,
        config.llm.model.clone(),
        config.llm.request_timeout_secs,
    );
    info!(
        provider = llm_service.provider_name(),
        model = llm_service.model_name(),
        "Initialized LLM service"
    );

    let sessions = SessionStore::with_ttl_days(config.session.ttl_days);

    let progress = ProgressTracker::new(db.clone(), question_bank.clone());
    let quiz_engine = QuizEngine::new(question_bank, progress.clone());
    spawn_maintenance_sweeper(sessions.clone(), quiz_engine.clone(), progress.clone());
    let chat_service = ChatService::new(
        db.clone(),
        llm_service,
        catalog,
        resources.clone(),
        quiz_engine,
        progress,
    );
    let auth_service = AuthService::new(db, sessions);

    let state = AppState {
        auth_service,
        chat_service,
        resources,
        session: config.session.clone(),
    };

    let app = create_router(state).layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    log_system_event!(
        startup,
        component = "http_server",
        format!("Listening on {}", addr)
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_maintenance_sweeper(
    sessions: SessionStore,
    quiz_engine: QuizEngine,
    progress: ProgressTracker,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MAINTENANCE_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sessions.cleanup().await;
            let active_sessions = sessions.active_sessions().await;
            let evicted_attempts =
                quiz_engine.evict_stale(chrono::Duration::hours(QUIZ_ATTEMPT_TTL_HOURS));
            let pruned_locks = progress.prune_locks();
            debug!(
                active_sessions,
                evicted_attempts, pruned_locks, "Maintenance sweep finished"
            );
        }
    });
}

fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use std::fs;
    use tracing_subscriber::fmt;

    // RUST_LOG wins; the configured level is the fallback filter
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
    });

    let (file_layer, guard) = if config.file_enabled {
        // Create logs directory if it doesn't exist
        fs::create_dir_all(&config.log_directory).unwrap_or_else(|e| {
            eprintln!("Warning: Could not create logs directory: {}", e);
        });

        let file_appender = tracing_appender::rolling::daily(&config.log_directory, "ai-tutor.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

        // No ANSI colors in files
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking_file);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!(
        log_directory = %config.log_directory,
        file_enabled = config.file_enabled,
        console_enabled = config.console_enabled,
        "Logging initialized"
    );

    Ok(guard)
}
