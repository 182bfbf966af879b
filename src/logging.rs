// Macros file - tracing macros are imported within the macro definitions

/// Standardized logging macros for consistent field names and message patterns across the application
///
/// These macros ensure:
/// - Consistent field naming conventions
/// - Appropriate logging levels for different scenarios
/// - Structured logging with context
/// - Consistent message formatting

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, user_id = $user_id:expr) => {
        tracing::debug!(
            operation = $operation,
            user_id = %$user_id,
            "API operation started"
        );
    };
    ($operation:expr, chat_id = $chat_id:expr) => {
        tracing::debug!(
            operation = $operation,
            chat_id = %$chat_id,
            "API operation started"
        );
    };
    ($operation:expr, topic = $topic:expr) => {
        tracing::debug!(
            operation = $operation,
            topic = %$topic,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, user_id = $user_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            user_id = %$user_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, chat_id = $chat_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            chat_id = %$chat_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API operation errors with consistent structure
#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, user_id = $user_id:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            user_id = %$user_id,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
    ($operation:expr, chat_id = $chat_id:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            chat_id = %$chat_id,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
    ($operation:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
}

/// Log API warnings with context
#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, user_id = $user_id:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            user_id = %$user_id,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, topic = $topic:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            topic = %$topic,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "API operation warning: {}", $msg
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    #[test]
    fn test_logging_macros_compile() {
        let user_id = Uuid::new_v4();
        let chat_id = Uuid::new_v4();
        let error = anyhow::anyhow!("test error");

        // Test that all macro variants compile successfully
        log_api_start!("test_operation", user_id = user_id);
        log_api_start!("test_operation", chat_id = chat_id);
        log_api_start!("test_operation", topic = "machine-learning");
        log_api_start!("test_operation");

        log_api_success!("test_operation", user_id = user_id, "operation completed");
        log_api_success!("test_operation", chat_id = chat_id, "chat saved");
        log_api_success!("test_operation", count = 5, "chats listed");
        log_api_success!("test_operation", "operation completed");

        log_api_error!(
            "test_operation",
            user_id = user_id,
            error = error,
            "operation failed"
        );
        log_api_error!(
            "test_operation",
            chat_id = chat_id,
            error = anyhow::anyhow!("missing"),
            "chat lookup failed"
        );
        log_api_error!(
            "test_operation",
            error = anyhow::anyhow!("other"),
            "operation failed"
        );

        log_api_warn!("test_operation", user_id = user_id, "operation warning");
        log_api_warn!("test_operation", topic = "machine-learning", "unknown topic");
        log_api_warn!("test_operation", "operation warning");

        log_system_event!(startup, component = "server", "server starting");
        log_system_event!(shutdown, component = "server", "server stopping");
        log_system_event!(config, "configuration loaded successfully");

        log_validation!(success, "api_request", "request validated");
        log_validation!(
            failure,
            "configuration",
            error = anyhow::anyhow!("bad value")
        );
    }
}
