use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use tracing::{info, warn};

use crate::llm_providers::LLMProviderType;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: LLMConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub content: ContentConfig,
    pub logging: LoggingConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Large Language Model service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub provider: LLMProviderType,
    pub model: Option<String>,
    pub request_timeout_secs: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Session cookie configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub ttl_days: i64,
    pub cookie_secure: bool,
}

/// Paths to the bundled question bank and resource library
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    pub question_bank_path: String,
    pub resources_path: String,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let database_config = DatabaseConfig::from_env()?;
        let llm_config = LLMConfig::from_env()?;
        let server_config = ServerConfig::from_env()?;
        let session_config = SessionConfig::from_env()?;
        let content_config = ContentConfig::from_env()?;
        let logging_config = LoggingConfig::from_env()?;

        let config = Config {
            database: database_config,
            llm: llm_config,
            server: server_config,
            session: session_config,
            content: content_config,
            logging: logging_config,
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            database_url_masked = %mask_sensitive_data(&self.database.url),
            llm_provider = ?self.llm.provider,
            llm_model = ?self.llm.model,
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            session_ttl_days = self.session.ttl_days,
            question_bank_path = %self.content.question_bank_path,
            resources_path = %self.content.resources_path,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Only the SQLite driver is compiled in
        if !self.database.url.starts_with("sqlite:") {
            return Err(anyhow!("DATABASE_URL must start with 'sqlite:'"));
        }

        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.session.ttl_days < 1 {
            return Err(anyhow!("SESSION_TTL_DAYS must be at least 1"));
        }

        if self.llm.api_key.is_empty() || self.llm.api_key == "your-api-key" {
            warn!("LLM API key appears to be placeholder or empty - LLM features may not work");
        }

        // Full filter directives such as "info,ai_tutor=debug" pass through
        // to the EnvFilter parser untouched.
        let level = self.logging.level.to_lowercase();
        if !level.contains(',')
            && !level.contains('=')
            && !["trace", "debug", "info", "warn", "error"].contains(&level.as_str())
        {
            warn!(
                "Invalid log level '{}', using 'info' as fallback",
                self.logging.level
            );
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        let url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:ai_tutor.db?mode=rwc".to_string());

        Ok(DatabaseConfig { url })
    }
}

impl LLMConfig {
    fn from_env() -> Result<Self> {
        // TOGETHER_API_KEY is honored for parity with earlier deployments
        let api_key = env::var("LLM_API_KEY")
            .or_else(|_| env::var("TOGETHER_API_KEY"))
            .unwrap_or_else(|_| "your-api-key".to_string());

        let base_url = env::var("LLM_BASE_URL").ok();

        let provider_str = env::var("LLM_PROVIDER").unwrap_or_else(|_| "together".to_string());

        let provider = match provider_str.to_lowercase().as_str() {
            "openai" | "chatgpt" | "gpt" => LLMProviderType::OpenAI,
            "together" | "togetherai" => LLMProviderType::Together,
            _ => {
                info!(
                    "Unknown LLM provider '{}', defaulting to Together",
                    provider_str
                );
                LLMProviderType::Together
            }
        };

        let model = env::var("LLM_MODEL").ok();

        let timeout_str = env::var("LLM_REQUEST_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string());
        let request_timeout_secs = timeout_str
            .parse::<u64>()
            .map_err(|_| anyhow!("Invalid LLM_REQUEST_TIMEOUT_SECS value: '{}'", timeout_str))?;

        Ok(LLMConfig {
            api_key,
            base_url,
            provider,
            model,
            request_timeout_secs,
        })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "3000".to_string());

        let port = port_str.parse::<u16>().map_err(|_| {
            anyhow!(
                "Invalid PORT value: '{}'. Must be a number between 1-65535",
                port_str
            )
        })?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }
}

impl SessionConfig {
    fn from_env() -> Result<Self> {
        let ttl_str = env::var("SESSION_TTL_DAYS").unwrap_or_else(|_| "7".to_string());
        let ttl_days = ttl_str
            .parse::<i64>()
            .map_err(|_| anyhow!("Invalid SESSION_TTL_DAYS value: '{}'", ttl_str))?;

        let cookie_secure = env::var("SESSION_COOKIE_SECURE")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        Ok(SessionConfig {
            ttl_days,
            cookie_secure,
        })
    }
}

impl ContentConfig {
    fn from_env() -> Result<Self> {
        let question_bank_path =
            env::var("QUESTION_BANK_PATH").unwrap_or_else(|_| "content/quiz.json".to_string());

        let resources_path =
            env::var("RESOURCES_PATH").unwrap_or_else(|_| "content/resources.json".to_string());

        Ok(ContentConfig {
            question_bank_path,
            resources_path,
        })
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,ai_tutor=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    if data.len() <= 8 {
        "*".repeat(data.len())
    } else {
        format!("{}***{}", &data[..4], &data[data.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_mask_sensitive_data() {
        assert_eq!(mask_sensitive_data("short"), "*****");
        assert_eq!(mask_sensitive_data("sqlite:ai_tutor.db"), "sqli***r.db");
        assert_eq!(mask_sensitive_data("sk-1234567890abcdef"), "sk-1***cdef");
    }

    #[test]
    fn test_database_config_defaults() {
        // Clear environment variable to test default
        unsafe {
            env::remove_var("DATABASE_URL");
        }

        let config = DatabaseConfig::from_env().unwrap();
        assert_eq!(config.url, "sqlite:ai_tutor.db?mode=rwc");
    }

    // PORT and HOST are only touched here, so parallel tests cannot race on
    // them.
    #[test]
    fn test_server_config_defaults_and_invalid_port() {
        unsafe {
            env::remove_var("PORT");
            env::remove_var("HOST");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");

        unsafe {
            env::set_var("PORT", "not-a-number");
        }
        assert!(ServerConfig::from_env().is_err());

        unsafe {
            env::remove_var("PORT");
        }
    }

    #[test]
    fn test_session_config_defaults_and_invalid_ttl() {
        unsafe {
            env::remove_var("SESSION_TTL_DAYS");
            env::remove_var("SESSION_COOKIE_SECURE");
        }

        let config = SessionConfig::from_env().unwrap();
        assert_eq!(config.ttl_days, 7);
        assert!(config.cookie_secure);

        unsafe {
            env::set_var("SESSION_TTL_DAYS", "forever");
        }
        assert!(SessionConfig::from_env().is_err());

        unsafe {
            env::remove_var("SESSION_TTL_DAYS");
        }
    }

    #[test]
    fn test_content_config_defaults() {
        unsafe {
            env::remove_var("QUESTION_BANK_PATH");
            env::remove_var("RESOURCES_PATH");
        }

        let config = ContentConfig::from_env().unwrap();
        assert_eq!(config.question_bank_path, "content/quiz.json");
        assert_eq!(config.resources_path, "content/resources.json");
    }

    #[test]
    fn test_llm_provider_parsing() {
        let test_cases = vec![
            ("together", LLMProviderType::Together),
            ("Together", LLMProviderType::Together),
            ("togetherai", LLMProviderType::Together),
            ("openai", LLMProviderType::OpenAI),
            ("OpenAI", LLMProviderType::OpenAI),
            ("chatgpt", LLMProviderType::OpenAI),
            ("gpt", LLMProviderType::OpenAI),
            ("unknown", LLMProviderType::Together), // defaults to Together
        ];

        for (input, expected) in test_cases {
            unsafe {
                env::set_var("LLM_PROVIDER", input);
            }
            let config = LLMConfig::from_env().unwrap();
            assert_eq!(
                config.provider, expected,
                "Input '{}' should map to {:?}",
                input, expected
            );
        }

        unsafe {
            env::remove_var("LLM_PROVIDER");
        }
    }

    #[test]
    fn test_config_validation() {
        // Test valid configuration
        let config = Config {
            database: DatabaseConfig {
                url: "sqlite:test.db".to_string(),
            },
            llm: LLMConfig {
                api_key: "sk-valid-key".to_string(),
                base_url: None,
                provider: LLMProviderType::Together,
                model: None,
                request_timeout_secs: 30,
            },
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
            },
            session: SessionConfig {
                ttl_days: 7,
                cookie_secure: true,
            },
            content: ContentConfig {
                question_bank_path: "content/quiz.json".to_string(),
                resources_path: "content/resources.json".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_enabled: true,
                console_enabled: true,
                log_directory: "logs".to_string(),
            },
        };

        assert!(config.validate().is_ok());

        // Test invalid port
        let mut invalid_config = config.clone();
        invalid_config.server.port = 0;
        assert!(invalid_config.validate().is_err());

        // Test non-sqlite database URL
        let mut invalid_config = config.clone();
        invalid_config.database.url = "postgres://localhost/app".to_string();
        assert!(invalid_config.validate().is_err());

        // Test zero session lifetime
        let mut invalid_config = config.clone();
        invalid_config.session.ttl_days = 0;
        assert!(invalid_config.validate().is_err());
    }
}
