use anyhow::{anyhow, Result};
use std::env;
use tracing::{info, warn};

use crate::llm_providers::{CREDENTIAL_PREFIX, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: LLMConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Database connection configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Completion service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LLMConfig {
    /// API keys; one is chosen per generation request
    pub credentials: Vec<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            credentials: Vec::new(),
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1500,
            temperature: 0.7,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Self::from_lookup(&process_env)?;

        log_system_event!(config, "Configuration loaded successfully");
        Ok(config)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        Ok(Config {
            database: DatabaseConfig::from_lookup(lookup),
            llm: LLMConfig::from_lookup(lookup)?,
            server: ServerConfig::from_lookup(lookup)?,
            logging: LoggingConfig::from_lookup(lookup),
        })
    }

    /// Log a summary of loaded configuration (without sensitive data)
    pub fn log_configuration_summary(&self) {
        let masked_keys: Vec<String> = self
            .llm
            .credentials
            .iter()
            .map(|k| mask_sensitive_data(k))
            .collect();

        info!(
            database_url_masked = %mask_sensitive_data(&self.database.url),
            credentials = ?masked_keys,
            llm_base_url = %self.llm.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            llm_model = %self.llm.model,
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(anyhow!("DATABASE_URL must start with 'sqlite:'"));
        }

        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.llm.max_tokens == 0 {
            return Err(anyhow!("LLM_MAX_TOKENS must be greater than 0"));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(anyhow!(
                "LLM_TEMPERATURE must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            ));
        }

        // Credential problems degrade to the fallback paper, so they only warn
        if self.llm.credentials.is_empty() {
            warn!("No API credentials configured - every paper will use the fallback question set");
        }
        let malformed = self
            .llm
            .credentials
            .iter()
            .filter(|k| !k.starts_with(CREDENTIAL_PREFIX))
            .count();
        if malformed > 0 {
            warn!(
                malformed_count = malformed,
                "Some API credentials do not start with '{}'", CREDENTIAL_PREFIX
            );
        }

        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|level| self.logging.level.to_lowercase().contains(level))
        {
            warn!("Invalid log level '{}', using 'info' as fallback", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl DatabaseConfig {
    fn from_lookup(lookup: Lookup<'_>) -> Self {
        let url = lookup("DATABASE_URL").unwrap_or_else(|| "sqlite:exam_papers.db".to_string());
        DatabaseConfig { url }
    }
}

impl LLMConfig {
    fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = LLMConfig::default();

        let credentials = parse_credentials(&lookup("OPENAI_API_KEYS").unwrap_or_default());
        let base_url = lookup("LLM_BASE_URL").filter(|url| !url.trim().is_empty());
        let model = lookup("LLM_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(defaults.model);

        let max_tokens = match lookup("LLM_MAX_TOKENS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| anyhow!("Invalid LLM_MAX_TOKENS value: '{}'", raw))?,
            None => defaults.max_tokens,
        };

        let temperature = match lookup("LLM_TEMPERATURE") {
            Some(raw) => raw
                .trim()
                .parse::<f32>()
                .map_err(|_| anyhow!("Invalid LLM_TEMPERATURE value: '{}'", raw))?,
            None => defaults.temperature,
        };

        Ok(LLMConfig {
            credentials,
            base_url,
            model,
            max_tokens,
            temperature,
        })
    }
}

impl ServerConfig {
    fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let port_str = lookup("PORT").unwrap_or_else(|| "5000".to_string());

        let port = port_str.parse::<u16>().map_err(|_| {
            anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str)
        })?;

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }
}

impl LoggingConfig {
    fn from_lookup(lookup: Lookup<'_>) -> Self {
        let level = lookup("RUST_LOG").unwrap_or_else(|| "info,paper_generator=debug".to_string());

        let file_enabled = lookup("LOG_FILE_ENABLED")
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);

        let console_enabled = lookup("LOG_CONSOLE_ENABLED")
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);

        let log_directory = lookup("LOG_DIRECTORY").unwrap_or_else(|| "logs".to_string());

        LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        }
    }
}

/// Splits a comma-separated key list, dropping blanks
pub fn parse_credentials(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Mask sensitive data in configuration for safe logging
pub fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}
