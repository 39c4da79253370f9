use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Header the upstream auth layer uses to pass the authenticated user id
    pub user_header: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

/// Model names, endpoints and sampling settings for both providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub opening_max_tokens: u32,
    pub chat_max_tokens: u32,
    pub summary_max_tokens: u32,
    pub chat_temperature: f32,
    pub summary_temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub max_message_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            user_header: "x-user-id".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:data/tutor.db".to_string(),
            max_connections: 10,
            connection_timeout_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            format: "text".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            opening_max_tokens: 250,
            chat_max_tokens: 400,
            summary_max_tokens: 600,
            chat_temperature: 0.7,
            summary_temperature: 0.3,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { max_message_chars: 2000 }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default())?)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix, e.g. TUTOR_SERVER__PORT
            .add_source(Environment::with_prefix("TUTOR").prefix_separator("_").separator("__"))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("port must be greater than 0"));
        }
        if self.server.user_header.trim().is_empty() {
            return Err(anyhow::anyhow!("user_header cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }
        if self.database.connection_timeout_secs == 0 {
            return Err(anyhow::anyhow!("connection_timeout_secs must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        if self.llm.opening_max_tokens == 0 || self.llm.chat_max_tokens == 0 || self.llm.summary_max_tokens == 0 {
            return Err(anyhow::anyhow!("token limits must be greater than 0"));
        }
        for (name, value) in [
            ("chat_temperature", self.llm.chat_temperature),
            ("summary_temperature", self.llm.summary_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(anyhow::anyhow!("{} must be between 0 and 2, got {}", name, value));
            }
        }
        if self.llm.gemini_model.trim().is_empty() || self.llm.openai_model.trim().is_empty() {
            return Err(anyhow::anyhow!("model names cannot be empty"));
        }

        if self.chat.max_message_chars == 0 {
            return Err(anyhow::anyhow!("max_message_chars must be greater than 0"));
        }

        Ok(())
    }

    /// Get database URL from environment or config
    pub fn get_database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}
