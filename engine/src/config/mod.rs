//! Configuration management
//!
//! Loads the TOML configuration from ~/.foreman/config.toml, creating a
//! default file on first run. Three sections: `reasoning` for the model
//! endpoint, `agent` for session bounds, and `server` for the invoke
//! endpoint. Every field has a default, so an empty file is valid.
//! Credentials never live here; see the `secrets` module.

use sdk::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Reasoning engine settings
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Agent session settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Invoke server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Reasoning engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL for the chat completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Completion token cap per reasoning step
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Seconds to wait for one reasoning step
    #[serde(default = "default_reasoning_timeout")]
    pub timeout_secs: u64,
    // Note: API key stored in OS keychain, not in config
}

/// Agent session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum reasoning turns before a session gives up
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Seconds before a shell command is killed
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Estimated token count that triggers history summarization
    #[serde(default = "default_summarization_threshold")]
    pub summarization_threshold: usize,

    /// Recent turns kept verbatim when summarizing
    #[serde(default = "default_recent_turns_kept")]
    pub recent_turns_kept: usize,
}

/// Invoke server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

// Default value functions
fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_reasoning_timeout() -> u64 {
    120
}

fn default_max_turns() -> usize {
    20
}

fn default_command_timeout() -> u64 {
    30
}

fn default_summarization_threshold() -> usize {
    8000
}

fn default_recent_turns_kept() -> usize {
    2
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_reasoning_timeout(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            command_timeout_secs: default_command_timeout(),
            summarization_threshold: default_summarization_threshold(),
            recent_turns_kept: default_recent_turns_kept(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.foreman/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default one so
    /// the user has something to edit.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.foreman/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".foreman").join("config.toml"))
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if a field is empty or a bound is zero where the
    /// session loops require at least one.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.reasoning.model.trim().is_empty() {
            return Err(EngineError::Config(
                "reasoning.model must not be empty".to_string(),
            ));
        }

        if self.reasoning.base_url.trim().is_empty() {
            return Err(EngineError::Config(
                "reasoning.base_url must not be empty".to_string(),
            ));
        }

        if self.agent.max_turns == 0 {
            return Err(EngineError::Config(
                "agent.max_turns must be at least 1".to_string(),
            ));
        }

        if self.agent.recent_turns_kept == 0 {
            return Err(EngineError::Config(
                "agent.recent_turns_kept must be at least 1".to_string(),
            ));
        }

        if self.agent.command_timeout_secs == 0 {
            return Err(EngineError::Config(
                "agent.command_timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
