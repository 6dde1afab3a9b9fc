//! Configuration loading, validation, and management for parley.
//!
//! Loads configuration from `~/.parley/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Persona and turn behaviour
    #[serde(default)]
    pub agent: AgentConfig,

    /// Per-conversation token budgets
    #[serde(default)]
    pub context: ContextConfig,

    /// Long-term memory notes
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Chat platform adapter
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Keys and limits for the built-in tools
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("agent", &self.agent)
            .field("context", &self.context)
            .field("memory", &self.memory)
            .field("channel", &self.channel)
            .field("tools", &self.tools)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per model response (unset = provider default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openai".into()
}
fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    1.0
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Fallback display name when the channel does not report one
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Persona prompt. `%time%`, `%botName%` and `%botId%` are substituted.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Interval between typing indicators while a turn runs
    #[serde(default = "default_typing_interval")]
    pub typing_interval_secs: u64,

    /// Sent when a turn fails twice
    #[serde(default = "default_failure_notice")]
    pub failure_notice: String,

    /// Cap on tool calls per turn (unset = unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tool_steps: Option<u32>,
}

fn default_agent_name() -> String {
    "Parley".into()
}
fn default_system_prompt() -> String {
    concat!(
        "You are %botName% (user ID %botId%), a friendly assistant taking part in a group chat. ",
        "The current time is %time%. Keep answers short and conversational.",
    )
    .into()
}
fn default_typing_interval() -> u64 {
    5
}
fn default_failure_notice() -> String {
    "Sorry, something went wrong while answering. Please try again.".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            system_prompt: default_system_prompt(),
            typing_interval_secs: default_typing_interval(),
            failure_notice: default_failure_notice(),
            max_tool_steps: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Token ceiling per conversation
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Relaxed ceiling while a tool-call chain is in flight
    #[serde(default = "default_tool_chain_max_tokens")]
    pub tool_chain_max_tokens: usize,

    /// Token surcharge per attached image
    #[serde(default = "default_image_token_cost")]
    pub image_token_cost: usize,

    /// Images older than this are replayed as text only
    #[serde(default = "default_image_staleness")]
    pub image_staleness_minutes: i64,
}

fn default_max_tokens() -> usize {
    50_000
}
fn default_tool_chain_max_tokens() -> usize {
    100_000
}
fn default_image_token_cost() -> usize {
    85
}
fn default_image_staleness() -> i64 {
    180
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            tool_chain_max_tokens: default_tool_chain_max_tokens(),
            image_token_cost: default_image_token_cost(),
            image_staleness_minutes: default_image_staleness(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "file", "in_memory" or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Directory for per-conversation notes files (default: ~/.parley/memories)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Notes kept per conversation; older ones are dropped
    #[serde(default = "default_max_notes")]
    pub max_notes: usize,
}

fn default_memory_backend() -> String {
    "file".into()
}
fn default_max_notes() -> usize {
    30
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            dir: None,
            max_notes: default_max_notes(),
        }
    }
}

impl MemoryConfig {
    /// The notes directory, falling back to `~/.parley/memories`.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("memories"))
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// "cli" or "discord"
    #[serde(default = "default_channel_kind")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_token: Option<String>,

    /// Conversations the agent listens in. Empty = all.
    #[serde(default)]
    pub allowed_conversations: Vec<String>,
}

fn default_channel_kind() -> String {
    "cli".into()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            kind: default_channel_kind(),
            discord_token: None,
            allowed_conversations: vec![],
        }
    }
}

impl std::fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("kind", &self.kind)
            .field("discord_token", &redact(&self.discord_token))
            .field("allowed_conversations", &self.allowed_conversations)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// weatherapi.com key for `get_weather_forecast`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_api_key: Option<String>,

    /// BinderByte key for `cek_resi`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binderbyte_api_key: Option<String>,

    /// Timeout for every outbound tool request
    #[serde(default = "default_tool_timeout")]
    pub http_timeout_secs: u64,
}

fn default_tool_timeout() -> u64 {
    60
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            weather_api_key: None,
            binderbyte_api_key: None,
            http_timeout_secs: default_tool_timeout(),
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("weather_api_key", &redact(&self.weather_api_key))
            .field("binderbyte_api_key", &redact(&self.binderbyte_api_key))
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.parley/config.toml).
    ///
    /// Environment variables override the file:
    /// - `PARLEY_API_KEY`, then `OPENAI_API_KEY`
    /// - `PARLEY_MODEL`, `PARLEY_BOT_NAME`, `PARLEY_SYSTEM_PROMPT`
    /// - `PARLEY_MAX_TOKENS_PER_CONVERSATION`
    /// - `WEATHER_API_KEY`, `BINDERBYTE_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(key) = lookup("PARLEY_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup("PARLEY_MODEL") {
            self.provider.model = model;
        }
        if let Some(name) = lookup("PARLEY_BOT_NAME") {
            self.agent.name = name;
        }
        if let Some(prompt) = lookup("PARLEY_SYSTEM_PROMPT") {
            self.agent.system_prompt = prompt;
        }
        if let Some(key) = lookup("WEATHER_API_KEY") {
            self.tools.weather_api_key = Some(key);
        }
        if let Some(key) = lookup("BINDERBYTE_API_KEY") {
            self.tools.binderbyte_api_key = Some(key);
        }
        if let Some(raw) = lookup("PARLEY_MAX_TOKENS_PER_CONVERSATION") {
            self.context.max_tokens = raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "PARLEY_MAX_TOKENS_PER_CONVERSATION must be a positive integer, got '{raw}'"
                ))
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parley")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.context.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_tokens must be > 0".into(),
            ));
        }

        if self.context.tool_chain_max_tokens < self.context.max_tokens {
            return Err(ConfigError::ValidationError(
                "context.tool_chain_max_tokens must be >= context.max_tokens".into(),
            ));
        }

        if self.tools.http_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tools.http_timeout_secs must be > 0".into(),
            ));
        }

        if self.agent.typing_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.typing_interval_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: ProviderConfig::default(),
            agent: AgentConfig::default(),
            context: ContextConfig::default(),
            memory: MemoryConfig::default(),
            channel: ChannelConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
