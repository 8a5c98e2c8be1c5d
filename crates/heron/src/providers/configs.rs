use anyhow::{Context, Result};
use std::env;

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Unified enum to wrap different provider configurations
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    Anthropic(AnthropicProviderConfig),
}

pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl OpenAiProviderConfig {
    /// Load configuration from environment variables. OPENAI_API_KEY is
    /// required; host and model fall back to defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env_or("OPENAI_HOST", OPENAI_HOST),
            api_key: required_env("OPENAI_API_KEY")?,
            model: env_or("OPENAI_MODEL", OPENAI_DEFAULT_MODEL),
            temperature: None,
            max_tokens: None,
        })
    }
}

pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl AnthropicProviderConfig {
    /// Load configuration from environment variables. ANTHROPIC_API_KEY is
    /// required; host and model fall back to defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env_or("ANTHROPIC_HOST", ANTHROPIC_HOST),
            api_key: required_env("ANTHROPIC_API_KEY")?,
            model: env_or("ANTHROPIC_MODEL", ANTHROPIC_DEFAULT_MODEL),
            temperature: None,
            max_tokens: None,
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("Environment variable '{}' is required but not set", key))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
