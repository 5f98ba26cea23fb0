//! Configuration loading and validation
//!
//! This module provides:
//! - `RuntimeConfig` - per-session runtime configuration (library-public)
//! - `Config` - full application configuration loaded from config.toml
//! - Gemini credential resolution with environment fallback

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm::limiter::{RetryPolicy, DEFAULT_MIN_INTERVAL, DEFAULT_THROTTLE_COOLDOWN};

/// Directory name under the user config dir
pub const CONFIG_DIR: &str = "mech-agent";

/// Environment variable holding the fallback Gemini credential
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default Gemini model. Fixed rather than model-selectable so the agent
/// cannot talk itself into a paid tier.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default sampling temperature for function synthesis. Above 1.0 to bias
/// toward varied completions.
pub const DEFAULT_TEMPERATURE: f32 = 1.5;

/// Runtime configuration for one agent session.
///
/// This is the public API for library users; CLI users derive it from the
/// loaded [`Config`] via [`Config::runtime`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub model: String,
    pub temperature: f32,
    pub min_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            min_interval: DEFAULT_MIN_INTERVAL,
            retry: RetryPolicy::default(),
        }
    }
}

/// Main configuration structure loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentConfig,
    pub limiter: LimiterConfig,
}

/// Model selection and sampling for the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub model: String,
    pub temperature: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Outbound call pacing and retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Minimum seconds between model calls
    pub min_interval_secs: u64,
    /// Back-off after a throttling response
    pub cooldown_secs: u64,
    /// Cap on throttle retries; absent means retry forever
    pub max_throttle_retries: Option<u32>,
    /// Cap on transient-fault retries; absent means retry forever
    pub max_transient_retries: Option<u32>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: DEFAULT_MIN_INTERVAL.as_secs(),
            cooldown_secs: DEFAULT_THROTTLE_COOLDOWN.as_secs(),
            max_throttle_retries: None,
            max_transient_retries: None,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                let config: Config = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
                return Ok(config);
            }
        }
        Ok(Config::default())
    }

    /// Get the config directory path (~/.config/mech-agent)
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join(CONFIG_DIR))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    /// Derive the per-session runtime configuration
    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            model: self.agent.model.clone(),
            temperature: self.agent.temperature,
            min_interval: Duration::from_secs(self.limiter.min_interval_secs),
            retry: RetryPolicy {
                cooldown: Duration::from_secs(self.limiter.cooldown_secs),
                max_throttle_retries: self.limiter.max_throttle_retries,
                max_transient_retries: self.limiter.max_transient_retries,
            },
        }
    }
}

/// Resolve the Gemini API key from a caller-supplied `api_keys` mapping,
/// falling back to the process environment. The key is never persisted.
pub fn resolve_gemini_key(api_keys: Option<&Map<String, Value>>) -> Option<String> {
    api_keys
        .and_then(|keys| keys.get("gemini"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| std::env::var(GEMINI_API_KEY_ENV).ok())
}
