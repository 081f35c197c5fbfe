use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context, bail};
use log::warn;

use crate::prompts;

/// Main configuration structure for nutri_coach
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion backend configuration
    pub provider: ProviderConfig,

    /// Interview session configuration
    pub session: SessionConfig,

    /// Console display configuration
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retries on transient faults, on top of the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retries, multiplied by the attempt number
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// OpenAI-compatible endpoint root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional cap on completion tokens
    #[serde(default)]
    pub max_tokens: Option<usize>,

    /// Environment variables holding the API key, tried in order
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Specialty named in every extraction instruction
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Exit with a non-zero status when the session fails
    #[serde(default)]
    pub strict_exit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    /// Enable colorful output
    #[serde(default = "default_colorful")]
    pub colorful: bool,

    /// Show a spinner while the coach is thinking
    #[serde(default = "default_spinner")]
    pub spinner: bool,
}

const MAX_RETRY_DELAY_MS: u64 = 60_000;

// Default value functions
fn default_model() -> String { "gemini-2.5-flash-lite".to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_retries() -> u32 { 2 }
fn default_retry_delay_ms() -> u64 { 500 }
fn default_base_url() -> String { "https://generativelanguage.googleapis.com/v1beta/openai".to_string() }
fn default_api_key_env() -> Vec<String> { vec!["GOOGLE_API_KEY".to_string(), "GEMINI_API_KEY".to_string()] }
fn default_domain() -> String { prompts::DOMAIN.to_string() }
fn default_colorful() -> bool { true }
fn default_spinner() -> bool { true }

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            model: default_model(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            base_url: default_base_url(),
            max_tokens: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            domain: default_domain(),
            strict_exit: false,
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        UIConfig {
            colorful: default_colorful(),
            spinner: default_spinner(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::from_file(shellexpand::tilde(path).as_ref());
        }

        let default_paths = [
            "nutri_coach.toml",
            ".nutri_coach.toml",
            "~/.config/nutri_coach/config.toml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => return Ok(config),
                    Err(e) => warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Merge with command-line arguments (CLI args take precedence)
    pub fn merge_with_args(
        &mut self,
        model: Option<String>,
        temperature: Option<f32>,
        strict: bool,
        plain: bool,
    ) {
        if let Some(model) = model {
            self.provider.model = model;
        }
        if let Some(temperature) = temperature {
            self.provider.temperature = temperature;
        }
        if strict {
            self.session.strict_exit = true;
        }
        if plain {
            self.ui.colorful = false;
            self.ui.spinner = false;
        }
    }

    /// Reject settings the backend would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        if self.provider.model.trim().is_empty() {
            bail!("provider.model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            bail!(
                "provider.temperature must be between 0.0 and 2.0, got {}",
                self.provider.temperature
            );
        }
        if self.provider.retry_delay_ms > MAX_RETRY_DELAY_MS {
            bail!(
                "provider.retry_delay_ms must be at most {}, got {}",
                MAX_RETRY_DELAY_MS,
                self.provider.retry_delay_ms
            );
        }
        if self.provider.api_key_env.is_empty() {
            bail!("provider.api_key_env must name at least one variable");
        }
        if self.session.domain.trim().is_empty() {
            bail!("session.domain must not be empty");
        }
        Ok(())
    }
}
