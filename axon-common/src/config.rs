//! Configuration for the Axon runtime.
//!
//! Settings are an explicitly constructed value passed into whatever builds
//! a gateway binding — there is no process-wide singleton. The file format
//! is JSON with serde defaults, loaded from `config/settings.json` in the
//! working directory or from `~/.axon/settings.json`.
//!
//! The base LLM settings can be overridden per profile (e.g. a `vision`
//! profile with a different model); override fields merge field-by-field
//! over the base. The credential falls back to `AXON_API_KEY` when the file
//! leaves it empty.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable consulted when no api_key is configured.
pub const API_KEY_ENV: &str = "AXON_API_KEY";

/// Get the user-level configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".axon"),
        |dirs| dirs.home_dir().join(".axon"),
    )
}

/// Language-model binding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_model")]
    pub model: String,

    /// Base endpoint of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: String::new(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

fn default_model() -> String {
    "gpt-4o".into()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_max_tokens() -> u32 {
    4096
}

/// Partial LLM settings for a named profile.
///
/// Unset fields inherit from the base settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmOverride {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

/// Runtime settings outside the LLM binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Directory holding persisted plan records.
    #[serde(default = "default_plan_dir")]
    pub plan_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            plan_dir: default_plan_dir(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_plan_dir() -> PathBuf {
    PathBuf::from("workspace/plans")
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

/// Top-level settings value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,

    /// Named overrides applied on top of the base LLM settings.
    #[serde(default)]
    pub profiles: HashMap<String, LlmOverride>,

    #[serde(default)]
    pub runtime: RuntimeSettings,
}

impl Settings {
    /// Load settings from a JSON file, applying environment fallbacks.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let mut settings: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
        settings.apply_env();
        Ok(settings)
    }

    /// Load settings from the first known location, or defaults.
    ///
    /// Checked in order: `config/settings.json` under the working
    /// directory, then `~/.axon/settings.json`.
    pub fn load_default() -> Result<Self> {
        let candidates = [
            PathBuf::from("config").join("settings.json"),
            config_dir().join("settings.json"),
        ];
        for candidate in &candidates {
            if candidate.exists() {
                return Self::load(candidate);
            }
        }

        let mut settings = Self::default();
        settings.apply_env();
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if self.llm.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                self.llm.api_key = key;
            }
        }
    }

    /// Resolve the LLM settings for a named profile.
    ///
    /// Unknown profile names resolve to the base settings, matching lookup
    /// of an unconfigured override.
    pub fn llm(&self, profile: &str) -> LlmSettings {
        let mut resolved = self.llm.clone();
        if let Some(over) = self.profiles.get(profile) {
            if let Some(model) = &over.model {
                resolved.model = model.clone();
            }
            if let Some(base_url) = &over.base_url {
                resolved.base_url = base_url.clone();
            }
            if let Some(api_key) = &over.api_key {
                resolved.api_key = api_key.clone();
            }
            if let Some(max_tokens) = over.max_tokens {
                resolved.max_tokens = max_tokens;
            }
            if let Some(temperature) = over.temperature {
                resolved.temperature = temperature;
            }
        }
        resolved
    }
}
