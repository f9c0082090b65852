//! Mnemos configuration
//!
//! Lives in `$XDG_CONFIG_HOME/mnemos/config.toml`:
//!
//! ```toml
//! [inference]
//! base_url = "http://localhost:5001"
//! timeout_secs = 30
//!
//! [api]
//! base_url = "http://localhost:3001/api"
//! timeout_secs = 10
//! ```
//!
//! Base URLs can be overridden with `MNEMOS_INFERENCE_URL` and
//! `MNEMOS_API_URL`. Precedence: CLI flag > env > file > default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Env override for the inference service base URL
pub const ENV_INFERENCE_URL: &str = "MNEMOS_INFERENCE_URL";

/// Env override for the general backend base URL
pub const ENV_API_URL: &str = "MNEMOS_API_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config {path}: {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("Failed to write config: {0}")]
    Write(String),
}

/// Inference service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceSettings {
    #[serde(default = "default_inference_url")]
    pub base_url: String,

    /// Fixed per-request timeout; there is no retry
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
}

/// General backend (sign-in, account) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_api_url")]
    pub base_url: String,

    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

fn default_inference_url() -> String {
    "http://localhost:5001".to_string()
}

fn default_inference_timeout() -> u64 {
    30 // model inference on CPU can be slow
}

fn default_api_url() -> String {
    "http://localhost:3001/api".to_string()
}

fn default_api_timeout() -> u64 {
    10
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            base_url: default_inference_url(),
            timeout_secs: default_inference_timeout(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_secs: default_api_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MnemosConfig {
    #[serde(default)]
    pub inference: InferenceSettings,

    #[serde(default)]
    pub api: ApiSettings,
}

impl MnemosConfig {
    /// Load from the default location with env overrides applied
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&crate::paths::config_file())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate().map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;

        Ok(config)
    }

    /// A zero timeout would fail every request before it is sent
    fn validate(&self) -> Result<(), String> {
        if self.inference.timeout_secs == 0 {
            return Err("inference.timeout_secs must be at least 1".into());
        }
        if self.api.timeout_secs == 0 {
            return Err("api.timeout_secs must be at least 1".into());
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Write(e.to_string()))?;
        fs::write(path, content).map_err(|e| ConfigError::Write(e.to_string()))
    }

    /// Apply `MNEMOS_INFERENCE_URL` / `MNEMOS_API_URL`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_INFERENCE_URL).ok(),
            std::env::var(ENV_API_URL).ok(),
        );
    }

    /// Replace base URLs with any non-empty override
    pub fn apply_overrides(&mut self, inference_url: Option<String>, api_url: Option<String>) {
        if let Some(url) = inference_url.filter(|u| !u.trim().is_empty()) {
            self.inference.base_url = url;
        }
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
    }
}
