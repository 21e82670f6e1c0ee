//! Configuration service.
//!
//! Loads `config.toml` and resolves the Gemini API key from the environment
//! or `secret.json`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mittens_core::config::{AppConfig, SecretConfig};
use mittens_core::{MittensError, Result};
use thiserror::Error;

use crate::paths::MittensPaths;

/// Environment variables checked for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Why no key could be taken from `secret.json`.
#[derive(Error, Debug)]
enum ApiKeyError {
    #[error(
        "No API key: set {} or create {} with {{\"gemini\": {{\"api_key\": \"...\"}}}}",
        API_KEY_ENV_VARS.join(" or "),
        .0.display()
    )]
    Missing(PathBuf),
    #[error("Gemini API key not found in {}", .0.display())]
    NoGeminiKey(PathBuf),
    #[error("Failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<ApiKeyError> for MittensError {
    fn from(err: ApiKeyError) -> Self {
        MittensError::config(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: MittensPaths,
    config_path: PathBuf,
}

impl ConfigService {
    pub fn new(paths: MittensPaths) -> Self {
        let config_path = paths.config_file();
        Self { paths, config_path }
    }

    /// Reads `config.toml` from an explicit location instead of the config dir.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn paths(&self) -> &MittensPaths {
        &self.paths
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Loads the application config; a missing file yields the defaults.
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_path)?;
        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            MittensError::config(format!(
                "Failed to parse {}: {}",
                self.config_path.display(),
                e
            ))
        })?;
        Ok(config)
    }

    /// Resolves the API key from the process environment, then secret.json.
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Same as [`ConfigService::resolve_api_key`] with an injectable environment.
    pub fn resolve_api_key_with<F>(&self, env: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in API_KEY_ENV_VARS {
            if let Some(key) = env(name).filter(|k| !k.trim().is_empty()) {
                tracing::debug!(source = name, "Using API key from environment");
                return Ok(key);
            }
        }

        Ok(self.key_from_secret_file()?)
    }

    fn key_from_secret_file(&self) -> std::result::Result<String, ApiKeyError> {
        let path = self.paths.secret_file();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ApiKeyError::Missing(path)),
            Err(source) => return Err(ApiKeyError::Read { path, source }),
        };

        let secrets: SecretConfig = match serde_json::from_str(&content) {
            Ok(secrets) => secrets,
            Err(source) => return Err(ApiKeyError::Parse { path, source }),
        };
        match secrets.gemini.map(|gemini| gemini.api_key) {
            Some(key) if !key.trim().is_empty() => {
                tracing::debug!(path = %path.display(), "Using API key from secret file");
                Ok(key)
            }
            _ => Err(ApiKeyError::NoGeminiKey(path)),
        }
    }
}
