//! Unified path management for mittens configuration and data files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/mittens/           # Config directory
//! ├── config.toml              # Application configuration
//! ├── secret.json              # API keys
//! └── logs/                    # Application logs
//!     └── mittens.log.YYYY-MM-DD
//!
//! ~/.local/share/mittens/      # Data directory
//! ├── store/                   # Key-value store (chat history)
//! └── images/                  # Generated images written by the REPL
//! ```

use std::path::{Path, PathBuf};

const APP_NAME: &str = "mittens";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolved config and data roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MittensPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl MittensPaths {
    /// Resolves the platform directories (`~/.config/mittens`, `~/.local/share/mittens`).
    ///
    /// The config directory is always `~/.config/<app>` to match where users
    /// are told to put `secret.json`, regardless of platform conventions.
    pub fn resolve() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeDirNotFound)?;
        let data_root = dirs::data_dir().unwrap_or_else(|| home.join(".local").join("share"));

        Ok(Self {
            config_dir: home.join(".config").join(APP_NAME),
            data_dir: data_root.join(APP_NAME),
        })
    }

    /// Places both roots under `base` (tests, portable installs).
    pub fn with_base(base: &Path) -> Self {
        Self {
            config_dir: base.join("config"),
            data_dir: base.join("data"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600).
    pub fn secret_file(&self) -> PathBuf {
        self.config_dir.join("secret.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }

    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    pub fn image_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_layout() {
        let paths = MittensPaths::with_base(Path::new("/tmp/mittens-test"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/mittens-test/config/config.toml"));
        assert_eq!(paths.secret_file(), PathBuf::from("/tmp/mittens-test/config/secret.json"));
        assert_eq!(paths.store_dir(), PathBuf::from("/tmp/mittens-test/data/store"));
        assert_eq!(paths.image_dir(), PathBuf::from("/tmp/mittens-test/data/images"));
    }
}
