//! Where depsmith keeps its own configuration
//!
//! `$DEPSMITH_CONFIG_DIR` when set, otherwise the platform config directory
//! (`~/.config/depsmith`, `~/Library/Application Support/depsmith`,
//! `%APPDATA%\depsmith`).

use std::path::{Path, PathBuf};

use crate::config::defaults::CONFIG_FILE_NAME;

/// Overrides the config directory; tests point it at a temp dir
pub const ENV_CONFIG_DIR: &str = "DEPSMITH_CONFIG_DIR";

#[derive(Debug, Clone)]
pub struct DepsmithDirs {
    config_dir: PathBuf,
}

impl DepsmithDirs {
    #[must_use]
    pub fn new() -> Self {
        let config_dir = std::env::var_os(ENV_CONFIG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(platform_config_dir);
        Self { config_dir }
    }

    #[must_use]
    pub fn with_config_dir(path: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: path.into(),
        }
    }

    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// `config.toml` inside the config directory
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

impl Default for DepsmithDirs {
    fn default() -> Self {
        Self::new()
    }
}

fn platform_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("depsmith")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_dir_is_app_specific() {
        assert!(platform_config_dir().ends_with("depsmith"));
    }

    #[test]
    fn test_config_file_lives_in_config_dir() {
        let dirs = DepsmithDirs::with_config_dir("/tmp/depsmith-config");
        assert_eq!(
            dirs.global_config_path(),
            PathBuf::from("/tmp/depsmith-config/config.toml")
        );
    }
}
