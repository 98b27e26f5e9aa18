//! Global configuration management
//!
//! Reads user settings from `config.toml` in the config directory and layers
//! them with environment variables and command-line flags into one
//! [`BuildEnvironment`]. Precedence, lowest first: built-in defaults, config
//! file, environment, flags.
//!
//! ```toml
//! [build]
//! root = "/opt/3rd"
//! generator = "Ninja"
//! jobs = 8
//! build_mode = "release"
//! link_mode = "static"
//!
//! [download]
//! retries = 5
//! timeout_secs = 600
//!
//! [env]
//! CFLAGS = "-fPIC"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::core::build_env::{BuildEnvironment, BuildMode, LinkMode};
use crate::error::ConfigError;
use crate::infra::dirs::DepsmithDirs;
use crate::infra::download::DownloadManager;

/// Global configuration for depsmith
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Extra variables for every external tool
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Default build settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Third-party tree root
    pub root: Option<PathBuf>,

    /// CMake generator
    pub generator: Option<String>,

    /// Number of parallel jobs
    pub jobs: Option<usize>,

    /// Default build mode
    pub build_mode: Option<BuildMode>,

    /// Default link mode
    pub link_mode: Option<LinkMode>,
}

/// Download settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Attempts per download
    pub retries: Option<u32>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Values given on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct EnvironmentOverrides {
    pub root: Option<PathBuf>,
    pub build_mode: Option<BuildMode>,
    pub link_mode: Option<LinkMode>,
    pub jobs: Option<usize>,
    pub generator: Option<String>,
}

impl GlobalConfig {
    /// Load global configuration from the config directory
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load(dirs: &DepsmithDirs) -> Result<Self, ConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load global configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Build the environment for this invocation.
    ///
    /// `env_var` looks up process environment variables; it is a parameter
    /// so callers can layer in a fixed set.
    pub fn build_environment(
        &self,
        overrides: &EnvironmentOverrides,
        env_var: impl Fn(&str) -> Option<String>,
    ) -> Result<BuildEnvironment, ConfigError> {
        let root = overrides
            .root
            .clone()
            .or_else(|| env_var(defaults::ENV_ROOT).map(PathBuf::from))
            .or_else(|| self.build.root.clone())
            .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_ROOT));

        let env_jobs = env_var(defaults::ENV_JOBS)
            .map(|value| {
                value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                    field: defaults::ENV_JOBS.to_string(),
                    value,
                    expected: "a positive integer".to_string(),
                })
            })
            .transpose()?;

        let mut env = BuildEnvironment::new(root);
        if let Some(generator) = overrides.generator.as_ref().or(self.build.generator.as_ref()) {
            env = env.with_generator(generator);
        }
        if let Some(jobs) = overrides.jobs.or(env_jobs).or(self.build.jobs) {
            env = env.with_jobs(jobs);
        }
        if let Some(mode) = overrides.build_mode.or(self.build.build_mode) {
            env = env.with_build_mode(mode);
        }
        if let Some(mode) = overrides.link_mode.or(self.build.link_mode) {
            env = env.with_link_mode(mode);
        }

        for (key, value) in &self.env {
            env = env.with_env(key, value);
        }

        env.validate()?;
        Ok(env)
    }

    /// Download manager honoring the configured retries and timeout
    pub fn download_manager(&self) -> DownloadManager {
        DownloadManager::with_config(
            self.download.retries.unwrap_or(defaults::MAX_DOWNLOAD_RETRIES),
            defaults::DOWNLOAD_RETRY_BASE_MS,
            self.download
                .timeout_secs
                .unwrap_or(defaults::DOWNLOAD_TIMEOUT_SECS),
        )
    }
}
