//! Build environment setup
//!
//! Describes the target platform, build/link mode, toolchain generator and the
//! directory layout shared by every recipe in one invocation. The value is
//! assembled once with the builder methods and then only ever borrowed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::error::ConfigError;

/// Target operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Macos,
}

impl Platform {
    /// Platform this binary was compiled for
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Macos
        } else {
            Self::Linux
        }
    }

    /// Default CMake generator for this platform
    pub fn default_generator(self) -> &'static str {
        match self {
            Self::Windows => defaults::WINDOWS_GENERATOR,
            Self::Linux | Self::Macos => defaults::UNIX_GENERATOR,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Linux => write!(f, "linux"),
            Self::Macos => write!(f, "macos"),
        }
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windows" | "win" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "macos" | "osx" | "darwin" => Ok(Self::Macos),
            _ => Err(ConfigError::InvalidValue {
                field: "platform".to_string(),
                value: s.to_string(),
                expected: "windows, linux, macos".to_string(),
            }),
        }
    }
}

/// Debug or optimized build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Debug,
    #[default]
    Release,
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Release => write!(f, "release"),
        }
    }
}

impl FromStr for BuildMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "release" => Ok(Self::Release),
            _ => Err(ConfigError::InvalidValue {
                field: "build mode".to_string(),
                value: s.to_string(),
                expected: "debug, release".to_string(),
            }),
        }
    }
}

/// Static archives or shared libraries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    #[default]
    Static,
    Shared,
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Shared => write!(f, "shared"),
        }
    }
}

impl FromStr for LinkMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "shared" => Ok(Self::Shared),
            _ => Err(ConfigError::InvalidValue {
                field: "link mode".to_string(),
                value: s.to_string(),
                expected: "static, shared".to_string(),
            }),
        }
    }
}

/// Build environment for one invocation.
///
/// Layout under `root`:
///
/// ```text
/// root/downloads/                fetched archives, shared by every mode
/// root/sources/                  extracted sources (sources_root)
/// root/<mode>-<link>/build/      per-recipe build directories (build_root)
/// root/<mode>-<link>/common/     per-recipe install directories (install_root)
/// root/<mode>-<link>/revisions.toml
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BuildEnvironment {
    /// Target platform
    pub platform: Platform,
    /// Debug or release
    pub build_mode: BuildMode,
    /// Static or shared
    pub link_mode: LinkMode,
    /// CMake generator name (e.g., "Unix Makefiles")
    pub generator: String,
    /// Root of the third-party tree
    pub root: PathBuf,
    /// Parallelism hint handed to native build tools
    pub jobs: usize,
    /// Additional environment variables for every tool invocation
    pub extra_env: BTreeMap<String, String>,
}

impl BuildEnvironment {
    /// Create an environment for the host platform with default modes
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let platform = Platform::host();
        Self {
            platform,
            build_mode: BuildMode::default(),
            link_mode: LinkMode::default(),
            generator: platform.default_generator().to_string(),
            root: root.into(),
            jobs: num_cpus::get(),
            extra_env: BTreeMap::new(),
        }
    }

    /// Set the target platform; resets the generator to the platform default
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self.generator = platform.default_generator().to_string();
        self
    }

    /// Set the build mode
    #[must_use]
    pub fn with_build_mode(mut self, mode: BuildMode) -> Self {
        self.build_mode = mode;
        self
    }

    /// Set the link mode
    #[must_use]
    pub fn with_link_mode(mut self, mode: LinkMode) -> Self {
        self.link_mode = mode;
        self
    }

    /// Set the CMake generator
    #[must_use]
    pub fn with_generator(mut self, generator: &str) -> Self {
        self.generator = generator.to_string();
        self
    }

    /// Set the number of parallel jobs
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Add an extra environment variable
    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.extra_env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn on_windows(&self) -> bool {
        self.platform == Platform::Windows
    }

    pub fn on_macos(&self) -> bool {
        self.platform == Platform::Macos
    }

    pub fn is_debug(&self) -> bool {
        self.build_mode == BuildMode::Debug
    }

    pub fn is_static(&self) -> bool {
        self.link_mode == LinkMode::Static
    }

    /// Shared archive download directory
    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    /// Root of all extracted sources
    pub fn sources_root(&self) -> PathBuf {
        self.root.join("sources")
    }

    /// Directory holding everything specific to this build/link mode
    pub fn tree_dir(&self) -> PathBuf {
        self.root
            .join(format!("{}-{}", self.build_mode, self.link_mode))
    }

    /// Root of per-recipe build directories
    pub fn build_root(&self) -> PathBuf {
        self.tree_dir().join("build")
    }

    /// Common install root; every recipe installs into a subdirectory
    pub fn install_root(&self) -> PathBuf {
        self.tree_dir().join("common")
    }

    /// Location of the persisted revision cache
    pub fn cache_path(&self) -> PathBuf {
        self.tree_dir().join(defaults::CACHE_FILE_NAME)
    }

    /// CMake build type for single-config generators
    pub fn cmake_build_type(&self) -> &'static str {
        match self.build_mode {
            BuildMode::Debug => "Debug",
            BuildMode::Release => "Release",
        }
    }

    /// Configuration name used with multi-config generators (msbuild)
    pub fn msvc_configuration(&self) -> &'static str {
        match self.build_mode {
            BuildMode::Debug => "Debug",
            BuildMode::Release => "RelWithDebInfo",
        }
    }

    /// Convert to environment variable map for process execution
    pub fn to_env_map(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();

        env.insert(
            "CMAKE_BUILD_PARALLEL_LEVEL".to_string(),
            self.jobs.to_string(),
        );
        if !self.on_windows() {
            env.insert("MAKEFLAGS".to_string(), format!("-j{}", self.jobs));
        }

        for (key, value) in &self.extra_env {
            env.insert(key.clone(), value.clone());
        }

        env
    }

    /// Check the environment is usable
    pub fn validate(&self) -> Result<(), BuildEnvError> {
        if self.generator.trim().is_empty() {
            return Err(BuildEnvError::MissingValue("generator".to_string()));
        }
        if self.jobs == 0 {
            return Err(BuildEnvError::InvalidValue {
                variable: "jobs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.root.as_os_str().is_empty() {
            return Err(BuildEnvError::MissingValue("root".to_string()));
        }
        Ok(())
    }

    /// True if `path` lives inside the tree managed by this environment
    pub fn owns(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }
}

/// Build environment errors
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEnvError {
    /// Required value is missing
    MissingValue(String),
    /// Value is out of range
    InvalidValue { variable: String, reason: String },
}

impl fmt::Display for BuildEnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingValue(var) => write!(f, "Missing required value: {var}"),
            Self::InvalidValue { variable, reason } => {
                write!(f, "Invalid value for {variable}: {reason}")
            }
        }
    }
}

impl std::error::Error for BuildEnvError {}

impl From<BuildEnvError> for ConfigError {
    fn from(err: BuildEnvError) -> Self {
        ConfigError::Environment(err.to_string())
    }
}
