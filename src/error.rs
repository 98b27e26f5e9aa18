//! Error types for depsmith
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::recipe::Stage;

/// External build tool errors
#[derive(Error, Debug)]
pub enum ToolError {
    /// The program could not be started at all
    #[error("Failed to launch '{program}': {error}")]
    Spawn { program: String, error: String },

    /// The program ran and reported failure
    #[error("'{program}' exited with {}", describe_exit(*code))]
    Exit { program: String, code: Option<i32> },

    /// A recipe asked for the install paths of a recipe it never declared
    #[error("Recipe '{recipe}' is not a declared dependency")]
    UndeclaredDependency { recipe: String },

    /// Filesystem step of a stage failed
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

impl ToolError {
    /// Exit code of the external tool, if it ran to completion
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { code, .. } => *code,
            _ => None,
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// Checksum verification failed
    #[error("Checksum verification failed for '{file}': expected {expected}, got {actual}")]
    ChecksumFailed {
        file: String,
        expected: String,
        actual: String,
    },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Max retries exceeded
    #[error("Download failed after {retries} retries: {url}")]
    MaxRetriesExceeded { url: String, retries: u32 },
}

/// Archive extraction errors
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Archive extension is not one we know how to unpack
    #[error("Unsupported archive format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Archive is truncated or malformed
    #[error("Corrupt archive '{path}': {error}")]
    Corrupt { path: PathBuf, error: String },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to remove a single file
    #[error("Failed to remove file '{path}': {error}")]
    RemoveFile { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to copy file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// A recipe stage failed; fatal to the graph walk
#[derive(Error, Debug)]
pub enum StageError {
    /// Source could not be fetched
    #[error("Recipe '{recipe}' failed at fetch: {cause}")]
    Fetch { recipe: String, cause: DownloadError },

    /// Source archive could not be unpacked
    #[error("Recipe '{recipe}' failed at extract: {cause}")]
    Extract { recipe: String, cause: ExtractError },

    /// Configure step failed
    #[error("Recipe '{recipe}' failed at configure: {cause}")]
    Configure { recipe: String, cause: ToolError },

    /// Compile step failed
    #[error("Recipe '{recipe}' failed at build: {cause}")]
    Build { recipe: String, cause: ToolError },

    /// Install step failed
    #[error("Recipe '{recipe}' failed at install: {cause}")]
    Install { recipe: String, cause: ToolError },
}

impl StageError {
    /// Name of the failing recipe
    pub fn recipe(&self) -> &str {
        match self {
            Self::Fetch { recipe, .. }
            | Self::Extract { recipe, .. }
            | Self::Configure { recipe, .. }
            | Self::Build { recipe, .. }
            | Self::Install { recipe, .. } => recipe,
        }
    }

    /// Stage that failed
    pub fn stage(&self) -> Stage {
        match self {
            Self::Fetch { .. } => Stage::Fetch,
            Self::Extract { .. } => Stage::Extract,
            Self::Configure { .. } => Stage::Configure,
            Self::Build { .. } => Stage::Build,
            Self::Install { .. } => Stage::Install,
        }
    }

    /// Exit code of the external tool, when the failure came from one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Configure { cause, .. } | Self::Build { cause, .. } | Self::Install { cause, .. } => {
                cause.exit_code()
            }
            Self::Fetch { .. } | Self::Extract { .. } => None,
        }
    }
}

/// Recipe graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Circular dependency detected
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    Cycle { cycle: Vec<String> },

    /// Requested or depended-upon recipe does not exist
    #[error("Unknown recipe '{name}'{}", required_by.as_ref().map(|r| format!(" required by '{r}'")).unwrap_or_default())]
    UnknownRecipe {
        name: String,
        required_by: Option<String>,
    },

    /// Two recipes registered under one name
    #[error("Recipe '{name}' is registered more than once")]
    DuplicateRecipe { name: String },
}

/// Revision cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to read the cache file
    #[error("Failed to read revision cache '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Cache file is not valid TOML
    #[error("Failed to parse revision cache '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Failed to persist the cache file
    #[error("Failed to write revision cache '{path}': {error}")]
    Write { path: PathBuf, error: String },
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// A value outside its allowed set
    #[error("Invalid {field} '{value}': expected one of {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    /// Build environment failed validation
    #[error("Invalid build environment: {0}")]
    Environment(String),
}

/// Top-level depsmith error type
#[derive(Error, Debug)]
pub enum DepsmithError {
    /// Stage error
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Graph error
    #[error("Recipe graph error: {0}")]
    Graph(#[from] GraphError),

    /// Cache error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),
}
