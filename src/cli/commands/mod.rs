//! CLI command implementations
//!
//! Each command is implemented in its own submodule. Shared argument groups
//! and the environment/cache loading every command needs live here.

pub mod build;
pub mod clean;
pub mod doctor;
pub mod list;
pub mod plan;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::cli::output::print_warning;
use crate::core::build_env::{BuildEnvironment, BuildMode, LinkMode};
use crate::core::global_config::{EnvironmentOverrides, GlobalConfig};
use crate::core::recipe::RecipeCatalog;
use crate::core::revision_cache::RevisionCache;
use crate::error::CacheError;
use crate::infra::dirs::DepsmithDirs;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build recipes and their dependencies
    Build(BuildArgs),

    /// Show what a build would do without running it
    Plan(PlanArgs),

    /// List available recipes and their install status
    List(EnvArgs),

    /// Remove build (and optionally install) directories
    Clean(CleanArgs),

    /// Check that the required build tools are installed
    Doctor(EnvArgs),
}

/// Flags selecting the build environment
#[derive(Args, Debug, Clone, Default)]
pub struct EnvArgs {
    /// Build mode
    #[arg(long, value_name = "debug|release")]
    pub mode: Option<BuildMode>,

    /// Link mode
    #[arg(long, value_name = "static|shared")]
    pub link: Option<LinkMode>,

    /// Parallel jobs handed to native build tools
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// CMake generator
    #[arg(long)]
    pub generator: Option<String>,

    /// Root of the third-party tree
    #[arg(long)]
    pub root: Option<PathBuf>,
}

/// Recipe selection
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Recipes to process
    pub targets: Vec<String>,

    /// Process every known recipe
    #[arg(long, conflicts_with = "targets")]
    pub all: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    #[command(flatten)]
    pub env: EnvArgs,

    /// Rebuild the requested recipes even when cached
    #[arg(short, long)]
    pub force: bool,

    /// Keep building recipes that do not depend on a failed one
    #[arg(short, long)]
    pub keep_going: bool,

    /// Download sources again even if already present
    #[arg(long)]
    pub refetch: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    #[command(flatten)]
    pub env: EnvArgs,

    /// Plan as if the requested recipes were forced
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    /// Recipes to clean; everything when omitted
    pub recipes: Vec<String>,

    /// Also remove install directories and their cache entries
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub env: EnvArgs,
}

impl Commands {
    /// Execute the command
    pub async fn run(self) -> Result<()> {
        match self {
            Self::Build(args) => build::execute(args).await,
            Self::Plan(args) => plan::execute(&args),
            Self::List(args) => list::execute(&args),
            Self::Clean(args) => clean::execute(&args),
            Self::Doctor(args) => doctor::execute(&args),
        }
    }
}

impl EnvArgs {
    fn overrides(&self) -> EnvironmentOverrides {
        EnvironmentOverrides {
            root: self.root.clone(),
            build_mode: self.mode,
            link_mode: self.link,
            jobs: self.jobs,
            generator: self.generator.clone(),
        }
    }
}

/// Load the global config and layer it with the environment and flags
pub(crate) fn load_environment(args: &EnvArgs) -> Result<(GlobalConfig, BuildEnvironment)> {
    let dirs = DepsmithDirs::new();
    let config = GlobalConfig::load(&dirs).context("Failed to load global configuration")?;
    let env = config
        .build_environment(&args.overrides(), |key| std::env::var(key).ok())
        .context("Failed to set up build environment")?;
    tracing::debug!(
        "Environment: {} {}-{} in {}",
        env.platform,
        env.build_mode,
        env.link_mode,
        env.tree_dir().display()
    );
    Ok((config, env))
}

/// Load the revision cache; an unreadable format starts over with an empty one
pub(crate) fn load_cache(env: &BuildEnvironment) -> Result<RevisionCache> {
    let path = env.cache_path();
    match RevisionCache::load(&path) {
        Ok(cache) => Ok(cache),
        Err(err @ CacheError::Parse { .. }) => {
            print_warning(&format!("{err}; every recipe will be rebuilt"));
            Ok(RevisionCache::empty(path))
        }
        Err(err) => Err(err.into()),
    }
}

/// Resolve the recipe names a command operates on
pub(crate) fn select_targets(catalog: &RecipeCatalog, args: &TargetArgs) -> Result<Vec<String>> {
    if args.all {
        return Ok(catalog.names().into_iter().map(String::from).collect());
    }
    if args.targets.is_empty() {
        bail!("No recipes given. Name the recipes to process or pass --all.");
    }
    Ok(args.targets.clone())
}
