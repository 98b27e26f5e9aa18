//! Recipe contract
//!
//! A recipe describes how one third-party library is turned into installed
//! headers and libraries. Recipes are stateless: identity and derived paths
//! are pure functions of the recipe and the [`BuildEnvironment`], and the only
//! durable state lives in the revision cache.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::build_env::BuildEnvironment;
use crate::error::{GraphError, ToolError};
use crate::infra::filesystem::{self, CopyFilter};
use crate::infra::process::{ToolCommand, ToolRunner};

/// One step of the fetch -> extract -> configure -> build -> install pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Extract,
    Configure,
    Build,
    Install,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 5] = [
        Stage::Fetch,
        Stage::Extract,
        Stage::Configure,
        Stage::Build,
        Stage::Install,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Extract => write!(f, "extract"),
            Self::Configure => write!(f, "configure"),
            Self::Build => write!(f, "build"),
            Self::Install => write!(f, "install"),
        }
    }
}

/// Per-invocation state of a recipe.
///
/// Transitions are strictly sequential. The only shortcut is a cache hit,
/// which moves `Pending` straight to `Installed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeState {
    Pending,
    Fetched,
    Extracted,
    Configured,
    Built,
    Installed,
    Failed(Stage),
}

impl RecipeState {
    /// Stage to run next, `None` once installed or failed
    pub fn next_stage(self) -> Option<Stage> {
        match self {
            Self::Pending => Some(Stage::Fetch),
            Self::Fetched => Some(Stage::Extract),
            Self::Extracted => Some(Stage::Configure),
            Self::Configured => Some(Stage::Build),
            Self::Built => Some(Stage::Install),
            Self::Installed | Self::Failed(_) => None,
        }
    }

    /// State after `stage` completed successfully.
    ///
    /// Returns `None` if `stage` is not the next stage for this state.
    pub fn advance(self, stage: Stage) -> Option<Self> {
        if self.next_stage() != Some(stage) {
            return None;
        }
        Some(match stage {
            Stage::Fetch => Self::Fetched,
            Stage::Extract => Self::Extracted,
            Stage::Configure => Self::Configured,
            Stage::Build => Self::Built,
            Stage::Install => Self::Installed,
        })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Installed | Self::Failed(_))
    }
}

impl fmt::Display for RecipeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Fetched => write!(f, "fetched"),
            Self::Extracted => write!(f, "extracted"),
            Self::Configured => write!(f, "configured"),
            Self::Built => write!(f, "built"),
            Self::Installed => write!(f, "installed"),
            Self::Failed(stage) => write!(f, "failed at {stage}"),
        }
    }
}

/// Identity used for cache lookups and fetch planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIdentity {
    pub name: String,
    pub revision: String,
    pub source_url: String,
}

/// Staged build contract implemented by every dependency.
///
/// Stage functions receive a [`StageContext`] carrying the environment, the
/// recipe's own paths and the install paths of its declared dependencies.
/// `configure` must be safe to re-run on an already configured tree, and
/// `install` must overwrite rather than append.
pub trait Recipe: Send + Sync {
    /// Unique name within a catalog
    fn name(&self) -> &str;

    /// Upstream version
    fn version(&self) -> &str;

    /// Local patch iteration, bumped when the recipe itself changes
    fn patch_level(&self) -> Option<&str> {
        None
    }

    /// Opaque fingerprint of the buildable state
    fn revision(&self) -> String {
        match self.patch_level() {
            Some(patch) => format!("{}-{patch}", self.version()),
            None => self.version().to_string(),
        }
    }

    fn source_url(&self) -> &str;

    /// Expected SHA-256 of the fetched file, when pinned
    fn source_sha256(&self) -> Option<&str> {
        None
    }

    /// Directory name under the common install root
    fn install_name(&self) -> &str {
        self.name()
    }

    /// Names of recipes whose install paths this recipe reads
    fn dependencies(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Whether fetched content has to be extracted before configure
    fn is_archive(&self) -> bool {
        true
    }

    fn identify(&self) -> RecipeIdentity {
        RecipeIdentity {
            name: self.name().to_string(),
            revision: self.revision(),
            source_url: self.source_url().to_string(),
        }
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError>;

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError>;

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError>;
}

/// Paths derived from a recipe and the environment; always recomputed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeLayout {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub install_dir: PathBuf,
    /// Where the fetched file lands. For non-archive sources this is
    /// inside `source_dir`.
    pub archive_path: PathBuf,
}

impl RecipeLayout {
    pub fn new(recipe: &dyn Recipe, env: &BuildEnvironment) -> Self {
        let stem = format!("{}-{}", recipe.name(), recipe.version());
        let source_dir = env.sources_root().join(&stem);
        let archive_path = if recipe.is_archive() {
            env.downloads_dir()
                .join(format!("{stem}.{}", archive_extension(recipe.source_url())))
        } else {
            source_dir.join(url_file_name(recipe.source_url()).unwrap_or(recipe.name()))
        };

        Self {
            build_dir: env.build_root().join(recipe.name()),
            install_dir: env.install_root().join(recipe.install_name()),
            source_dir,
            archive_path,
        }
    }

    pub fn include_dir(&self) -> PathBuf {
        self.install_dir.join("include")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.install_dir.join("lib")
    }
}

/// Archive extension of a URL, defaulting to `tar.gz`
pub fn archive_extension(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    if path.ends_with(".tar.gz") {
        "tar.gz"
    } else if path.ends_with(".tgz") {
        "tgz"
    } else if path.ends_with(".tar") {
        "tar"
    } else if path.ends_with(".zip") {
        "zip"
    } else {
        "tar.gz"
    }
}

/// Last path segment of a URL
fn url_file_name(url: &str) -> Option<&str> {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
}

/// Everything a stage function may read or run
pub struct StageContext<'a> {
    pub env: &'a BuildEnvironment,
    pub layout: &'a RecipeLayout,
    dependencies: BTreeMap<&'a str, &'a RecipeLayout>,
    runner: &'a dyn ToolRunner,
}

impl<'a> StageContext<'a> {
    pub fn new(
        env: &'a BuildEnvironment,
        layout: &'a RecipeLayout,
        dependencies: BTreeMap<&'a str, &'a RecipeLayout>,
        runner: &'a dyn ToolRunner,
    ) -> Self {
        Self {
            env,
            layout,
            dependencies,
            runner,
        }
    }

    /// Install paths of a declared dependency
    pub fn dependency(&self, name: &str) -> Result<&'a RecipeLayout, ToolError> {
        self.dependencies
            .get(name)
            .copied()
            .ok_or_else(|| ToolError::UndeclaredDependency {
                recipe: name.to_string(),
            })
    }

    /// Command preset with the build directory and environment overrides
    pub fn command(&self, program: &str) -> ToolCommand {
        ToolCommand::new(program)
            .cwd(&self.layout.build_dir)
            .envs(&self.env.to_env_map())
    }

    pub fn run(&self, command: &ToolCommand) -> Result<(), ToolError> {
        self.runner.run(command)
    }

    /// Mirror the source tree into the build directory
    pub fn copy_sources_to_build(&self) -> Result<(), ToolError> {
        filesystem::copy_sources_to_build(&self.layout.source_dir, &self.layout.build_dir)?;
        Ok(())
    }

    /// Filtered copy into the install directory
    pub fn install_files(
        &self,
        from: &Path,
        subdir: &str,
        filter: &CopyFilter,
        cleanup: bool,
    ) -> Result<(), ToolError> {
        let dst = if subdir.is_empty() {
            self.layout.install_dir.clone()
        } else {
            self.layout.install_dir.join(subdir)
        };
        filesystem::filter_copy(from, &dst, filter, cleanup)?;
        Ok(())
    }
}

/// Recipes available for one build environment, in registration order
#[derive(Default)]
pub struct RecipeCatalog {
    recipes: Vec<Box<dyn Recipe>>,
}

impl RecipeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recipe; names must be unique
    pub fn add(&mut self, recipe: Box<dyn Recipe>) -> Result<(), GraphError> {
        if self.get(recipe.name()).is_some() {
            return Err(GraphError::DuplicateRecipe {
                name: recipe.name().to_string(),
            });
        }
        self.recipes.push(recipe);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Recipe> {
        self.recipes
            .iter()
            .find(|r| r.name() == name)
            .map(AsRef::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Recipe> {
        self.recipes.iter().map(AsRef::as_ref)
    }

    pub fn names(&self) -> Vec<&str> {
        self.recipes.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl fmt::Debug for RecipeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
