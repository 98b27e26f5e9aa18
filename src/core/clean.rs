//! Clean logic
//!
//! Removes per-recipe build directories and, on request, install directories
//! together with their revision cache entries so the cache never points at a
//! deleted install.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::core::build_env::BuildEnvironment;
use crate::core::recipe::{Recipe, RecipeCatalog, RecipeLayout};
use crate::core::revision_cache::RevisionCache;
use crate::error::{DepsmithError, GraphError};
use crate::infra::filesystem;

/// What to remove
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    /// Also remove install directories and forget cache entries
    pub installs: bool,
}

/// Result of clean operation
#[derive(Debug, Default)]
pub struct CleanResult {
    /// Directories that were removed
    pub removed: Vec<PathBuf>,
    /// Directories that didn't exist (skipped)
    pub skipped: Vec<PathBuf>,
    /// Recipes whose cache entry was dropped
    pub forgotten: Vec<String>,
}

/// Clean the given recipes, or every catalog recipe when `names` is empty
pub fn clean_recipes(
    env: &BuildEnvironment,
    catalog: &RecipeCatalog,
    names: &[&str],
    options: CleanOptions,
    cache: &mut RevisionCache,
) -> Result<CleanResult, DepsmithError> {
    let recipes: Vec<&dyn Recipe> = if names.is_empty() {
        catalog.iter().collect()
    } else {
        names
            .iter()
            .map(|name| {
                catalog.get(name).ok_or_else(|| GraphError::UnknownRecipe {
                    name: (*name).to_string(),
                    required_by: None,
                })
            })
            .collect::<Result<_, _>>()?
    };

    let mut result = CleanResult::default();
    for recipe in recipes {
        let layout = RecipeLayout::new(recipe, env);

        let mut dirs = vec![layout.build_dir];
        if options.installs {
            dirs.push(layout.install_dir);
            if cache.forget(recipe.name())? {
                result.forgotten.push(recipe.name().to_string());
            }
        }

        for dir in dirs {
            if !env.owns(&dir) {
                warn!("Not removing {}: outside {}", dir.display(), env.root.display());
                continue;
            }
            if dir.exists() {
                filesystem::remove_dir_all(&dir)?;
                info!("Removed {}", dir.display());
                result.removed.push(dir);
            } else {
                result.skipped.push(dir);
            }
        }
    }

    Ok(result)
}
