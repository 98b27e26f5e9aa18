//! Build planning
//!
//! Resolves what a build would do without running any stage: the order and,
//! for each recipe, whether the cache would let it skip its pipeline.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::build_env::BuildEnvironment;
use crate::core::recipe::RecipeLayout;
use crate::core::resolver::RecipeGraph;
use crate::core::revision_cache::{CacheStatus, RevisionCache};

/// One recipe in a [`BuildPlan`]
#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub name: String,
    pub version: String,
    pub revision: String,
    pub dependencies: Vec<String>,
    pub install_dir: PathBuf,
    /// Explicitly requested, as opposed to pulled in as a dependency
    pub requested: bool,
    pub cache: CacheStatus,
    /// Whether the pipeline would run
    pub will_build: bool,
}

/// Ordered preview of a build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildPlan {
    pub recipes: Vec<PlanEntry>,
}

impl BuildPlan {
    /// Plan a build of `graph`; `force` has the same meaning as for the driver
    pub fn new(
        graph: &RecipeGraph<'_>,
        env: &BuildEnvironment,
        cache: &RevisionCache,
        force: bool,
    ) -> Self {
        let recipes = graph
            .build_order()
            .iter()
            .map(|recipe| {
                let layout = RecipeLayout::new(*recipe, env);
                let revision = recipe.revision();
                let requested = graph.is_requested(recipe.name());
                let cache = cache.status(recipe.name(), &revision, &layout.install_dir);
                PlanEntry {
                    name: recipe.name().to_string(),
                    version: recipe.version().to_string(),
                    dependencies: graph
                        .dependencies_of(recipe.name())
                        .iter()
                        .map(ToString::to_string)
                        .collect(),
                    install_dir: layout.install_dir,
                    will_build: !cache.is_fresh() || (force && requested),
                    requested,
                    revision,
                    cache,
                }
            })
            .collect();
        Self { recipes }
    }

    /// Number of recipes whose pipeline would run
    pub fn build_count(&self) -> usize {
        self.recipes.iter().filter(|e| e.will_build).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recipe::{Recipe, RecipeCatalog};
    use crate::test_utils::MockRecipe;
    use tempfile::TempDir;

    #[test]
    fn test_plan_reports_order_and_cache_state() {
        let temp = TempDir::new().unwrap();
        let env = BuildEnvironment::new(temp.path());
        let mut catalog = RecipeCatalog::new();
        catalog.add(Box::new(MockRecipe::new("openssl", "1.1.1w"))).unwrap();
        catalog
            .add(Box::new(MockRecipe::new("curl", "8.4.0").with_deps(&["openssl"])))
            .unwrap();

        let openssl = catalog.get("openssl").unwrap();
        std::fs::create_dir_all(RecipeLayout::new(openssl, &env).install_dir).unwrap();
        let mut cache = RevisionCache::empty(env.cache_path());
        cache.record("openssl", &openssl.revision()).unwrap();

        let graph = RecipeGraph::resolve(&catalog, &["curl"]).unwrap();
        let plan = BuildPlan::new(&graph, &env, &cache, false);

        let names: Vec<_> = plan.recipes.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["openssl", "curl"]);
        assert_eq!(plan.recipes[0].cache, CacheStatus::Fresh);
        assert!(!plan.recipes[0].will_build);
        assert!(!plan.recipes[0].requested);
        assert_eq!(plan.recipes[1].cache, CacheStatus::Missing);
        assert_eq!(plan.recipes[1].dependencies, vec!["openssl"]);
        assert_eq!(plan.build_count(), 1);
    }

    #[test]
    fn test_force_only_affects_requested_recipes() {
        let temp = TempDir::new().unwrap();
        let env = BuildEnvironment::new(temp.path());
        let mut catalog = RecipeCatalog::new();
        catalog.add(Box::new(MockRecipe::new("mpir", "3.0.0"))).unwrap();
        catalog
            .add(Box::new(MockRecipe::new("libbtc", "0.1").with_deps(&["mpir"])))
            .unwrap();
        let mut cache = RevisionCache::empty(env.cache_path());
        for recipe in catalog.iter() {
            std::fs::create_dir_all(RecipeLayout::new(recipe, &env).install_dir).unwrap();
            cache.record(recipe.name(), &recipe.revision()).unwrap();
        }

        let graph = RecipeGraph::resolve(&catalog, &["libbtc"]).unwrap();
        let plan = BuildPlan::new(&graph, &env, &cache, true);

        assert!(!plan.recipes[0].will_build);
        assert!(plan.recipes[1].will_build);
    }

    #[test]
    fn test_plan_serializes_cache_status() {
        let temp = TempDir::new().unwrap();
        let env = BuildEnvironment::new(temp.path());
        let mut catalog = RecipeCatalog::new();
        catalog.add(Box::new(MockRecipe::new("gtest", "1.14.0"))).unwrap();
        let graph = RecipeGraph::resolve(&catalog, &["gtest"]).unwrap();
        let plan = BuildPlan::new(&graph, &env, &RevisionCache::empty(env.cache_path()), false);

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["recipes"][0]["name"], "gtest");
        assert_eq!(json["recipes"][0]["cache"]["status"], "missing");
        assert_eq!(json["recipes"][0]["will_build"], true);
    }
}
