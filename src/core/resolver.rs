//! Dependency resolution
//!
//! Discovers the transitive dependencies of a set of requested recipes and
//! computes a build order in which every recipe comes after all of the
//! recipes it depends on.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::core::recipe::{Recipe, RecipeCatalog};
use crate::error::GraphError;

/// Ordered view over the recipes needed for one invocation.
///
/// Holds non-owning references into the catalog; the catalog outlives every
/// graph built from it.
pub struct RecipeGraph<'a> {
    order: Vec<&'a dyn Recipe>,
    edges: HashMap<&'a str, Vec<&'a str>>,
    requested: Vec<&'a str>,
}

impl<'a> RecipeGraph<'a> {
    /// Resolve `requested` against `catalog`.
    ///
    /// Recipes without an ordering constraint between them keep the order of
    /// the request; dependencies that were not requested follow in discovery
    /// order. Unknown names and cycles are reported before anything runs.
    pub fn resolve(catalog: &'a RecipeCatalog, requested: &[&str]) -> Result<Self, GraphError> {
        let mut roots: Vec<&'a dyn Recipe> = Vec::new();
        for name in requested {
            let recipe = catalog.get(name).ok_or_else(|| GraphError::UnknownRecipe {
                name: (*name).to_string(),
                required_by: None,
            })?;
            if !roots.iter().any(|r| r.name() == recipe.name()) {
                roots.push(recipe);
            }
        }

        // Breadth-first discovery of every reachable recipe
        let mut discovered: Vec<&'a dyn Recipe> = roots.clone();
        let mut edges: HashMap<&'a str, Vec<&'a str>> = HashMap::new();
        let mut cursor = 0;
        while cursor < discovered.len() {
            let recipe = discovered[cursor];
            cursor += 1;

            let mut deps = Vec::new();
            for dep_name in recipe.dependencies() {
                let dep = catalog.get(dep_name).ok_or_else(|| GraphError::UnknownRecipe {
                    name: dep_name.to_string(),
                    required_by: Some(recipe.name().to_string()),
                })?;
                if !discovered.iter().any(|r| r.name() == dep.name()) {
                    discovered.push(dep);
                }
                deps.push(dep.name());
            }
            edges.insert(recipe.name(), deps);
        }

        // Requested recipes rank by request index, the rest after them
        let priority: HashMap<&'a str, usize> = discovered
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name(), i))
            .collect();
        for deps in edges.values_mut() {
            deps.sort_by_key(|d| priority.get(d).copied().unwrap_or(usize::MAX));
            deps.dedup();
        }

        let lookup: HashMap<&'a str, &'a dyn Recipe> =
            discovered.iter().map(|r| (r.name(), *r)).collect();

        let mut graph = Self {
            order: Vec::with_capacity(discovered.len()),
            edges,
            requested: roots.iter().map(|r| r.name()).collect(),
        };
        graph.order = graph.topological_sort(&roots, &lookup)?;

        debug!(
            "Build order: {}",
            graph
                .order
                .iter()
                .map(|r| r.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(graph)
    }

    /// Depth-first topological sort
    fn topological_sort(
        &self,
        roots: &[&'a dyn Recipe],
        lookup: &HashMap<&'a str, &'a dyn Recipe>,
    ) -> Result<Vec<&'a dyn Recipe>, GraphError> {
        let mut visited = HashSet::new();
        let mut temp_visited = HashSet::new();
        let mut result = Vec::new();
        let mut cycle_path = Vec::new();

        for root in roots {
            if !visited.contains(root.name()) {
                self.visit(
                    root.name(),
                    lookup,
                    &mut visited,
                    &mut temp_visited,
                    &mut result,
                    &mut cycle_path,
                )?;
            }
        }

        Ok(result)
    }

    fn visit(
        &self,
        node: &'a str,
        lookup: &HashMap<&'a str, &'a dyn Recipe>,
        visited: &mut HashSet<&'a str>,
        temp_visited: &mut HashSet<&'a str>,
        result: &mut Vec<&'a dyn Recipe>,
        cycle_path: &mut Vec<&'a str>,
    ) -> Result<(), GraphError> {
        if temp_visited.contains(node) {
            // Found a cycle; report it from its first occurrence
            let start = cycle_path.iter().position(|n| *n == node).unwrap_or(0);
            let mut cycle: Vec<String> =
                cycle_path[start..].iter().map(ToString::to_string).collect();
            cycle.push(node.to_string());
            return Err(GraphError::Cycle { cycle });
        }

        if visited.contains(node) {
            return Ok(());
        }

        temp_visited.insert(node);
        cycle_path.push(node);

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                self.visit(*dep, lookup, visited, temp_visited, result, cycle_path)?;
            }
        }

        cycle_path.pop();
        temp_visited.remove(node);
        visited.insert(node);
        if let Some(recipe) = lookup.get(node) {
            result.push(*recipe);
        }

        Ok(())
    }

    /// Recipes in build order
    pub fn build_order(&self) -> &[&'a dyn Recipe] {
        &self.order
    }

    /// Names in build order
    pub fn names(&self) -> Vec<&'a str> {
        self.order.iter().map(|r| r.name()).collect()
    }

    /// Direct dependencies of a recipe in the graph
    pub fn dependencies_of(&self, name: &str) -> &[&'a str] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the recipe was explicitly requested (as opposed to pulled in)
    pub fn is_requested(&self, name: &str) -> bool {
        self.requested.iter().any(|r| *r == name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
