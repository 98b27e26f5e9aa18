//! CLI implementation for `depsmith list`
//!
//! Shows every built-in recipe with its revision, direct dependencies and
//! what the revision cache says about it in the selected environment.

use anyhow::Result;
use serde::Serialize;

use crate::cli::commands::{load_cache, load_environment, EnvArgs};
use crate::cli::output::{is_json, is_quiet, status};
use crate::core::recipe::{RecipeIdentity, RecipeLayout};
use crate::core::revision_cache::CacheStatus;
use crate::recipes::builtin_catalog;

#[derive(Debug, Serialize)]
struct ListEntry<'a> {
    #[serde(flatten)]
    identity: RecipeIdentity,
    version: &'a str,
    dependencies: Vec<&'a str>,
    install_name: &'a str,
    cache: CacheStatus,
}

/// Execute the list command
pub fn execute(args: &EnvArgs) -> Result<()> {
    let (_, env) = load_environment(args)?;
    let catalog = builtin_catalog(&env)?;
    let cache = load_cache(&env)?;

    let entries: Vec<ListEntry<'_>> = catalog
        .iter()
        .map(|recipe| {
            let layout = RecipeLayout::new(recipe, &env);
            let identity = recipe.identify();
            ListEntry {
                cache: cache.status(&identity.name, &identity.revision, &layout.install_dir),
                identity,
                version: recipe.version(),
                dependencies: recipe.dependencies(),
                install_name: recipe.install_name(),
            }
        })
        .collect();

    if is_json() {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if is_quiet() {
        for entry in &entries {
            println!("{}", entry.identity.name);
        }
        return Ok(());
    }

    for entry in &entries {
        let symbol = if entry.cache.is_fresh() {
            status::SUCCESS
        } else {
            status::SKIP
        };
        let deps = if entry.dependencies.is_empty() {
            String::new()
        } else {
            format!("  <- {}", entry.dependencies.join(", "))
        };
        println!(
            "{symbol} {:<22} {:<44} {}{deps}",
            entry.identity.name, entry.identity.revision, entry.cache
        );
    }
    Ok(())
}
