//! CLI implementation for `depsmith clean`
//!
//! Removes build directories, and install directories with `--all`.

use anyhow::{Context, Result};

use crate::cli::commands::{load_cache, load_environment, CleanArgs};
use crate::cli::output::{is_json, print_detail, print_success};
use crate::core::clean::{clean_recipes, CleanOptions};
use crate::recipes::builtin_catalog;

/// Execute the clean command
pub fn execute(args: &CleanArgs) -> Result<()> {
    let (_, env) = load_environment(&args.env)?;
    let catalog = builtin_catalog(&env)?;
    let mut cache = load_cache(&env)?;
    let names: Vec<&str> = args.recipes.iter().map(String::as_str).collect();

    let result = clean_recipes(
        &env,
        &catalog,
        &names,
        CleanOptions { installs: args.all },
        &mut cache,
    )
    .context("Failed to clean")?;

    if is_json() {
        let json = serde_json::json!({
            "status": "success",
            "removed": result.removed,
            "forgotten": result.forgotten,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if result.removed.is_empty() {
        print_success("Nothing to clean");
        return Ok(());
    }

    print_success(&format!("Removed {} directories", result.removed.len()));
    for dir in &result.removed {
        print_detail(&dir.display().to_string());
    }
    if !result.forgotten.is_empty() {
        print_detail(&format!("Forgot cached revisions of {}", result.forgotten.join(", ")));
    }
    Ok(())
}
