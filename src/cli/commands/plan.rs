//! CLI implementation for `depsmith plan`

use anyhow::Result;

use crate::cli::commands::{load_cache, load_environment, select_targets, PlanArgs};
use crate::cli::output::{is_json, is_quiet, print_info, status};
use crate::core::plan::BuildPlan;
use crate::core::resolver::RecipeGraph;
use crate::recipes::builtin_catalog;

/// Execute the plan command
pub fn execute(args: &PlanArgs) -> Result<()> {
    let (_, env) = load_environment(&args.env)?;
    let catalog = builtin_catalog(&env)?;
    let targets = select_targets(&catalog, &args.targets)?;
    let requested: Vec<&str> = targets.iter().map(String::as_str).collect();
    let graph = RecipeGraph::resolve(&catalog, &requested)?;
    let cache = load_cache(&env)?;

    let plan = BuildPlan::new(&graph, &env, &cache, args.force);

    if is_json() {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }
    if is_quiet() {
        return Ok(());
    }

    print_info(&format!(
        "{} of {} recipes would build ({}-{} in {})",
        plan.build_count(),
        plan.recipes.len(),
        env.build_mode,
        env.link_mode,
        env.tree_dir().display()
    ));
    println!();
    for (index, entry) in plan.recipes.iter().enumerate() {
        let symbol = if entry.will_build { "→" } else { status::SKIP };
        let deps = if entry.dependencies.is_empty() {
            String::new()
        } else {
            format!(" (needs {})", entry.dependencies.join(", "))
        };
        println!(
            "  {:>2}. {symbol} {:<22} {:<12} {}{deps}",
            index + 1,
            entry.name,
            entry.revision,
            entry.cache
        );
    }
    Ok(())
}
