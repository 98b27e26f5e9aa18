//! Build command implementation
//!
//! Implements `depsmith build`: resolve the requested recipes, then drive the
//! graph on a blocking worker thread so downloads can block on the runtime
//! while external tools run.

use anyhow::{bail, Context, Result};
use tokio::runtime::Handle;

use crate::cli::commands::{load_cache, load_environment, select_targets, BuildArgs};
use crate::cli::output::{
    create_download_bar, is_json, is_quiet, print_detail, print_error, print_success, status,
    verbosity,
};
use crate::core::build_env::BuildEnvironment;
use crate::core::builder::{BuildDriver, BuildEvent, BuildOptions, BuildReport, RecipeOutcome};
use crate::core::global_config::GlobalConfig;
use crate::core::resolver::RecipeGraph;
use crate::infra::process::ProcessRunner;
use crate::infra::source::HttpSourceProvider;
use crate::recipes::builtin_catalog;

/// Execute the build command
pub async fn execute(args: BuildArgs) -> Result<()> {
    let (config, env) = load_environment(&args.env)?;
    let options = BuildOptions {
        force: args.force,
        refetch: args.refetch,
        keep_going: args.keep_going,
    };
    let handle = Handle::current();

    let report = tokio::task::spawn_blocking(move || run_build(&config, &env, &args, options, handle))
        .await
        .context("Build worker stopped unexpectedly")??;

    print_report(&report)?;

    if !report.succeeded() {
        for failure in &report.failures {
            print_error(&failure.to_string());
        }
        bail!(
            "Build failed: {} recipe(s) failed, {} not started",
            report.failed_count(),
            report.not_started().len()
        );
    }
    Ok(())
}

fn run_build(
    config: &GlobalConfig,
    env: &BuildEnvironment,
    args: &BuildArgs,
    options: BuildOptions,
    handle: Handle,
) -> Result<BuildReport> {
    let catalog = builtin_catalog(env)?;
    let targets = select_targets(&catalog, &args.targets)?;
    let requested: Vec<&str> = targets.iter().map(String::as_str).collect();
    let graph = RecipeGraph::resolve(&catalog, &requested)?;
    tracing::info!("Build order: {}", graph.names().join(", "));

    let mut cache = load_cache(env)?;
    let sources = HttpSourceProvider::new(config.download_manager(), handle)
        .with_progress(Box::new(create_download_bar));
    let runner = ProcessRunner::new();

    let driver = BuildDriver::new(env, &sources, &runner)
        .with_options(options)
        .with_event_handler(Box::new(print_event));

    let report = driver
        .run(&graph, &mut cache)
        .context("Failed to update the revision cache")?;
    Ok(report)
}

/// Progress lines while the graph is walked
fn print_event(event: &BuildEvent<'_>) {
    if is_quiet() || is_json() {
        return;
    }
    match event {
        BuildEvent::Started { name, revision } => {
            println!("{} Building {name} {revision}", status::INFO);
        }
        BuildEvent::Stage { .. } if verbosity() == 0 => {}
        BuildEvent::Stage { name, stage } => print_detail(&format!("{name}: {stage}")),
        BuildEvent::Cached { name, revision } => {
            println!("{} {name} {revision} is up to date", status::SKIP);
        }
        BuildEvent::Installed { name } => println!("{} Installed {name}", status::SUCCESS),
        BuildEvent::Failed { name, stage } => {
            eprintln!("{} {name} failed at {stage}", status::ERROR);
        }
        BuildEvent::Skipped { name, blocked_by } => {
            println!("{} Skipping {name}: {blocked_by} failed", status::SKIP);
        }
    }
}

fn print_report(report: &BuildReport) -> Result<()> {
    if is_json() {
        let json = serde_json::json!({
            "status": if report.succeeded() { "success" } else { "error" },
            "recipes": report.recipes,
            "not_started": report.not_started(),
            "failures": report.failures.iter().map(|f| serde_json::json!({
                "recipe": f.recipe(),
                "stage": f.stage(),
                "exit_code": f.exit_code(),
                "error": f.to_string(),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if report.succeeded() {
        print_success(&format!(
            "Build complete: {} built, {} up to date",
            report.built_count(),
            report.cached_count()
        ));
        return Ok(());
    }

    if !is_quiet() {
        println!();
        for recipe in &report.recipes {
            let symbol = match recipe.outcome {
                RecipeOutcome::Installed { .. } => status::SUCCESS,
                RecipeOutcome::Failed { .. } => status::ERROR,
                RecipeOutcome::Skipped { .. } | RecipeOutcome::NotStarted => status::SKIP,
            };
            println!("  {symbol} {:<22} {}", recipe.name, recipe.outcome);
        }
        println!();
    }
    Ok(())
}
