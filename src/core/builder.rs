//! Build orchestration logic
//!
//! Drives every recipe of a [`RecipeGraph`] through its state machine, one
//! recipe at a time and in build order. A recipe whose cached revision is
//! still valid goes straight to `Installed`; otherwise all five stages run and
//! the cache is updated after a successful install.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::build_env::BuildEnvironment;
use crate::core::recipe::{Recipe, RecipeLayout, RecipeState, Stage, StageContext};
use crate::core::resolver::RecipeGraph;
use crate::core::revision_cache::{CacheStatus, RevisionCache};
use crate::error::{CacheError, DownloadError, StageError, ToolError};
use crate::infra::download::{sha256_file, verify_checksum};
use crate::infra::filesystem;
use crate::infra::process::ToolRunner;
use crate::infra::source::SourceProvider;

/// Build options
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Ignore cache hits for explicitly requested recipes
    pub force: bool,
    /// Download sources again even if a file is already present
    pub refetch: bool,
    /// Keep building independent recipes after a failure
    pub keep_going: bool,
}

/// Progress notifications emitted while the graph is walked
#[derive(Debug, Clone, Copy)]
pub enum BuildEvent<'a> {
    /// Recipe pipeline is about to run
    Started { name: &'a str, revision: &'a str },
    /// Stage is about to run
    Stage { name: &'a str, stage: Stage },
    /// Recipe skipped thanks to the cache
    Cached { name: &'a str, revision: &'a str },
    /// Recipe installed
    Installed { name: &'a str },
    /// Stage failed
    Failed { name: &'a str, stage: Stage },
    /// Recipe not attempted because a dependency failed
    Skipped { name: &'a str, blocked_by: &'a str },
}

pub type EventHandler = Box<dyn Fn(&BuildEvent<'_>) + Send + Sync>;

/// Final state of one recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecipeOutcome {
    /// Installed, either now or by an earlier invocation
    Installed { cached: bool },
    /// A stage failed
    Failed { stage: Stage },
    /// A dependency failed, so no stage ran
    Skipped { blocked_by: String },
    /// The walk stopped before reaching this recipe
    NotStarted,
}

impl fmt::Display for RecipeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed { cached: true } => write!(f, "cached"),
            Self::Installed { cached: false } => write!(f, "built"),
            Self::Failed { stage } => write!(f, "failed at {stage}"),
            Self::Skipped { blocked_by } => write!(f, "skipped ({blocked_by} failed)"),
            Self::NotStarted => write!(f, "not started"),
        }
    }
}

/// Per-recipe line of a [`BuildReport`]
#[derive(Debug, Clone, Serialize)]
pub struct RecipeReport {
    pub name: String,
    pub revision: String,
    pub install_dir: std::path::PathBuf,
    #[serde(flatten)]
    pub outcome: RecipeOutcome,
}

/// Result of a graph walk
#[derive(Debug, Default, Serialize)]
pub struct BuildReport {
    /// Recipes in build order
    pub recipes: Vec<RecipeReport>,
    /// Stage failures in the order they happened
    #[serde(skip)]
    pub failures: Vec<StageError>,
}

impl BuildReport {
    /// True when no recipe failed or was left out
    pub fn succeeded(&self) -> bool {
        self.recipes
            .iter()
            .all(|r| matches!(r.outcome, RecipeOutcome::Installed { .. }))
    }

    pub fn outcome(&self, name: &str) -> Option<&RecipeOutcome> {
        self.recipes
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }

    /// Names of recipes that never ran a stage after a failure
    pub fn not_started(&self) -> Vec<&str> {
        self.recipes
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    RecipeOutcome::NotStarted | RecipeOutcome::Skipped { .. }
                )
            })
            .map(|r| r.name.as_str())
            .collect()
    }

    pub fn built_count(&self) -> usize {
        self.count(|o| matches!(o, RecipeOutcome::Installed { cached: false }))
    }

    pub fn cached_count(&self) -> usize {
        self.count(|o| matches!(o, RecipeOutcome::Installed { cached: true }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, RecipeOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&RecipeOutcome) -> bool) -> usize {
        self.recipes.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Walks a recipe graph
pub struct BuildDriver<'a> {
    env: &'a BuildEnvironment,
    sources: &'a dyn SourceProvider,
    runner: &'a dyn ToolRunner,
    options: BuildOptions,
    on_event: Option<EventHandler>,
}

impl<'a> BuildDriver<'a> {
    pub fn new(
        env: &'a BuildEnvironment,
        sources: &'a dyn SourceProvider,
        runner: &'a dyn ToolRunner,
    ) -> Self {
        Self {
            env,
            sources,
            runner,
            options: BuildOptions::default(),
            on_event: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_event_handler(mut self, handler: EventHandler) -> Self {
        self.on_event = Some(handler);
        self
    }

    fn emit(&self, event: &BuildEvent<'_>) {
        if let Some(ref handler) = self.on_event {
            handler(event);
        }
    }

    /// Walk the graph.
    ///
    /// Stage failures end up in the report; only a failure to persist the
    /// cache aborts the walk with an error.
    pub fn run(
        &self,
        graph: &RecipeGraph<'_>,
        cache: &mut RevisionCache,
    ) -> Result<BuildReport, CacheError> {
        let layouts: HashMap<&str, RecipeLayout> = graph
            .build_order()
            .iter()
            .map(|r| (r.name(), RecipeLayout::new(*r, self.env)))
            .collect();

        let mut report = BuildReport::default();
        let mut broken: HashSet<&str> = HashSet::new();
        let mut halted = false;

        for recipe in graph.build_order() {
            let name = recipe.name();
            let revision = recipe.revision();
            let Some(layout) = layouts.get(name) else {
                continue;
            };
            let mut entry = RecipeReport {
                name: name.to_string(),
                revision: revision.clone(),
                install_dir: layout.install_dir.clone(),
                outcome: RecipeOutcome::NotStarted,
            };

            if halted {
                report.recipes.push(entry);
                continue;
            }

            if let Some(blocked_by) = graph
                .dependencies_of(name)
                .iter()
                .find(|dep| broken.contains(**dep))
            {
                info!("Skipping {name}: dependency {blocked_by} failed");
                self.emit(&BuildEvent::Skipped { name, blocked_by });
                broken.insert(name);
                entry.outcome = RecipeOutcome::Skipped {
                    blocked_by: (*blocked_by).to_string(),
                };
                report.recipes.push(entry);
                continue;
            }

            let forced = self.options.force && graph.is_requested(name);
            match cache.status(name, &revision, &layout.install_dir) {
                CacheStatus::Fresh if !forced => {
                    info!("{name} {revision} is up to date");
                    self.emit(&BuildEvent::Cached {
                        name,
                        revision: &revision,
                    });
                    entry.outcome = RecipeOutcome::Installed { cached: true };
                    report.recipes.push(entry);
                    continue;
                }
                CacheStatus::Fresh => info!("Rebuilding {name} (forced)"),
                CacheStatus::Inconsistent => warn!(
                    "Cache lists {name} {revision} as installed but {} is missing; rebuilding",
                    layout.install_dir.display()
                ),
                CacheStatus::Stale { recorded } => {
                    info!("{name} changed from {recorded} to {revision}; rebuilding");
                }
                CacheStatus::Missing => debug!("{name} has no cache entry"),
            }

            self.emit(&BuildEvent::Started {
                name,
                revision: &revision,
            });

            match self.run_pipeline(*recipe, layout, graph, &layouts) {
                Ok(()) => {
                    cache.record(name, &revision)?;
                    self.emit(&BuildEvent::Installed { name });
                    entry.outcome = RecipeOutcome::Installed { cached: false };
                }
                Err(err) => {
                    warn!("{err}");
                    self.emit(&BuildEvent::Failed {
                        name,
                        stage: err.stage(),
                    });
                    entry.outcome = RecipeOutcome::Failed { stage: err.stage() };
                    report.failures.push(err);
                    broken.insert(name);
                    halted = !self.options.keep_going;
                }
            }
            report.recipes.push(entry);
        }

        Ok(report)
    }

    /// Run every stage of one recipe in order
    fn run_pipeline(
        &self,
        recipe: &dyn Recipe,
        layout: &RecipeLayout,
        graph: &RecipeGraph<'_>,
        layouts: &HashMap<&str, RecipeLayout>,
    ) -> Result<(), StageError> {
        let dependencies: BTreeMap<&str, &RecipeLayout> = graph
            .dependencies_of(recipe.name())
            .iter()
            .filter_map(|dep| layouts.get(dep).map(|l| (*dep, l)))
            .collect();
        let ctx = StageContext::new(self.env, layout, dependencies, self.runner);

        let mut state = RecipeState::Pending;
        while let Some(stage) = state.next_stage() {
            self.emit(&BuildEvent::Stage {
                name: recipe.name(),
                stage,
            });
            self.run_stage(recipe, stage, &ctx)?;
            let Some(next) = state.advance(stage) else {
                break;
            };
            debug!("{}: {state} -> {next}", recipe.name());
            state = next;
        }
        debug_assert!(state.is_terminal());

        Ok(())
    }

    fn run_stage(
        &self,
        recipe: &dyn Recipe,
        stage: Stage,
        ctx: &StageContext<'_>,
    ) -> Result<(), StageError> {
        let name = recipe.name().to_string();
        let layout = ctx.layout;
        match stage {
            Stage::Fetch => self
                .fetch(recipe, layout)
                .map_err(|cause| StageError::Fetch { recipe: name, cause }),
            Stage::Extract => {
                if !recipe.is_archive() {
                    return Ok(());
                }
                self.sources
                    .extract(&layout.archive_path, &layout.source_dir)
                    .map_err(|cause| StageError::Extract { recipe: name, cause })
            }
            Stage::Configure => filesystem::create_dir_all(&layout.build_dir)
                .map_err(ToolError::from)
                .and_then(|()| recipe.configure(ctx))
                .map_err(|cause| StageError::Configure { recipe: name, cause }),
            Stage::Build => recipe
                .build(ctx)
                .map_err(|cause| StageError::Build { recipe: name, cause }),
            Stage::Install => filesystem::create_dir_all(&layout.install_dir)
                .map_err(ToolError::from)
                .and_then(|()| recipe.install(ctx))
                .map_err(|cause| StageError::Install { recipe: name, cause }),
        }
    }

    /// Reuse a previously downloaded file when possible, else download it
    fn fetch(&self, recipe: &dyn Recipe, layout: &RecipeLayout) -> Result<(), DownloadError> {
        let dest = &layout.archive_path;
        let pin = recipe.source_sha256();

        if dest.is_file() && !self.options.refetch {
            match pin.map(|expected| verify_checksum(dest, expected)) {
                None | Some(Ok(())) => {
                    debug!("Reusing {}", dest.display());
                    return Ok(());
                }
                Some(Err(e)) => {
                    warn!("Discarding {}: {e}", dest.display());
                    discard(dest);
                }
            }
        }

        info!("Fetching {}", recipe.source_url());
        self.sources.fetch(recipe.source_url(), dest)?;

        match pin {
            Some(expected) => {
                if let Err(e) = verify_checksum(dest, expected) {
                    discard(dest);
                    return Err(e);
                }
            }
            None if tracing::enabled!(tracing::Level::DEBUG) => {
                debug!("sha256 {} {}", sha256_file(dest)?, dest.display());
            }
            None => {}
        }
        Ok(())
    }
}

/// Delete a download that failed verification; a survivor would be
/// picked up again by the next run, so say so loudly
fn discard(path: &std::path::Path) {
    if let Err(e) = filesystem::remove_file(path) {
        warn!("{e}; delete it by hand before the next build");
    }
}
