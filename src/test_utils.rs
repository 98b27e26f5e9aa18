//! Test utilities for unit tests
//!
//! Scripted recipes, a recording tool runner and an in-memory source provider,
//! plus generators for proptest.

use std::path::Path;
use std::sync::Mutex;

use crate::core::recipe::{Recipe, StageContext};
use crate::error::{DownloadError, ExtractError, ToolError};
use crate::infra::filesystem;
use crate::infra::process::{ToolCommand, ToolRunner};
use crate::infra::source::SourceProvider;

/// Recipe whose stages run `mock-<stage> <name>` through the context's runner
#[derive(Debug, Clone)]
pub struct MockRecipe {
    name: String,
    version: String,
    patch: Option<String>,
    url: String,
    sha256: Option<String>,
    install_name: Option<String>,
    deps: Vec<String>,
    archive: bool,
    header_only: bool,
}

impl MockRecipe {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            patch: None,
            url: format!("https://example.com/{name}-{version}.tar.gz"),
            sha256: None,
            install_name: None,
            deps: Vec::new(),
            archive: true,
            header_only: false,
        }
    }

    pub fn with_patch(mut self, patch: &str) -> Self {
        self.patch = Some(patch.to_string());
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn with_sha256(mut self, sha256: &str) -> Self {
        self.sha256 = Some(sha256.to_string());
        self
    }

    pub fn with_install_name(mut self, name: &str) -> Self {
        self.install_name = Some(name.to_string());
        self
    }

    pub fn with_deps(mut self, deps: &[&str]) -> Self {
        self.deps = deps.iter().map(ToString::to_string).collect();
        self
    }

    pub fn not_archive(mut self) -> Self {
        self.archive = false;
        self
    }

    pub fn header_only(mut self) -> Self {
        self.header_only = true;
        self
    }
}

impl Recipe for MockRecipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn patch_level(&self) -> Option<&str> {
        self.patch.as_deref()
    }

    fn source_url(&self) -> &str {
        &self.url
    }

    fn source_sha256(&self) -> Option<&str> {
        self.sha256.as_deref()
    }

    fn install_name(&self) -> &str {
        self.install_name.as_deref().unwrap_or(&self.name)
    }

    fn dependencies(&self) -> Vec<&str> {
        self.deps.iter().map(String::as_str).collect()
    }

    fn is_archive(&self) -> bool {
        self.archive
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if self.header_only {
            return Ok(());
        }
        let mut cmd = ctx.command("mock-configure").arg(&self.name);
        for dep in &self.deps {
            let layout = ctx.dependency(dep)?;
            cmd = cmd.arg(format!("--with-{dep}={}", layout.include_dir().display()));
        }
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if self.header_only {
            return Ok(());
        }
        ctx.run(&ctx.command("mock-build").arg(&self.name))
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if !self.header_only {
            ctx.run(&ctx.command("mock-install").arg(&self.name))?;
        }
        let header = ctx.layout.include_dir().join(format!("{}.h", self.name));
        filesystem::write_file(&header, &self.revision())?;
        Ok(())
    }
}

/// Records every command; fails the ones matching a registered pattern
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<ToolCommand>>,
    failures: Mutex<Vec<(String, i32)>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any command whose rendered form contains `pattern`
    pub fn fail_when(&self, pattern: &str, code: i32) {
        self.failures
            .lock()
            .unwrap()
            .push((pattern.to_string(), code));
    }

    /// Rendered commands in execution order
    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn invocations(&self) -> Vec<ToolCommand> {
        self.commands.lock().unwrap().clone()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, command: &ToolCommand) -> Result<(), ToolError> {
        let rendered = command.to_string();
        self.commands.lock().unwrap().push(command.clone());
        let failures = self.failures.lock().unwrap();
        match failures.iter().find(|(pattern, _)| rendered.contains(pattern.as_str())) {
            Some((_, code)) => Err(ToolError::Exit {
                program: command.program().to_string(),
                code: Some(*code),
            }),
            None => Ok(()),
        }
    }
}

/// Source provider that writes placeholder files instead of downloading
#[derive(Debug, Default)]
pub struct FakeSource {
    calls: Mutex<Vec<String>>,
    failing_urls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_url(&self, url: &str) {
        self.failing_urls.lock().unwrap().push(url.to_string());
    }

    /// `fetch <url>` and `extract <file name>` entries in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl SourceProvider for FakeSource {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        self.calls.lock().unwrap().push(format!("fetch {url}"));
        if self.failing_urls.lock().unwrap().iter().any(|u| u == url) {
            return Err(DownloadError::NetworkError {
                url: url.to_string(),
                error: "connection refused".to_string(),
            });
        }
        filesystem::write_file(dest, url).map_err(|e| DownloadError::IoError {
            path: dest.to_path_buf(),
            error: e.to_string(),
        })
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractError> {
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(format!("extract {file_name}"));
        filesystem::remove_dir_all(dest)
            .and_then(|()| filesystem::write_file(&dest.join("CMakeLists.txt"), &file_name))
            .map_err(|e| ExtractError::IoError {
                path: dest.to_path_buf(),
                error: e.to_string(),
            })
    }
}

pub mod generators {
    use proptest::prelude::*;

    /// Generate a valid recipe name (lowercase alphanumeric with hyphens)
    pub fn recipe_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,20}[a-z0-9]?".prop_filter("Name must not be empty", |s| !s.is_empty())
    }

    /// Generate a revision string such as `1.2.3` or `1.2.3-4`
    pub fn revision() -> impl Strategy<Value = String> {
        (1u32..100, 0u32..100, 0u32..100, proptest::option::of(1u32..10)).prop_map(
            |(major, minor, patch, local)| match local {
                Some(local) => format!("{major}.{minor}.{patch}-{local}"),
                None => format!("{major}.{minor}.{patch}"),
            },
        )
    }

    /// Generate an acyclic dependency graph as `(name, deps)` pairs.
    ///
    /// Recipe `i` may only depend on recipes with a smaller index, which
    /// rules out cycles; the list is then shuffled by the caller's request.
    pub fn acyclic_graph(max: usize) -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
        (1..=max).prop_flat_map(|n| {
            proptest::collection::vec(proptest::collection::vec(any::<prop::sample::Index>(), 0..4), n)
                .prop_map(move |edges| {
                    edges
                        .into_iter()
                        .enumerate()
                        .map(|(i, picks)| {
                            let mut deps: Vec<String> = if i == 0 {
                                Vec::new()
                            } else {
                                picks.iter().map(|p| format!("r{}", p.index(i))).collect()
                            };
                            deps.sort();
                            deps.dedup();
                            (format!("r{i}"), deps)
                        })
                        .collect()
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_recipe_name_generator(name in recipe_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().next().unwrap().is_ascii_lowercase());
        }

        #[test]
        fn test_acyclic_graph_only_points_backwards(graph in acyclic_graph(8)) {
            for (i, (_, deps)) in graph.iter().enumerate() {
                for dep in deps {
                    let j: usize = dep[1..].parse().unwrap();
                    prop_assert!(j < i);
                }
            }
        }
    }
}
