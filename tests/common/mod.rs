//! Common test utilities and helpers
//!
//! Shared fixtures for integration tests: a temporary third-party tree,
//! scripted recipes, a recording tool runner and a source provider that
//! serves generated tarballs.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Mutex;

use depsmith::core::build_env::BuildEnvironment;
use depsmith::core::recipe::{Recipe, RecipeCatalog, StageContext};
use depsmith::core::revision_cache::RevisionCache;
use depsmith::error::{DownloadError, ExtractError, ToolError};
use depsmith::infra::extract::unpack_archive;
use depsmith::infra::filesystem::{self, CopyFilter};
use depsmith::infra::process::{ToolCommand, ToolRunner};
use depsmith::infra::source::SourceProvider;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

/// Temporary third-party tree with its build environment
pub struct TestTree {
    /// Temporary directory holding the tree
    pub dir: TempDir,
    /// Environment rooted at `dir`
    pub env: BuildEnvironment,
}

impl TestTree {
    /// Create a new tree in a temporary directory
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let env = BuildEnvironment::new(dir.path()).with_jobs(2);
        Self { dir, env }
    }

    /// Get the tree root
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Install directory of a recipe by install name
    pub fn install_dir(&self, install_name: &str) -> PathBuf {
        self.env.install_root().join(install_name)
    }

    /// Load the revision cache from disk
    pub fn cache(&self) -> RevisionCache {
        RevisionCache::load(&self.env.cache_path()).expect("Failed to load revision cache")
    }

    /// Write raw content to the revision cache file
    pub fn write_cache(&self, content: &str) {
        std::fs::create_dir_all(self.env.tree_dir()).expect("Failed to create tree directory");
        std::fs::write(self.env.cache_path(), content).expect("Failed to write cache");
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Recipe driving `configure`/`make`/`make install`-shaped commands.
///
/// Install copies the extracted headers and writes a marker library whose
/// content is the revision, so tests can see what got installed.
#[derive(Debug, Clone)]
pub struct ScriptedRecipe {
    name: String,
    version: String,
    patch: Option<String>,
    install_name: Option<String>,
    deps: Vec<String>,
}

impl ScriptedRecipe {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            patch: None,
            install_name: None,
            deps: Vec::new(),
        }
    }

    pub fn with_patch(mut self, patch: &str) -> Self {
        self.patch = Some(patch.to_string());
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
}

impl Recipe for ScriptedRecipe {
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
        "https://example.invalid/archive.tar.gz"
    }

    fn install_name(&self) -> &str {
        self.install_name.as_deref().unwrap_or(&self.name)
    }

    fn dependencies(&self) -> Vec<&str> {
        self.deps.iter().map(String::as_str).collect()
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let mut cmd = ctx
            .command("configure")
            .arg(&self.name)
            .arg(format!("--prefix={}", ctx.layout.install_dir.display()));
        for dep in &self.deps {
            let layout = ctx.dependency(dep)?;
            cmd = cmd.arg(format!("--with-{dep}={}", layout.install_dir.display()));
        }
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&ctx.command("make").arg(&self.name))
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&ctx.command("make").arg("install").arg(&self.name))?;
        ctx.install_files(&ctx.layout.source_dir, "include", &CopyFilter::headers(), true)?;
        let marker = ctx.layout.lib_dir().join(format!("lib{}.a", self.name));
        filesystem::write_file(&marker, &self.revision())?;
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

    pub fn fail_when(&self, pattern: &str, code: i32) {
        self.failures.lock().unwrap().push((pattern.to_string(), code));
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Commands that mention `recipe` as an argument
    pub fn commands_for(&self, recipe: &str) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.get_args().iter().any(|a| a == recipe))
            .map(ToString::to_string)
            .collect()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, command: &ToolCommand) -> Result<(), ToolError> {
        let rendered = command.to_string();
        self.commands.lock().unwrap().push(command.clone());
        let failures = self.failures.lock().unwrap();
        match failures.iter().find(|(p, _)| rendered.contains(p.as_str())) {
            Some((_, code)) => Err(ToolError::Exit {
                program: command.program().to_string(),
                code: Some(*code),
            }),
            None => Ok(()),
        }
    }
}

/// Serves a generated `<stem>/<stem>.h` tarball for every fetch and
/// unpacks with the real extractor
#[derive(Debug, Default)]
pub struct TarballSource {
    fetched: Mutex<Vec<PathBuf>>,
}

impl TarballSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Archive paths fetched so far
    pub fn fetched(&self) -> Vec<PathBuf> {
        self.fetched.lock().unwrap().clone()
    }
}

impl SourceProvider for TarballSource {
    fn fetch(&self, _url: &str, dest: &Path) -> Result<(), DownloadError> {
        let stem = dest
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.trim_end_matches(".tar.gz").to_string())
            .unwrap_or_default();
        let header = format!("{stem}.h");
        write_tarball(dest, &stem, &[(header.as_str(), "#pragma once\n")]).map_err(|e| {
            DownloadError::IoError {
                path: dest.to_path_buf(),
                error: e.to_string(),
            }
        })?;
        self.fetched.lock().unwrap().push(dest.to_path_buf());
        Ok(())
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractError> {
        unpack_archive(archive, dest)
    }
}

/// Write a `.tar.gz` whose entries all sit under `root/`
pub fn write_tarball(dest: &Path, root: &str, files: &[(&str, &str)]) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(dest)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, format!("{root}/{name}"), content.as_bytes())?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

/// OpenSSL, Jansson and CJOSE (depending on both)
pub fn tls_catalog() -> RecipeCatalog {
    let mut catalog = RecipeCatalog::new();
    catalog
        .add(Box::new(
            ScriptedRecipe::new("openssl", "1.1.1w").with_install_name("OpenSSL"),
        ))
        .expect("Failed to add openssl");
    catalog
        .add(Box::new(ScriptedRecipe::new("jansson", "2.14")))
        .expect("Failed to add jansson");
    catalog
        .add(Box::new(
            ScriptedRecipe::new("cjose", "0.6.2").with_deps(&["openssl", "jansson"]),
        ))
        .expect("Failed to add cjose");
    catalog
}

/// Run the compiled binary with an isolated config directory
pub fn run_depsmith(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_depsmith"))
        .env("DEPSMITH_CONFIG_DIR", config_dir)
        .env_remove("DEPSMITH_ROOT")
        .env_remove("DEPSMITH_JOBS")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute depsmith")
}
