//! Recipes that install sources without compiling anything
//!
//! Configure and build are successful no-ops; install is a filtered copy of
//! (part of) the source tree.

use crate::core::recipe::{Recipe, StageContext};
use crate::error::ToolError;
use crate::infra::filesystem::CopyFilter;

/// A header-only or data-only dependency
#[derive(Debug, Clone)]
pub struct HeaderOnly {
    name: &'static str,
    version: &'static str,
    patch: Option<&'static str>,
    url: String,
    install_name: &'static str,
    /// Subdirectory of the source tree to copy, `None` for all of it
    from: Option<&'static str>,
    /// Destination below the install directory
    to: &'static str,
    /// Extension allowlist, empty for every file
    extensions: &'static [&'static str],
    archive: bool,
}

impl HeaderOnly {
    fn new(name: &'static str, version: &'static str, url: String, install_name: &'static str) -> Self {
        Self {
            name,
            version,
            patch: None,
            url,
            install_name,
            from: None,
            to: "",
            extensions: &[],
            archive: true,
        }
    }

    fn filter(&self) -> CopyFilter {
        if self.extensions.is_empty() {
            CopyFilter::All
        } else {
            CopyFilter::extensions(self.extensions)
        }
    }
}

pub fn spdlog() -> HeaderOnly {
    let version = "1.9.2";
    HeaderOnly::new(
        "spdlog",
        version,
        format!("https://github.com/gabime/spdlog/archive/v{version}.zip"),
        "SPDLog",
    )
}

/// Single-header release, fetched as a plain file
pub fn nlohmann_json() -> HeaderOnly {
    let version = "3.9.1";
    HeaderOnly {
        to: "include/nlohmann",
        archive: false,
        ..HeaderOnly::new(
            "nlohmann-json",
            version,
            format!("https://github.com/nlohmann/json/releases/download/v{version}/json.hpp"),
            "JSON",
        )
    }
}

pub fn tomlplusplus() -> HeaderOnly {
    let version = "2.3.0";
    HeaderOnly::new(
        "tomlplusplus",
        version,
        format!("https://github.com/marzer/tomlplusplus/archive/v{version}.zip"),
        "TOML",
    )
}

pub fn args() -> HeaderOnly {
    let version = "de4db870058c37b6094bc5ccb03c9ea45708c855";
    HeaderOnly::new(
        "args",
        version,
        format!("https://github.com/Taywee/args/archive/{version}.zip"),
        "Argparse",
    )
}

pub fn bips() -> HeaderOnly {
    let version = "4fb2c5290e10270c8e4a6df357fe98bfab2ddfe9";
    HeaderOnly {
        patch: Some("1"),
        ..HeaderOnly::new(
            "bips",
            version,
            format!("https://github.com/bitcoin/bips/archive/{version}.zip"),
            "bips",
        )
    }
}

/// Protocol definitions only
pub fn trezor_common() -> HeaderOnly {
    let version = "74560655e3ef2f2c29901c18ccc1e82cd1424d5b";
    HeaderOnly {
        patch: Some("4"),
        from: Some("protob"),
        extensions: &["proto"],
        ..HeaderOnly::new(
            "trezor-common",
            version,
            format!("https://github.com/trezor/trezor-common/archive/{version}.zip"),
            "trezorCommon",
        )
    }
}

impl Recipe for HeaderOnly {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> &str {
        self.version
    }

    fn patch_level(&self) -> Option<&str> {
        self.patch
    }

    fn source_url(&self) -> &str {
        &self.url
    }

    fn install_name(&self) -> &str {
        self.install_name
    }

    fn is_archive(&self) -> bool {
        self.archive
    }

    fn configure(&self, _ctx: &StageContext<'_>) -> Result<(), ToolError> {
        Ok(())
    }

    fn build(&self, _ctx: &StageContext<'_>) -> Result<(), ToolError> {
        Ok(())
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let from = match self.from {
            Some(sub) => ctx.layout.source_dir.join(sub),
            None => ctx.layout.source_dir.clone(),
        };
        ctx.install_files(&from, self.to, &self.filter(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::build_env::BuildEnvironment;
    use crate::core::recipe::RecipeLayout;
    use crate::test_utils::RecordingRunner;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn touch(path: &std::path::Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_stages_run_no_tools() {
        let temp = TempDir::new().unwrap();
        let env = BuildEnvironment::new(temp.path());
        let recipe = spdlog();
        let layout = RecipeLayout::new(&recipe, &env);
        touch(&layout.source_dir.join("include/spdlog/spdlog.h"));
        let runner = RecordingRunner::new();
        let ctx = StageContext::new(&env, &layout, BTreeMap::new(), &runner);

        recipe.configure(&ctx).unwrap();
        recipe.build(&ctx).unwrap();
        recipe.install(&ctx).unwrap();

        assert!(runner.commands().is_empty());
        assert!(layout.install_dir.join("include/spdlog/spdlog.h").exists());
        assert!(layout.install_dir.ends_with("SPDLog"));
    }

    #[test]
    fn test_trezor_common_copies_only_protos() {
        let temp = TempDir::new().unwrap();
        let env = BuildEnvironment::new(temp.path());
        let recipe = trezor_common();
        let layout = RecipeLayout::new(&recipe, &env);
        touch(&layout.source_dir.join("protob/messages.proto"));
        touch(&layout.source_dir.join("protob/build.sh"));
        touch(&layout.source_dir.join("README.md"));
        let runner = RecordingRunner::new();
        let ctx = StageContext::new(&env, &layout, BTreeMap::new(), &runner);

        recipe.install(&ctx).unwrap();

        assert!(layout.install_dir.join("messages.proto").exists());
        assert!(!layout.install_dir.join("build.sh").exists());
        assert!(!layout.install_dir.join("README.md").exists());
    }

    #[test]
    fn test_single_header_lands_in_source_dir() {
        let env = BuildEnvironment::new("/t");
        let recipe = nlohmann_json();
        let layout = RecipeLayout::new(&recipe, &env);

        assert!(!recipe.is_archive());
        assert_eq!(layout.archive_path, layout.source_dir.join("json.hpp"));
    }

    #[test]
    fn test_reinstall_overwrites() {
        let temp = TempDir::new().unwrap();
        let env = BuildEnvironment::new(temp.path());
        let recipe = args();
        let layout = RecipeLayout::new(&recipe, &env);
        touch(&layout.source_dir.join("args.hxx"));
        touch(&layout.install_dir.join("stale.hxx"));
        let runner = RecordingRunner::new();
        let ctx = StageContext::new(&env, &layout, BTreeMap::new(), &runner);

        recipe.install(&ctx).unwrap();
        recipe.install(&ctx).unwrap();

        assert!(layout.install_dir.join("args.hxx").exists());
        assert!(!layout.install_dir.join("stale.hxx").exists());
    }
}
