//! Storage, serialization and testing libraries

use crate::core::build_env::BuildEnvironment;
use crate::core::recipe::{Recipe, StageContext};
use crate::error::ToolError;
use crate::infra::filesystem::{self, CopyFilter};
use crate::recipes::tools::{
    cmake_build, cmake_configure, install_headers, install_static_libs, make, make_install,
    msbuild, msvc_static_runtime,
};

/// SQLite amalgamation, compiled in place after the copy
#[derive(Debug, Clone)]
pub struct Sqlite;

impl Recipe for Sqlite {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> &str {
        "3360000"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("1")
    }

    fn source_url(&self) -> &str {
        "https://www.sqlite.org/2021/sqlite-amalgamation-3360000.zip"
    }

    fn install_name(&self) -> &str {
        "SQLite3"
    }

    fn configure(&self, _ctx: &StageContext<'_>) -> Result<(), ToolError> {
        Ok(())
    }

    fn build(&self, _ctx: &StageContext<'_>) -> Result<(), ToolError> {
        Ok(())
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let install_dir = &ctx.layout.install_dir;
        ctx.install_files(&ctx.layout.source_dir, "", &CopyFilter::All, true)?;

        let (compile, archive) = if ctx.env.on_windows() {
            (
                ctx.command("cl").args(["sqlite3.c", "/c"]),
                ctx.command("lib").arg("sqlite3.obj"),
            )
        } else {
            (
                ctx.command("cc").args(["-c", "-o", "sqlite3.o", "sqlite3.c"]),
                ctx.command("ar").args(["rcs", "libsqlite3.a", "sqlite3.o"]),
            )
        };
        ctx.run(&compile.cwd(install_dir))?;
        ctx.run(&archive.cwd(install_dir))
    }
}

/// Protocol Buffers runtime and compiler
#[derive(Debug, Clone)]
pub struct Protobuf;

impl Recipe for Protobuf {
    fn name(&self) -> &str {
        "protobuf"
    }

    fn version(&self) -> &str {
        "3.11.4"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("4")
    }

    fn source_url(&self) -> &str {
        "https://github.com/protocolbuffers/protobuf/releases/download/v3.11.4/protobuf-cpp-3.11.4.tar.gz"
    }

    fn install_name(&self) -> &str {
        "Protobuf"
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if !ctx.env.on_windows() {
            let cmd = ctx
                .command(&ctx.layout.source_dir.join("configure").to_string_lossy())
                .arg("--prefix")
                .arg(&ctx.layout.install_dir);
            return ctx.run(&cmd);
        }

        ctx.copy_sources_to_build()?;
        let runtime = if ctx.env.is_static() { "ON" } else { "OFF" };
        let cmd = cmake_configure(ctx, &ctx.layout.source_dir.join("cmake"))
            .args(["-Dprotobuf_BUILD_TESTS=OFF", "-Dprotobuf_WITH_ZLIB=OFF"])
            .arg(format!("-Dprotobuf_MSVC_STATIC_RUNTIME={runtime}"));
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            let cmd = msbuild(ctx, "protobuf.sln", ctx.env.msvc_configuration()).arg("/t:Build");
            ctx.run(&cmd)
        } else {
            ctx.run(&make(ctx))
        }
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if !ctx.env.on_windows() {
            return ctx.run(&make_install(ctx));
        }

        let output = ctx.layout.build_dir.join(ctx.env.msvc_configuration());
        install_static_libs(ctx, &output)?;
        if ctx.env.is_debug() {
            // Consumers link against the release library name
            let lib = ctx.layout.lib_dir();
            filesystem::copy_file(&lib.join("libprotobufd.lib"), &lib.join("libprotobuf.lib"))?;
        }
        ctx.install_files(&output, "bin", &CopyFilter::extensions(&["exe"]), true)?;

        let src = ctx.layout.build_dir.join("src");
        install_headers(ctx, &src, true)?;
        ctx.install_files(&src, "include", &CopyFilter::extensions(&["inc", "proto"]), false)
    }
}

/// GoogleTest
#[derive(Debug, Clone)]
pub struct GTest {
    url: String,
}

impl GTest {
    const VERSION: &'static str = "1.11.0";

    pub fn new(env: &BuildEnvironment) -> Self {
        let ext = if env.on_windows() { "zip" } else { "tar.gz" };
        Self {
            url: format!(
                "https://github.com/google/googletest/archive/release-{}.{ext}",
                Self::VERSION
            ),
        }
    }
}

impl Recipe for GTest {
    fn name(&self) -> &str {
        "gtest"
    }

    fn version(&self) -> &str {
        Self::VERSION
    }

    fn patch_level(&self) -> Option<&str> {
        Some("2")
    }

    fn source_url(&self) -> &str {
        &self.url
    }

    fn install_name(&self) -> &str {
        "Gtest"
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let cmd = cmake_configure(ctx, &ctx.layout.source_dir)
            .arg("-DBUILD_GTEST=ON")
            .args(msvc_static_runtime(ctx.env));
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            ctx.run(&cmake_build(ctx).args(["--target", "gtest", "gtest_main"]))
        } else {
            ctx.run(&make(ctx))
        }
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let mut libs = ctx.layout.build_dir.join("lib");
        if ctx.env.on_windows() {
            libs.push(ctx.env.msvc_configuration());
        }
        install_static_libs(ctx, &libs)?;
        let headers = ctx.layout.source_dir.join("googletest").join("include");
        ctx.install_files(&headers, "include", &CopyFilter::All, true)
    }
}

/// QR code encoder
#[derive(Debug, Clone)]
pub struct LibQrEncode;

impl Recipe for LibQrEncode {
    fn name(&self) -> &str {
        "libqrencode"
    }

    fn version(&self) -> &str {
        "a50e2db8b0d223383eccf752061c8ae55497961c"
    }

    fn source_url(&self) -> &str {
        "https://github.com/fukuchi/libqrencode/archive/a50e2db8b0d223383eccf752061c8ae55497961c.zip"
    }

    fn install_name(&self) -> &str {
        "LibQREncode"
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let cmd = cmake_configure(ctx, &ctx.layout.source_dir).arg("-DWITH_TOOLS=NO");
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            let cmd = msbuild(ctx, "QREncode.sln", ctx.env.cmake_build_type()).arg("/t:qrencode");
            ctx.run(&cmd)
        } else {
            ctx.run(&make(ctx))
        }
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let libs = if ctx.env.on_windows() {
            ctx.layout.build_dir.join(ctx.env.cmake_build_type())
        } else {
            ctx.layout.build_dir.clone()
        };
        install_static_libs(ctx, &libs)?;
        install_headers(ctx, &ctx.layout.source_dir, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::build_env::Platform;
    use crate::core::recipe::RecipeLayout;
    use crate::test_utils::RecordingRunner;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_sqlite_compiles_inside_install_dir() {
        let temp = TempDir::new().unwrap();
        let env = BuildEnvironment::new(temp.path()).with_platform(Platform::Linux);
        let own = RecipeLayout::new(&Sqlite, &env);
        std::fs::create_dir_all(&own.source_dir).unwrap();
        std::fs::write(own.source_dir.join("sqlite3.c"), "").unwrap();
        std::fs::write(own.source_dir.join("sqlite3.h"), "").unwrap();
        let runner = RecordingRunner::new();
        let ctx = StageContext::new(&env, &own, BTreeMap::new(), &runner);

        Sqlite.configure(&ctx).unwrap();
        Sqlite.build(&ctx).unwrap();
        Sqlite.install(&ctx).unwrap();

        assert!(own.install_dir.join("sqlite3.h").exists());
        assert_eq!(
            runner.commands(),
            vec![
                "cc -c -o sqlite3.o sqlite3.c".to_string(),
                "ar rcs libsqlite3.a sqlite3.o".to_string(),
            ]
        );
        for cmd in runner.invocations() {
            assert_eq!(cmd.get_cwd(), Some(own.install_dir.as_path()));
        }
    }

    #[test]
    fn test_sqlite_compile_failure_fails_install() {
        let temp = TempDir::new().unwrap();
        let env = BuildEnvironment::new(temp.path()).with_platform(Platform::Linux);
        let own = RecipeLayout::new(&Sqlite, &env);
        std::fs::create_dir_all(&own.source_dir).unwrap();
        let runner = RecordingRunner::new();
        runner.fail_when("cc -c", 1);
        let ctx = StageContext::new(&env, &own, BTreeMap::new(), &runner);

        let err = Sqlite.install(&ctx).unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(runner.commands().len(), 1);
    }

    #[test]
    fn test_gtest_url_depends_on_platform() {
        let windows = BuildEnvironment::new("/t").with_platform(Platform::Windows);
        let macos = BuildEnvironment::new("/t").with_platform(Platform::Macos);
        assert!(GTest::new(&windows).source_url().ends_with(".zip"));
        assert!(GTest::new(&macos).source_url().ends_with(".tar.gz"));
    }

    #[test]
    fn test_protobuf_uses_release_configure_script_on_posix() {
        let env = BuildEnvironment::new("/t").with_platform(Platform::Linux);
        let own = RecipeLayout::new(&Protobuf, &env);
        let runner = RecordingRunner::new();
        let ctx = StageContext::new(&env, &own, BTreeMap::new(), &runner);

        Protobuf.configure(&ctx).unwrap();

        let invocation = &runner.invocations()[0];
        assert!(invocation.program().ends_with("protobuf-3.11.4/configure"));
        assert_eq!(invocation.get_cwd(), Some(own.build_dir.as_path()));
    }
}
