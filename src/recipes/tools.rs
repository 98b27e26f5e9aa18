//! Command helpers shared by the built-in recipes
//!
//! Most recipes drive CMake; the rest use autotools-style `configure` scripts
//! with `make` on POSIX hosts and `msbuild` on Windows.

use std::path::Path;

use crate::core::build_env::BuildEnvironment;
use crate::core::recipe::StageContext;
use crate::error::ToolError;
use crate::infra::filesystem::CopyFilter;
use crate::infra::process::ToolCommand;

/// MSVC static runtime flags for the debug configuration
const MSVC_STATIC_DEBUG: &str = "/D_DEBUG /MTd /Zi /Ob0 /Od /RTC1";

/// MSVC static runtime flags for optimized configurations
const MSVC_STATIC_RELEASE: &str = "/MT /O2 /Ob2 /D NDEBUG";

/// `cmake <source>` with generator, architecture, install prefix and build type
pub fn cmake_configure(ctx: &StageContext<'_>, source: &Path) -> ToolCommand {
    let env = ctx.env;
    let mut cmd = ctx
        .command("cmake")
        .arg(source)
        .arg("-G")
        .arg(&env.generator);
    if env.on_windows() {
        cmd = cmd.args(["-A", "x64"]);
    }
    cmd.arg(format!(
        "-DCMAKE_INSTALL_PREFIX={}",
        ctx.layout.install_dir.display()
    ))
    .arg(format!("-DCMAKE_BUILD_TYPE={}", env.cmake_build_type()))
}

/// `-DCMAKE_<LANG>_FLAGS_<CONFIG>` definitions selecting the static MSVC
/// runtime. Empty unless this is a static Windows build.
pub fn msvc_static_runtime(env: &BuildEnvironment) -> Vec<String> {
    if !env.on_windows() || !env.is_static() {
        return Vec::new();
    }
    let configs: &[(&str, &str)] = if env.is_debug() {
        &[("DEBUG", MSVC_STATIC_DEBUG)]
    } else {
        &[
            ("RELEASE", MSVC_STATIC_RELEASE),
            ("RELWITHDEBINFO", MSVC_STATIC_RELEASE),
        ]
    };
    configs
        .iter()
        .flat_map(|(config, flags)| {
            ["C", "CXX"]
                .into_iter()
                .map(move |lang| format!("-DCMAKE_{lang}_FLAGS_{config}={flags}"))
        })
        .collect()
}

/// Configuration name passed to multi-config generators
fn cmake_config(env: &BuildEnvironment) -> &'static str {
    if env.on_windows() {
        env.msvc_configuration()
    } else {
        env.cmake_build_type()
    }
}

/// `cmake --build .`
pub fn cmake_build(ctx: &StageContext<'_>) -> ToolCommand {
    ctx.command("cmake")
        .args(["--build", ".", "--config"])
        .arg(cmake_config(ctx.env))
}

/// `cmake --build . --target install`
pub fn cmake_install(ctx: &StageContext<'_>) -> ToolCommand {
    cmake_build(ctx).args(["--target", "install"])
}

/// `make -j N`
pub fn make(ctx: &StageContext<'_>) -> ToolCommand {
    ctx.command("make")
        .arg("-j")
        .arg(ctx.env.jobs.to_string())
}

/// `make install`
pub fn make_install(ctx: &StageContext<'_>) -> ToolCommand {
    ctx.command("make").arg("install")
}

/// `msbuild <project> /p:Configuration=<config>`, leaving one core free
pub fn msbuild(ctx: &StageContext<'_>, project: &str, configuration: &str) -> ToolCommand {
    ctx.command("msbuild")
        .arg(project)
        .arg(format!("/p:Configuration={configuration}"))
        .arg(format!("/p:CL_MPCount={}", ctx.env.jobs.saturating_sub(1).max(1)))
}

/// Extension of static libraries on the target
pub fn static_lib_ext(env: &BuildEnvironment) -> &'static str {
    if env.on_windows() {
        "lib"
    } else {
        "a"
    }
}

/// Copy `<from>` headers into `include/`
pub fn install_headers(ctx: &StageContext<'_>, from: &Path, cleanup: bool) -> Result<(), ToolError> {
    ctx.install_files(from, "include", &CopyFilter::headers(), cleanup)
}

/// Copy static libraries found under `from` into `lib/`
pub fn install_static_libs(ctx: &StageContext<'_>, from: &Path) -> Result<(), ToolError> {
    ctx.install_files(
        from,
        "lib",
        &CopyFilter::extensions(&[static_lib_ext(ctx.env)]),
        true,
    )
}
