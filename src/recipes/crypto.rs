//! TLS, cryptography and big-number libraries

use crate::core::recipe::{Recipe, StageContext};
use crate::error::ToolError;
use crate::infra::filesystem::CopyFilter;
use crate::recipes::tools::{
    cmake_configure, install_headers, install_static_libs, make, make_install, msbuild,
    msvc_static_runtime,
};

/// OpenSSL, configured through its Perl scripts
#[derive(Debug, Clone)]
pub struct OpenSsl;

impl Recipe for OpenSsl {
    fn name(&self) -> &str {
        "openssl"
    }

    fn version(&self) -> &str {
        "1.1.1w"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("1")
    }

    fn source_url(&self) -> &str {
        "https://www.openssl.org/source/openssl-1.1.1w.tar.gz"
    }

    fn install_name(&self) -> &str {
        "OpenSSL"
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.copy_sources_to_build()?;
        let env = ctx.env;

        let mut cmd = if env.on_windows() {
            ctx.command("perl").args(["Configure", "VC-WIN64A"])
        } else {
            ctx.command("./config")
        };
        cmd = cmd
            .arg(format!("--prefix={}", ctx.layout.install_dir.display()))
            .arg(format!("--openssldir={}", ctx.layout.install_dir.join("ssl").display()))
            .arg(if env.is_static() { "no-shared" } else { "shared" });
        if env.is_debug() {
            cmd = cmd.arg("--debug");
        }
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            ctx.run(&ctx.command("nmake"))
        } else {
            ctx.run(&make(ctx))
        }
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let tool = if ctx.env.on_windows() { "nmake" } else { "make" };
        ctx.run(&ctx.command(tool).arg("install_sw"))
    }
}

/// Botan crypto library with the SQLite3 module enabled
#[derive(Debug, Clone)]
pub struct Botan;

impl Recipe for Botan {
    fn name(&self) -> &str {
        "botan"
    }

    fn version(&self) -> &str {
        "2.18.2"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("3")
    }

    fn source_url(&self) -> &str {
        "https://github.com/randombit/botan/archive/2.18.2.zip"
    }

    fn dependencies(&self) -> Vec<&str> {
        vec!["sqlite"]
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let sqlite = ctx.dependency("sqlite")?;
        let env = ctx.env;
        let python = if env.on_windows() { "python" } else { "python3" };

        let mut cmd = ctx
            .command(python)
            .arg(ctx.layout.source_dir.join("configure.py"))
            .args([
                "--without-documentation",
                "--with-sqlite3",
                "--disable-modules=pkcs11",
            ])
            .arg(format!("--with-external-includedir={}", sqlite.install_dir.display()))
            .arg(format!("--with-external-libdir={}", sqlite.install_dir.display()))
            .arg(format!("--prefix={}", ctx.layout.install_dir.display()));

        cmd = if env.is_static() {
            cmd.args(["--build-targets=static", "--disable-shared-library"])
        } else {
            cmd.args(["--build-targets=shared", "--enable-shared-library"])
        };

        if env.on_windows() {
            let runtime = match (env.is_static(), env.is_debug()) {
                (true, false) => "MT",
                (true, true) => "MTd",
                (false, false) => "MD",
                (false, true) => "MDd",
            };
            cmd = cmd.arg(format!("--msvc-runtime={runtime}"));
        } else if env.is_debug() {
            cmd = cmd.arg("--debug-mode");
        }
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            ctx.run(&ctx.command("nmake"))
        } else {
            ctx.run(&make(ctx))
        }
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            ctx.run(&ctx.command("nmake").arg("install"))
        } else {
            ctx.run(&make_install(ctx))
        }
    }
}

/// MPIR multiple precision arithmetic, with GMP compatibility
#[derive(Debug, Clone)]
pub struct Mpir;

impl Mpir {
    fn msvc_project(ctx: &StageContext<'_>) -> String {
        let project = if ctx.env.is_static() { "lib_mpir_gc" } else { "dll_mpir_gc" };
        format!("msvc\\vs19\\{project}\\{project}.vcxproj")
    }
}

impl Recipe for Mpir {
    fn name(&self) -> &str {
        "mpir"
    }

    fn version(&self) -> &str {
        "800bbce9f1dc17f4cffa046dbc5c230291bc974b"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("3")
    }

    fn source_url(&self) -> &str {
        "https://github.com/BrianGladman/mpir/archive/800bbce9f1dc17f4cffa046dbc5c230291bc974b.zip"
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            return ctx.copy_sources_to_build();
        }
        let cmd = ctx
            .command(&ctx.layout.source_dir.join("configure").to_string_lossy())
            .arg("--prefix")
            .arg(&ctx.layout.install_dir)
            .arg("--enable-gmpcompat");
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            let cmd = msbuild(ctx, &Self::msvc_project(ctx), ctx.env.cmake_build_type());
            ctx.run(&cmd)
        } else {
            ctx.run(&make(ctx))
        }
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if !ctx.env.on_windows() {
            return ctx.run(&make_install(ctx));
        }
        let kind = if ctx.env.is_static() { "lib" } else { "dll" };
        let output = ctx
            .layout
            .build_dir
            .join(kind)
            .join("x64")
            .join(ctx.env.cmake_build_type());
        let libs = if ctx.env.is_static() {
            CopyFilter::extensions(&["lib"])
        } else {
            CopyFilter::extensions(&["lib", "dll"])
        };
        ctx.install_files(&output, "lib", &libs, true)?;
        install_headers(ctx, &output, true)
    }
}

/// libbtc with tools, wallet and networking disabled; links against MPIR
#[derive(Debug, Clone)]
pub struct LibBtc;

impl Recipe for LibBtc {
    fn name(&self) -> &str {
        "libbtc"
    }

    fn version(&self) -> &str {
        "25e31fd32557db76fb28ce6b1ecf21ab133ffb24"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("4")
    }

    fn source_url(&self) -> &str {
        "https://github.com/sergey-chernikov/libbtc/archive/25e31fd32557db76fb28ce6b1ecf21ab133ffb24.zip"
    }

    fn dependencies(&self) -> Vec<&str> {
        vec!["mpir"]
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let mpir = ctx.dependency("mpir")?;
        let cmd = cmake_configure(ctx, &ctx.layout.source_dir)
            .args(["-DWITH_TOOLS=OFF", "-DWITH_WALLET=OFF", "-DWITH_NET=OFF"])
            .args(msvc_static_runtime(ctx.env))
            .arg(format!("-DGMP_INSTALL_DIR={}", mpir.install_dir.display()));
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            let cmd = msbuild(ctx, "libbtc.sln", ctx.env.msvc_configuration()).arg("/t:btc");
            ctx.run(&cmd)
        } else {
            ctx.run(&make(ctx))
        }
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let libs = if ctx.env.on_windows() {
            ctx.layout.build_dir.join(ctx.env.msvc_configuration())
        } else {
            ctx.layout.build_dir.clone()
        };
        install_static_libs(ctx, &libs)?;

        let source = &ctx.layout.source_dir;
        install_headers(ctx, &source.join("include"), true)?;
        install_headers(ctx, &source.join("src").join("secp256k1").join("include"), false)
    }
}

/// ChaCha20-Poly1305 AEAD
#[derive(Debug, Clone)]
pub struct LibChaCha20Poly1305;

impl Recipe for LibChaCha20Poly1305 {
    fn name(&self) -> &str {
        "libchacha20poly1305"
    }

    fn version(&self) -> &str {
        "2e8241cbcd607f4ed90e7fc932869daa7239d2a0"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("3")
    }

    fn source_url(&self) -> &str {
        "https://github.com/sergey-chernikov/chacha20poly1305/archive/2e8241cbcd607f4ed90e7fc932869daa7239d2a0.zip"
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let cmd = cmake_configure(ctx, &ctx.layout.source_dir).args(msvc_static_runtime(ctx.env));
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            let cmd = msbuild(ctx, "libchacha20poly1305.sln", ctx.env.msvc_configuration())
                .arg("/t:Build");
            ctx.run(&cmd)
        } else {
            ctx.run(&make(ctx))
        }
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let libs = if ctx.env.on_windows() {
            ctx.layout.build_dir.join(ctx.env.msvc_configuration())
        } else {
            ctx.layout.build_dir.clone()
        };
        install_static_libs(ctx, &libs)?;
        install_headers(ctx, &ctx.layout.source_dir, true)
    }
}
