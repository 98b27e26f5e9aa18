//! Messaging, transport and serialization libraries

use crate::core::build_env::{BuildEnvironment, Platform};
use crate::core::recipe::{Recipe, StageContext};
use crate::error::ToolError;
use crate::infra::filesystem::CopyFilter;
use crate::recipes::tools::{
    cmake_build, cmake_configure, cmake_install, install_headers, make, make_install, msbuild,
    msvc_static_runtime,
};

/// Jansson JSON library
#[derive(Debug, Clone)]
pub struct Jansson;

impl Recipe for Jansson {
    fn name(&self) -> &str {
        "jansson"
    }

    fn version(&self) -> &str {
        "2.14"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("1")
    }

    fn source_url(&self) -> &str {
        "https://github.com/akheron/jansson/archive/refs/tags/v2.14.tar.gz"
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let cmd = cmake_configure(ctx, &ctx.layout.source_dir)
            .args(["-DJANSSON_EXAMPLES=OFF", "-DJANSSON_BUILD_DOCS=OFF"]);
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&cmake_build(ctx))
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&cmake_install(ctx))
    }
}

/// JOSE (JWT/JWS/JWE) library on top of OpenSSL and Jansson
#[derive(Debug, Clone)]
pub struct Cjose;

impl Recipe for Cjose {
    fn name(&self) -> &str {
        "cjose"
    }

    fn version(&self) -> &str {
        "3f77bc82e078c6aa15cbffa796fb2d700612ecf4"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("1")
    }

    fn source_url(&self) -> &str {
        "https://github.com/sergey-chernikov/cjose/archive/3f77bc82e078c6aa15cbffa796fb2d700612ecf4.zip"
    }

    fn dependencies(&self) -> Vec<&str> {
        vec!["openssl", "jansson"]
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let openssl = ctx.dependency("openssl")?;
        let jansson = ctx.dependency("jansson")?;
        let cmd = cmake_configure(ctx, &ctx.layout.source_dir)
            .arg(format!("-DOPENSSL_INCLUDE_DIR={}", openssl.include_dir().display()))
            .arg(format!("-DJANSSON_INCLUDE_DIR={}", jansson.include_dir().display()))
            .arg(format!(
                "-DBUILD_INCLUDES={}",
                ctx.layout.build_dir.join("include").display()
            ));
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&cmake_build(ctx))
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&cmake_install(ctx))
    }
}

/// ZeroMQ messaging library.
///
/// Windows builds use the GitHub source snapshot with CMake and msbuild;
/// elsewhere the release tarball ships a generated `configure` script.
#[derive(Debug, Clone)]
pub struct ZeroMq {
    url: String,
}

impl ZeroMq {
    const VERSION: &'static str = "4.3.4";

    pub fn new(env: &BuildEnvironment) -> Self {
        let v = Self::VERSION;
        let url = if env.on_windows() {
            format!("https://github.com/zeromq/libzmq/archive/v{v}.zip")
        } else {
            format!("https://github.com/zeromq/libzmq/releases/download/v{v}/zeromq-{v}.tar.gz")
        };
        Self { url }
    }
}

impl Recipe for ZeroMq {
    fn name(&self) -> &str {
        "zeromq"
    }

    fn version(&self) -> &str {
        Self::VERSION
    }

    fn patch_level(&self) -> Option<&str> {
        Some("4")
    }

    fn source_url(&self) -> &str {
        &self.url
    }

    fn install_name(&self) -> &str {
        "ZeroMQ"
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            let mut cmd = cmake_configure(ctx, &ctx.layout.source_dir)
                .args([
                    "-DZMQ_BUILD_TESTS=OFF",
                    "-DENABLE_DRAFTS=OFF",
                    "-DWITH_LIBSODIUM=OFF",
                ])
                .args(msvc_static_runtime(ctx.env));
            if !ctx.env.is_static() {
                cmd = cmd.arg("-DBUILD_STATIC=OFF");
            }
            return ctx.run(&cmd);
        }

        ctx.copy_sources_to_build()?;
        let cmd = ctx
            .command("./configure")
            .args([
                "--enable-libunwind=no",
                "--enable-drafts=no",
                "--without-libsodium",
                "--prefix",
            ])
            .arg(&ctx.layout.install_dir);
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            let cmd = msbuild(ctx, "ZeroMQ.sln", ctx.env.msvc_configuration()).arg("/t:libzmq");
            ctx.run(&cmd)
        } else {
            ctx.run(&make(ctx))
        }
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if !ctx.env.on_windows() {
            return ctx.run(&make_install(ctx));
        }
        let config = ctx.env.msvc_configuration();
        let build = &ctx.layout.build_dir;
        ctx.install_files(&build.join("lib").join(config), "lib", &CopyFilter::All, true)?;
        ctx.install_files(&build.join("bin").join(config), "lib", &CopyFilter::All, false)?;
        install_headers(ctx, &ctx.layout.source_dir.join("include"), true)
    }
}

/// libwebsockets with TLS through the OpenSSL recipe
#[derive(Debug, Clone)]
pub struct LibWebsockets;

impl Recipe for LibWebsockets {
    fn name(&self) -> &str {
        "libwebsockets"
    }

    fn version(&self) -> &str {
        "4.1.6"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("12")
    }

    fn source_url(&self) -> &str {
        "https://github.com/warmcat/libwebsockets/archive/v4.1.6.zip"
    }

    fn dependencies(&self) -> Vec<&str> {
        vec!["openssl"]
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let openssl = ctx.dependency("openssl")?;
        let env = ctx.env;

        let mut cmd = cmake_configure(ctx, &ctx.layout.source_dir)
            .args([
                "-DLWS_WITHOUT_SERVER=OFF",
                "-DLWS_SSL_CLIENT_USE_OS_CA_CERTS=OFF",
                "-DLWS_WITH_SSL=ON",
                "-DLWS_WITHOUT_TESTAPPS=ON",
                "-DLWS_WITHOUT_TEST_SERVER=ON",
                "-DLWS_WITHOUT_TEST_PING=ON",
                "-DLWS_WITHOUT_TEST_CLIENT=ON",
            ])
            .arg(format!("-DOPENSSL_ROOT_DIR={}", openssl.install_dir.display()))
            .args(msvc_static_runtime(env))
            // Disables a racy allocator probe in the TLS layer
            .env("CFLAGS", "-Dmalloc_usable_size=INVALID_DEFINE_TO_DISABLE_FLAG");

        if env.on_windows() {
            let (with_static, with_shared) = if env.is_static() { ("ON", "OFF") } else { ("OFF", "ON") };
            cmd = cmd
                .arg(format!("-DLWS_WITH_STATIC={with_static}"))
                .arg(format!("-DLWS_WITH_SHARED={with_shared}"))
                .env("LDFLAGS", "crypt32.Lib");
        } else {
            cmd = cmd.args(["-DLWS_WITH_STATIC=ON", "-DLWS_WITH_SHARED=ON"]);
        }
        if env.on_macos() {
            cmd = cmd.env("LDFLAGS", format!("-L{}", openssl.lib_dir().display()));
        }
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        if ctx.env.on_windows() {
            let cmd = msbuild(ctx, "libwebsockets.sln", ctx.env.msvc_configuration()).arg("/t:Build");
            ctx.run(&cmd)
        } else {
            ctx.run(&make(ctx))
        }
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&cmake_install(ctx))
    }
}

/// libcurl, HTTP only, against the OpenSSL recipe
#[derive(Debug, Clone)]
pub struct Curl;

impl Recipe for Curl {
    fn name(&self) -> &str {
        "curl"
    }

    fn version(&self) -> &str {
        "7_80_0"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("4")
    }

    fn source_url(&self) -> &str {
        "https://github.com/curl/curl/archive/curl-7_80_0.tar.gz"
    }

    fn dependencies(&self) -> Vec<&str> {
        vec!["openssl"]
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let openssl = ctx.dependency("openssl")?;
        ctx.copy_sources_to_build()?;

        let disabled = [
            "FTP", "LDAP", "LDAPS", "TELNET", "DICT", "FILE", "TFTP", "RTSP", "POP3", "IMAP",
            "GOPHER",
        ];
        let cmd = cmake_configure(ctx, &ctx.layout.build_dir)
            .args(disabled.iter().map(|p| format!("-DCURL_DISABLE_{p}=ON")))
            .args([
                "-DCMAKE_USE_OPENSSL=ON",
                "-DBUILD_SHARED_LIBS=OFF",
                "-DBUILD_CURL_EXE=OFF",
                "-DBUILD_TESTING=OFF",
            ])
            .arg(format!("-DOPENSSL_ROOT_DIR={}", openssl.install_dir.display()));
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&cmake_build(ctx))
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&cmake_install(ctx))
    }
}

/// libuv asynchronous I/O
#[derive(Debug, Clone)]
pub struct LibUv;

impl Recipe for LibUv {
    fn name(&self) -> &str {
        "libuv"
    }

    fn version(&self) -> &str {
        "1.41.0"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("2")
    }

    fn source_url(&self) -> &str {
        "https://github.com/libuv/libuv/archive/v1.41.0.tar.gz"
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let mut cmd = cmake_configure(ctx, &ctx.layout.source_dir)
            .arg("-DBUILD_TESTING=OFF")
            .args(msvc_static_runtime(ctx.env));
        if ctx.env.on_windows() {
            cmd = cmd.arg(format!(
                "-DCMAKE_CONFIGURATION_TYPES={}",
                ctx.env.cmake_build_type()
            ));
        }
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&cmake_build(ctx))
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&cmake_install(ctx))
    }
}

/// AMQP-CPP RabbitMQ client, always built as a static library
#[derive(Debug, Clone)]
pub struct AmqpCpp;

impl Recipe for AmqpCpp {
    fn name(&self) -> &str {
        "amqpcpp"
    }

    fn version(&self) -> &str {
        "4.3.14"
    }

    fn patch_level(&self) -> Option<&str> {
        Some("1")
    }

    fn source_url(&self) -> &str {
        "https://github.com/CopernicaMarketingSoftware/AMQP-CPP/archive/v4.3.14.tar.gz"
    }

    fn configure(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        let mut cmd = cmake_configure(ctx, &ctx.layout.source_dir)
            .arg("-DAMQP-CPP_BUILD_SHARED=OFF")
            .args(msvc_static_runtime(ctx.env));
        // Only Linux gets the bundled TCP module; elsewhere callers bring their own I/O
        if ctx.env.platform == Platform::Linux {
            cmd = cmd.arg("-DAMQP-CPP_LINUX_TCP=ON");
        }
        ctx.run(&cmd)
    }

    fn build(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&cmake_build(ctx))
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.run(&cmake_install(ctx))
    }
}
