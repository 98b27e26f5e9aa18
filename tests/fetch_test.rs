//! Integration tests for fetching real archives over HTTP
//!
//! A wiremock server stands in for upstream release hosting; the driver runs
//! on a blocking thread the way the CLI runs it.

mod common;

use std::sync::Arc;

use common::{write_tarball, RecordingRunner, TestTree};
use depsmith::core::builder::{BuildDriver, BuildReport, RecipeOutcome};
use depsmith::core::recipe::{Recipe, RecipeCatalog, Stage, StageContext};
use depsmith::core::resolver::RecipeGraph;
use depsmith::error::ToolError;
use depsmith::infra::download::{compute_checksum, DownloadManager};
use depsmith::infra::filesystem::CopyFilter;
use depsmith::infra::source::HttpSourceProvider;
use tokio::runtime::Handle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Header-only library served by the mock server
struct Served {
    url: String,
    sha256: Option<String>,
}

impl Recipe for Served {
    fn name(&self) -> &str {
        "tomlplusplus"
    }

    fn version(&self) -> &str {
        "3.4.0"
    }

    fn source_url(&self) -> &str {
        &self.url
    }

    fn source_sha256(&self) -> Option<&str> {
        self.sha256.as_deref()
    }

    fn configure(&self, _ctx: &StageContext<'_>) -> Result<(), ToolError> {
        Ok(())
    }

    fn build(&self, _ctx: &StageContext<'_>) -> Result<(), ToolError> {
        Ok(())
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), ToolError> {
        ctx.install_files(
            &ctx.layout.source_dir.join("include"),
            "include",
            &CopyFilter::headers(),
            true,
        )
    }
}

async fn serve_archive(server: &MockServer, tree: &TestTree) -> Vec<u8> {
    let archive = tree.path().join("fixture.tar.gz");
    write_tarball(
        &archive,
        "tomlplusplus-3.4.0",
        &[
            ("include/toml++/toml.hpp", "// toml"),
            ("README.md", "readme"),
        ],
    )
    .unwrap();
    let bytes = std::fs::read(&archive).unwrap();

    Mock::given(method("GET"))
        .and(path("/v3.4.0.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.clone()))
        .mount(server)
        .await;
    bytes
}

async fn build_served(tree: Arc<TestTree>, recipe: Served) -> BuildReport {
    let handle = Handle::current();
    tokio::task::spawn_blocking(move || {
        let mut catalog = RecipeCatalog::new();
        catalog.add(Box::new(recipe)).unwrap();
        let graph = RecipeGraph::resolve(&catalog, &["tomlplusplus"]).unwrap();
        let sources = HttpSourceProvider::new(DownloadManager::with_config(1, 10, 5), handle);
        let runner = RecordingRunner::new();
        let mut cache = tree.cache();
        BuildDriver::new(&tree.env, &sources, &runner)
            .run(&graph, &mut cache)
            .unwrap()
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetched_archive_is_extracted_and_installed() {
    let server = MockServer::start().await;
    let tree = Arc::new(TestTree::new());
    serve_archive(&server, &tree).await;
    let recipe = Served {
        url: format!("{}/v3.4.0.tar.gz", server.uri()),
        sha256: None,
    };

    let report = build_served(tree.clone(), recipe).await;

    assert!(report.succeeded());
    assert!(tree
        .env
        .downloads_dir()
        .join("tomlplusplus-3.4.0.tar.gz")
        .exists());
    assert!(tree
        .env
        .sources_root()
        .join("tomlplusplus-3.4.0/README.md")
        .exists());
    let header = tree.install_dir("tomlplusplus").join("include/toml++/toml.hpp");
    assert_eq!(std::fs::read_to_string(header).unwrap(), "// toml");
    assert_eq!(tree.cache().lookup("tomlplusplus"), Some("3.4.0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pinned_checksum_is_verified() {
    let server = MockServer::start().await;
    let tree = Arc::new(TestTree::new());
    let bytes = serve_archive(&server, &tree).await;
    let recipe = Served {
        url: format!("{}/v3.4.0.tar.gz", server.uri()),
        sha256: Some(compute_checksum(&bytes)),
    };

    let report = build_served(tree, recipe).await;

    assert!(report.succeeded());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_checksum_mismatch_fails_fetch_and_discards_file() {
    let server = MockServer::start().await;
    let tree = Arc::new(TestTree::new());
    serve_archive(&server, &tree).await;
    let recipe = Served {
        url: format!("{}/v3.4.0.tar.gz", server.uri()),
        sha256: Some("0".repeat(64)),
    };

    let report = build_served(tree.clone(), recipe).await;

    assert_eq!(
        report.outcome("tomlplusplus"),
        Some(&RecipeOutcome::Failed { stage: Stage::Fetch })
    );
    assert!(!tree
        .env
        .downloads_dir()
        .join("tomlplusplus-3.4.0.tar.gz")
        .exists());
    assert!(tree.cache().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_error_is_a_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let tree = Arc::new(TestTree::new());
    let recipe = Served {
        url: format!("{}/v3.4.0.tar.gz", server.uri()),
        sha256: None,
    };

    let report = build_served(tree, recipe).await;

    assert_eq!(
        report.outcome("tomlplusplus"),
        Some(&RecipeOutcome::Failed { stage: Stage::Fetch })
    );
    assert_eq!(report.failures[0].exit_code(), None);
}
