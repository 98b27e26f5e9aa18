//! Fetch and extract collaborators
//!
//! The build driver talks to the outside world for sources only through
//! [`SourceProvider`]. The default implementation downloads over HTTP with
//! [`DownloadManager`] and unpacks with [`unpack_archive`].

use std::path::Path;

use indicatif::ProgressBar;
use tokio::runtime::Handle;

use crate::error::{DownloadError, ExtractError};
use crate::infra::download::{DownloadManager, ProgressCallback};
use crate::infra::extract::unpack_archive;

/// Produces populated source directories
pub trait SourceProvider: Send + Sync {
    /// Download `url` to `dest`
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;

    /// Unpack `archive` into `dest`, replacing any previous tree
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractError>;
}

/// Creates a progress bar for a download of the given size
pub type ProgressFactory = Box<dyn Fn(&str) -> ProgressBar + Send + Sync>;

/// HTTP downloads driven from synchronous code.
///
/// Must be used from a thread that may block on the runtime, such as one
/// started with `tokio::task::spawn_blocking`.
pub struct HttpSourceProvider {
    manager: DownloadManager,
    runtime: Handle,
    progress: Option<ProgressFactory>,
}

impl HttpSourceProvider {
    pub fn new(manager: DownloadManager, runtime: Handle) -> Self {
        Self {
            manager,
            runtime,
            progress: None,
        }
    }

    /// Show a progress bar per download
    #[must_use]
    pub fn with_progress(mut self, factory: ProgressFactory) -> Self {
        self.progress = Some(factory);
        self
    }
}

impl SourceProvider for HttpSourceProvider {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());
        let bar = self.progress.as_ref().map(|factory| factory(&file_name));

        let callback: Option<ProgressCallback> = bar.clone().map(|bar| {
            Box::new(move |downloaded: u64, total: u64| {
                if total > 0 && bar.length() != Some(total) {
                    bar.set_length(total);
                }
                bar.set_position(downloaded);
            }) as ProgressCallback
        });

        let result = self
            .runtime
            .block_on(self.manager.download(url, dest, callback));

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        result.map(|_| ())
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractError> {
        unpack_archive(archive, dest)
    }
}
