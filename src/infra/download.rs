//! Source archive downloads over HTTP
//!
//! Bytes are streamed into `<dest>.part` and hashed on the way through; the
//! file only takes its final name once the whole body has arrived, so an
//! interrupted run never leaves something that looks like a finished
//! archive in the downloads directory.

use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::defaults;
use crate::error::DownloadError;

/// Called with `(received, content_length)`; `content_length` is 0 when the
/// server did not send one
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// A completed download
#[derive(Debug)]
pub struct Downloaded {
    pub path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

/// HTTP client plus the retry policy applied to every request
#[derive(Debug, Clone)]
pub struct DownloadManager {
    client: reqwest::Client,
    attempts: u32,
    first_delay: Duration,
}

impl DownloadManager {
    pub fn new() -> Self {
        Self::with_config(
            defaults::MAX_DOWNLOAD_RETRIES,
            defaults::DOWNLOAD_RETRY_BASE_MS,
            defaults::DOWNLOAD_TIMEOUT_SECS,
        )
    }

    /// `attempts` is clamped to at least one request
    pub fn with_config(attempts: u32, retry_delay_ms: u64, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("depsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            attempts: attempts.max(1),
            first_delay: Duration::from_millis(retry_delay_ms),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.attempts
    }

    /// Fetch `url` into `dest`, retrying with doubling delays
    ///
    /// On failure neither `dest` nor its `.part` sibling is left behind.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<Downloaded, DownloadError> {
        let staging = part_path(dest);
        let mut delay = self.first_delay;
        let mut last = None;

        for attempt in 1..=self.attempts {
            match self.stream_to(url, &staging, progress.as_ref()).await {
                Ok((bytes, sha256)) => {
                    tokio::fs::rename(&staging, dest)
                        .await
                        .map_err(|e| io_error(dest, e))?;
                    debug!("{url}: {bytes} bytes, sha256 {sha256}");
                    return Ok(Downloaded {
                        path: dest.to_path_buf(),
                        bytes,
                        sha256,
                    });
                }
                Err(e) => {
                    warn!("{url}: attempt {attempt} of {} failed: {e}", self.attempts);
                    last = Some(e);
                    if attempt < self.attempts {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(Duration::from_millis(defaults::DOWNLOAD_RETRY_MAX_MS));
                    }
                }
            }
        }

        let _ = tokio::fs::remove_file(&staging).await;
        let _ = tokio::fs::remove_file(dest).await;
        Err(last.unwrap_or_else(|| DownloadError::MaxRetriesExceeded {
            url: url.to_string(),
            retries: self.attempts,
        }))
    }

    async fn stream_to(
        &self,
        url: &str,
        staging: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<(u64, String), DownloadError> {
        let network = |error: String| DownloadError::NetworkError {
            url: url.to_string(),
            error,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(network(format!("HTTP {status}")));
        }
        let expected_len = response.content_length().unwrap_or(0);

        if let Some(parent) = staging.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        let mut out = tokio::fs::File::create(staging)
            .await
            .map_err(|e| io_error(staging, e))?;

        let mut hasher = Sha256::new();
        let mut received = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| network(e.to_string()))?;
            out.write_all(&chunk)
                .await
                .map_err(|e| io_error(staging, e))?;
            hasher.update(&chunk);
            received += chunk.len() as u64;
            if let Some(report) = progress {
                report(received, expected_len);
            }
        }
        out.flush().await.map_err(|e| io_error(staging, e))?;

        Ok((received, hex::encode(hasher.finalize())))
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn io_error(path: &Path, e: std::io::Error) -> DownloadError {
    DownloadError::IoError {
        path: path.to_path_buf(),
        error: e.to_string(),
    }
}

fn hash_reader(mut reader: impl Read) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        match reader.read(&mut buf)? {
            0 => return Ok(hex::encode(hasher.finalize())),
            n => hasher.update(&buf[..n]),
        }
    }
}

/// Hex SHA-256 of a file on disk
pub fn sha256_file(path: &Path) -> Result<String, DownloadError> {
    std::fs::File::open(path)
        .and_then(hash_reader)
        .map_err(|e| io_error(path, e))
}

/// Compare a file against a pinned digest; hex case is ignored
pub fn verify_checksum(path: &Path, expected: &str) -> Result<(), DownloadError> {
    let actual = sha256_file(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(DownloadError::ChecksumFailed {
            file: path.display().to_string(),
            expected: expected.to_ascii_lowercase(),
            actual,
        });
    }
    Ok(())
}

/// Hex SHA-256 of an in-memory buffer
pub fn compute_checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
