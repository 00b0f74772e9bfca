//! Download, verify and extract package archives.
//!
//! Each attempt starts from an empty extraction directory, downloads the
//! tarball to a temporary file beside it, checks the manifest checksums and
//! unpacks it. A corrupt, truncated or mismatched archive discards whatever
//! the attempt wrote and tries again under the retry policy, so a failed
//! extraction never leaves a partial tree behind.

use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use untyped_core::error::UntypedError;
use untyped_core::types::DistInfo;
use untyped_core::utils::verify_file_integrity;
use untyped_registry::{RetryPolicy, TarballSource};

use crate::tarball::{extract_tarball, ExtractStats};
use crate::CacheResult;

/// Outcome of a successful fetch-and-extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Attempts used, including the successful one
    pub attempts: u32,
    /// Size of the archive that was finally extracted
    pub bytes: u64,
    pub stats: ExtractStats,
}

/// Fetches archives through a [`TarballSource`] and unpacks them
#[derive(Clone)]
pub struct ArchiveExtractor {
    source: Arc<dyn TarballSource>,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for ArchiveExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveExtractor")
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl ArchiveExtractor {
    pub fn new(source: Arc<dyn TarballSource>, retry_policy: RetryPolicy) -> Self {
        Self { source, retry_policy }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Fetch `dist.tarball` and extract it into `dest_dir`.
    ///
    /// `dest_dir` is owned by this call: anything already in it is removed.
    /// Filesystem failures end the call immediately; download, checksum and
    /// archive failures are retried until the policy gives up.
    pub async fn fetch_and_extract(
        &self,
        dist: &DistInfo,
        dest_dir: &Path,
        package: &str,
    ) -> CacheResult<ExtractionReport> {
        reset_dir(dest_dir).await?;

        let mut attempt = 1u32;
        loop {
            match self.attempt(dist, dest_dir, package).await {
                Ok((bytes, stats)) => {
                    debug!(package, attempt, bytes, files = stats.files, "Extracted archive");
                    return Ok(ExtractionReport {
                        attempts: attempt,
                        bytes,
                        stats,
                    });
                },
                Err(error) => {
                    reset_dir(dest_dir).await?;

                    if !error.is_recoverable() {
                        return Err(error);
                    }

                    if !self.retry_policy.allows_another(attempt) {
                        return Err(UntypedError::RetriesExhausted {
                            operation: format!("extract {}", package),
                            attempts: attempt,
                            last_error: Box::new(error),
                        });
                    }

                    let delay = self.retry_policy.delay_for(attempt);
                    warn!(package, attempt, ?delay, %error, "Archive attempt failed, discarding and retrying");
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                },
            }
        }
    }

    async fn attempt(&self, dist: &DistInfo, dest_dir: &Path, package: &str) -> CacheResult<(u64, ExtractStats)> {
        let download = download_file_beside(dest_dir)?;

        let bytes = self.source.fetch_tarball(&dist.tarball, download.path()).await?;

        let archive_path = download.path().to_path_buf();
        let dest = dest_dir.to_path_buf();
        let dist = dist.clone();
        let package = package.to_string();

        let stats = tokio::task::spawn_blocking(move || -> CacheResult<ExtractStats> {
            verify_file_integrity(&archive_path, &dist, &package)?;
            let file = std::fs::File::open(&archive_path)
                .map_err(|e| UntypedError::io(format!("Failed to open {}", archive_path.display()), e))?;
            extract_tarball(BufReader::new(file), &dest, &package)
        })
        .await
        .map_err(|e| UntypedError::io("Extraction task failed".to_string(), io::Error::new(io::ErrorKind::Other, e)))??;

        // `download` drops here and removes the temporary archive
        Ok((bytes, stats))
    }
}

/// Temporary download target in the directory that holds `dest_dir`
fn download_file_beside(dest_dir: &Path) -> CacheResult<tempfile::NamedTempFile> {
    let parent: PathBuf = dest_dir.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    tempfile::Builder::new()
        .prefix(".download-")
        .suffix(".tgz")
        .tempfile_in(&parent)
        .map_err(|e| UntypedError::io(format!("Failed to create download file in {}", parent.display()), e))
}

/// Remove `dir` and everything in it, then recreate it empty
async fn reset_dir(dir: &Path) -> CacheResult<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {},
        Err(e) if e.kind() == io::ErrorKind::NotFound => {},
        Err(e) => return Err(UntypedError::io(format!("Failed to clear {}", dir.display()), e)),
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| UntypedError::io(format!("Failed to create {}", dir.display()), e))
}
