//! Persistent archive cache
//!
//! Entries are keyed by [`CacheKey`] and laid out as:
//!
//! ```text
//! <root>/<key>/manifest.json
//! <root>/<key>/archive/...                 extracted tree
//! <root>/<key>/archive/.untyped-extracted  marker, holds the manifest
//! ```
//!
//! An entry with a manifest but no marker has been fetched but never
//! extracted. Entries are never invalidated automatically.

use async_trait::async_trait;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use untyped_core::error::UntypedError;
use untyped_core::types::{CacheKey, PackageManifest};

use crate::extractor::ArchiveExtractor;
use crate::CacheResult;

/// File holding the fetched manifest
pub const MANIFEST_FILE: &str = "manifest.json";
/// Directory holding the extracted archive tree
pub const ARCHIVE_DIR: &str = "archive";
/// Marker written once extraction has completed
pub const EXTRACTED_MARKER: &str = ".untyped-extracted";

/// A cached manifest and, if the archive was extracted, where it lives
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub manifest: PackageManifest,
    pub extracted_dir: Option<PathBuf>,
}

impl CacheEntry {
    pub fn is_extracted(&self) -> bool {
        self.extracted_dir.is_some()
    }
}

/// Key-value store for fetched manifests and extracted archives
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an entry; a missing entry is `Ok(None)`
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>>;

    /// Persist a manifest, replacing any previous one atomically
    async fn put_manifest(&self, key: &CacheKey, manifest: &PackageManifest) -> CacheResult<()>;

    /// Fetch and extract the archive named by `manifest`, then mark the entry extracted.
    ///
    /// Returns the extracted directory.
    async fn put_extracted_archive(&self, key: &CacheKey, manifest: &PackageManifest) -> CacheResult<PathBuf>;

    /// Whether a manifest is cached under `key`
    async fn exists(&self, key: &CacheKey) -> CacheResult<bool>;
}

/// Filesystem-backed [`CacheStore`]
#[derive(Debug, Clone)]
pub struct FsCacheStore {
    root: PathBuf,
    extractor: ArchiveExtractor,
}

impl FsCacheStore {
    pub fn new(root: impl Into<PathBuf>, extractor: ArchiveExtractor) -> Self {
        Self {
            root: root.into(),
            extractor,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_dir(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn manifest_path(&self, key: &CacheKey) -> PathBuf {
        self.entry_dir(key).join(MANIFEST_FILE)
    }

    fn archive_dir(&self, key: &CacheKey) -> PathBuf {
        self.entry_dir(key).join(ARCHIVE_DIR)
    }

    /// Remove every entry, returning how many were removed
    pub async fn clear(&self) -> CacheResult<usize> {
        clear_cache(&self.root).await
    }
}

/// Remove every entry under a cache root, returning how many were removed.
///
/// A missing root is an empty cache.
pub async fn clear_cache(root: &Path) -> CacheResult<usize> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(UntypedError::io(format!("Failed to read {}", root.display()), e)),
    };

    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| UntypedError::io(format!("Failed to read {}", root.display()), e))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| UntypedError::io(format!("Failed to stat {}", path.display()), e))?;

        let result = if file_type.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        result.map_err(|e| UntypedError::io(format!("Failed to remove {}", path.display()), e))?;
        removed += 1;
    }

    info!(root = %root.display(), removed, "Cleared cache");
    Ok(removed)
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        let path = self.manifest_path(key);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(UntypedError::io(format!("Failed to read {}", path.display()), e)),
        };

        let manifest: PackageManifest = match serde_json::from_slice(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                // Treated as a miss so the entry is fetched and rewritten
                warn!(%key, error = %e, "Ignoring unreadable cached manifest");
                return Ok(None);
            },
        };

        let archive_dir = self.archive_dir(key);
        let extracted = tokio::fs::try_exists(archive_dir.join(EXTRACTED_MARKER))
            .await
            .map_err(|e| UntypedError::io(format!("Failed to stat {}", archive_dir.display()), e))?;

        Ok(Some(CacheEntry {
            manifest,
            extracted_dir: extracted.then_some(archive_dir),
        }))
    }

    async fn put_manifest(&self, key: &CacheKey, manifest: &PackageManifest) -> CacheResult<()> {
        let content = to_json(manifest)?;
        write_atomic(self.manifest_path(key), content).await?;
        debug!(%key, "Cached manifest");
        Ok(())
    }

    async fn put_extracted_archive(&self, key: &CacheKey, manifest: &PackageManifest) -> CacheResult<PathBuf> {
        let archive_dir = self.archive_dir(key);
        let package = format!("{}@{}", manifest.name, manifest.version);

        let report = self
            .extractor
            .fetch_and_extract(&manifest.dist, &archive_dir, &package)
            .await?;

        write_atomic(archive_dir.join(EXTRACTED_MARKER), to_json(manifest)?).await?;

        info!(%key, attempts = report.attempts, files = report.stats.files, "Cached archive");
        Ok(archive_dir)
    }

    async fn exists(&self, key: &CacheKey) -> CacheResult<bool> {
        let path = self.manifest_path(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| UntypedError::io(format!("Failed to stat {}", path.display()), e))
    }
}

fn to_json(manifest: &PackageManifest) -> CacheResult<Vec<u8>> {
    serde_json::to_vec_pretty(manifest).map_err(|e| UntypedError::JsonParse {
        message: format!("Failed to serialize manifest for {}: {}", manifest.name, e),
    })
}

/// Write `content` to `path` through a temporary file in the same directory
async fn write_atomic(path: PathBuf, content: Vec<u8>) -> CacheResult<()> {
    let target = path.display().to_string();

    tokio::task::spawn_blocking(move || -> io::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&content)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| UntypedError::io("Cache write task failed".to_string(), io::Error::new(io::ErrorKind::Other, e)))?
    .map_err(|e| UntypedError::io(format!("Failed to write {}", target), e))
}
