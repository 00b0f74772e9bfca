//! Tarball extraction functionality
//!
//! This module provides safe tarball extraction with path validation
//! to prevent directory traversal attacks. Failures while reading the
//! archive stream are reported as corruption so the caller can discard
//! the partial tree and fetch again; failures writing to the destination
//! are filesystem errors.

use flate2::read::GzDecoder;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::trace;

use untyped_core::error::UntypedError;
use untyped_core::utils::safe_join;

use crate::CacheResult;

/// Counts of what an extraction produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub files: usize,
    pub directories: usize,
    /// Symlinks, hard links and special files, which are never written
    pub skipped: usize,
}

/// Extract a gzipped tarball to a destination directory.
///
/// Only regular files and directories are materialized. Every write lands
/// in a directory whose canonical path is inside the canonical `dest_dir`.
pub fn extract_tarball<R: Read>(reader: R, dest_dir: &Path, package: &str) -> CacheResult<ExtractStats> {
    let corrupt = |e: io::Error| UntypedError::corrupt(package, e.to_string());

    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut stats = ExtractStats::default();

    create_dir(dest_dir)?;
    let root = canonical(dest_dir)?;

    for entry_result in archive.entries().map_err(corrupt)? {
        let mut entry = entry_result.map_err(corrupt)?;

        let entry_path = entry.path().map_err(corrupt)?.into_owned();
        // An escaping entry makes the whole archive corrupt
        let safe_path =
            safe_join(&root, &entry_path).map_err(|e| UntypedError::corrupt(package, e.to_string()))?;

        match entry.header().entry_type() {
            EntryType::Regular | EntryType::Continuous => {
                extract_regular_file(&mut entry, &root, &safe_path, package)?;
                stats.files += 1;
            },
            EntryType::Directory => {
                create_contained_dir(&root, &safe_path, package)?;
                stats.directories += 1;
            },
            other => {
                // Links, devices and fifos carry nothing a declaration scan needs
                trace!(path = %entry_path.display(), ?other, "Skipping tar entry");
                stats.skipped += 1;
            },
        }
    }

    Ok(stats)
}

fn create_dir(path: &Path) -> CacheResult<()> {
    fs::create_dir_all(path).map_err(|e| UntypedError::io(format!("Failed to create {}", path.display()), e))
}

fn canonical(path: &Path) -> CacheResult<PathBuf> {
    fs::canonicalize(path).map_err(|e| UntypedError::io(format!("Failed to resolve {}", path.display()), e))
}

/// Create `dir` and check that it resolves inside `root`
fn create_contained_dir(root: &Path, dir: &Path, package: &str) -> CacheResult<()> {
    create_dir(dir)?;
    let resolved = canonical(dir)?;
    if !resolved.starts_with(root) {
        return Err(UntypedError::corrupt(
            package,
            format!("entry {} resolves outside the archive root", dir.display()),
        ));
    }
    Ok(())
}

/// Extract a regular file from tar entry
fn extract_regular_file<R: Read>(
    entry: &mut tar::Entry<R>,
    root: &Path,
    dest_path: &Path,
    package: &str,
) -> CacheResult<()> {
    if let Some(parent) = dest_path.parent() {
        create_contained_dir(root, parent, package)?;
    }

    // An existing link at the target would redirect the write
    if fs::symlink_metadata(dest_path).map_or(false, |meta| !meta.is_file()) {
        return Err(UntypedError::corrupt(
            package,
            format!("entry {} replaces a non-file", dest_path.display()),
        ));
    }

    // Stream extraction without loading into memory
    let mut file = fs::File::create(dest_path)
        .map_err(|e| UntypedError::io(format!("Failed to create {}", dest_path.display()), e))?;

    // A short read here is a truncated archive
    io::copy(entry, &mut file).map_err(|e| UntypedError::corrupt(package, e.to_string()))?;

    Ok(())
}
