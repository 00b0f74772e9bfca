//! Registry API seams
//!
//! The pipeline and the archive extractor talk to the registry through these
//! traits so tests and alternative transports can stand in for HTTP.

use async_trait::async_trait;
use std::path::Path;

use untyped_core::types::PackageManifest;

use crate::RegistryResult;

/// Source of per-version package manifests
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetch the manifest for `name` at `version` (a version or dist-tag)
    async fn fetch_manifest(&self, name: &str, version: &str) -> RegistryResult<PackageManifest>;
}

/// Source of package tarballs
#[async_trait]
pub trait TarballSource: Send + Sync {
    /// Stream the archive at `url` into the file at `dest` in a single attempt.
    ///
    /// Returns the number of bytes written.
    async fn fetch_tarball(&self, url: &str, dest: &Path) -> RegistryResult<u64>;
}
