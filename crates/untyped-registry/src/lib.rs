//! npm registry client for untyped
//!
//! This crate fetches per-version package manifests and tarballs from the
//! npm registry. Manifest fetches run under a bounded [`RetryPolicy`];
//! tarball downloads are single attempts so the archive extractor can own
//! its corruption-recovery loop.

pub mod api;
pub mod client;
pub mod retry;

// Re-export main types
pub use api::{ManifestSource, TarballSource};
pub use client::{ClientConfig, RegistryClient, DEFAULT_REGISTRY};
pub use retry::RetryPolicy;

use untyped_core::error::UntypedError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, UntypedError>;
