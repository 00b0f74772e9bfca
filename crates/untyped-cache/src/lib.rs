//! Archive cache for untyped
//!
//! This crate persists fetched manifests and extracted package archives
//! keyed by [`CacheKey`](untyped_core::CacheKey), downloads and unpacks
//! archives with integrity checks and corruption recovery, and answers
//! type-coverage lookups.

pub mod coverage;
pub mod extractor;
pub mod store;
pub mod tarball;

// Re-export main types
pub use coverage::{CoverageIndex, DirectoryCoverage, NoCoverage};
pub use extractor::{ArchiveExtractor, ExtractionReport};
pub use store::{clear_cache, CacheEntry, CacheStore, FsCacheStore};
pub use tarball::{extract_tarball, ExtractStats};

use untyped_core::error::UntypedError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, UntypedError>;
