//! Typed-package detection engine for untyped
//!
//! This crate decides whether npm packages ship TypeScript declarations and
//! drives the concurrent pipeline that classifies a whole input list,
//! consulting the coverage index, the archive cache and the registry in
//! that order.

pub mod classify;
pub mod pipeline;
pub mod progress;

// Re-export main types
pub use classify::{classify_manifest, is_typed, scan_for_declarations, Classification, Evidence};
pub use pipeline::{Pipeline, RunReport, RunStats, DEFAULT_CONCURRENCY};
pub use progress::{NoopObserver, Outcome, ProgressObserver, Source};

use untyped_core::error::UntypedError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, UntypedError>;
