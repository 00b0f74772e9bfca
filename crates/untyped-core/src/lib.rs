//! # untyped-core
//!
//! Core types and utilities shared across all untyped crates.
//!
//! This crate provides:
//! - `PackageRef` and `CacheKey` identity types with name normalization
//! - `PackageManifest` as served by the registry
//! - `UntypedError` enum for unified error handling
//! - Path and integrity helpers used during archive extraction
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (PackageRef, PackageManifest, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{UntypedError, UntypedResult};
pub use types::{normalize_name, parse_input, CacheKey, DistInfo, PackageManifest, PackageRef};
