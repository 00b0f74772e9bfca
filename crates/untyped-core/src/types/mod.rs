//! Core data types for package classification.
//!
//! This module provides the fundamental types used throughout untyped:
//! - Package identity and cache keys
//! - Registry manifests
//! - Input snapshot parsing

pub mod input;
pub mod manifest;
pub mod package;

// Re-export all public types
pub use input::{package_ref_from_record, parse_input};
pub use manifest::{DistInfo, PackageManifest};
pub use package::{normalize_name, CacheKey, PackageRef, DEFAULT_DIST_TAG};
