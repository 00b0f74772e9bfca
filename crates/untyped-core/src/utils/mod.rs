//! Utility functions and helpers.
//!
//! Common functionality used across multiple untyped crates.

pub mod hash;
pub mod path;

// Re-export commonly used utilities
pub use hash::{sha1_hex, sha512_integrity, verify_file_integrity, verify_integrity};
pub use path::{is_safe_path, normalize_path, safe_join};
