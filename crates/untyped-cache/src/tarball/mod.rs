//! Tarball extraction utilities
//!
//! Registry archives are gzipped tarballs whose entries usually live under a
//! `package/` prefix. Extraction keeps the entry layout as-is.

pub mod extract;

// Re-export main functions
pub use extract::{extract_tarball, ExtractStats};
