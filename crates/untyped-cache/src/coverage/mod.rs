//! Type-coverage index
//!
//! A package whose declarations are published separately (one directory per
//! package in a DefinitelyTyped checkout) never needs to be fetched. Lookups
//! use the normalized name, so `@scope/pkg` is found as `scope__pkg`.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Answers whether a package has separately published declarations
pub trait CoverageIndex: Send + Sync {
    /// `normalized` is the output of [`untyped_core::normalize_name`]
    fn covers(&self, normalized: &str) -> bool;
}

/// Coverage backed by a directory with one entry per covered package
#[derive(Debug, Clone)]
pub struct DirectoryCoverage {
    root: Option<PathBuf>,
}

impl DirectoryCoverage {
    /// Open the index at `root`.
    ///
    /// A missing root is not an error: the checkout is optional, and an
    /// index without one covers nothing.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if root.is_dir() {
            debug!(root = %root.display(), "Using coverage directory");
            Self { root: Some(root) }
        } else {
            warn!(root = %root.display(), "Coverage directory not found, no package will be treated as covered");
            Self { root: None }
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl CoverageIndex for DirectoryCoverage {
    fn covers(&self, normalized: &str) -> bool {
        let Some(root) = &self.root else {
            return false;
        };

        // Only a single plain component can name an entry
        if normalized.is_empty() || normalized == "." || normalized == ".." || normalized.contains(['/', '\\']) {
            return false;
        }

        root.join(normalized).exists()
    }
}

/// Index that covers nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCoverage;

impl CoverageIndex for NoCoverage {
    fn covers(&self, _normalized: &str) -> bool {
        false
    }
}
