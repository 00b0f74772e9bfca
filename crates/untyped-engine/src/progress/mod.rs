//! Progress reporting hooks for a pipeline run

use untyped_core::types::PackageRef;

use crate::pipeline::RunStats;

/// Where a classification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// A previous run's cache entry, without network access
    Cache,
    /// A freshly fetched manifest
    Manifest,
    /// A scan of the extracted archive
    Archive,
}

/// Result of processing one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Declarations are published separately; nothing was fetched
    Covered,
    Typed { source: Source },
    Untyped { source: Source },
}

impl Outcome {
    pub fn is_untyped(&self) -> bool {
        matches!(self, Outcome::Untyped { .. })
    }
}

/// Receives progress events from a pipeline run.
///
/// Events for different references arrive from concurrent tasks in
/// completion order.
pub trait ProgressObserver: Send + Sync {
    fn on_start(&self, _total: usize) {}

    fn on_complete(&self, _package: &PackageRef, _outcome: Outcome) {}

    fn on_finish(&self, _stats: &RunStats) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}
