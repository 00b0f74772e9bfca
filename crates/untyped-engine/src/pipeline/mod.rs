//! Detection pipeline
//!
//! Runs every input reference through coverage, cache, registry and archive
//! lookups with bounded concurrency and collects the packages that ship no
//! type declarations. The first fatal error ends the run; remaining work is
//! dropped and no report is produced.

use dashmap::DashMap;
use futures::stream::{self, StreamExt, TryStreamExt};
use indexmap::{IndexMap, IndexSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use untyped_cache::{CacheStore, CoverageIndex};
use untyped_core::types::{CacheKey, PackageManifest, PackageRef};
use untyped_registry::ManifestSource;

use crate::classify::{classify_manifest, is_typed_blocking, Classification};
use crate::progress::{NoopObserver, Outcome, ProgressObserver, Source};
use crate::EngineResult;

/// Default number of references processed at once
pub const DEFAULT_CONCURRENCY: usize = 32;

/// Counters for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// References in the input, duplicates included
    pub total: usize,
    /// Distinct references processed
    pub unique: usize,
    pub covered: usize,
    pub typed: usize,
    pub untyped: usize,
    /// Classifications made without touching the registry
    pub from_cache: usize,
    /// Manifests fetched from the registry
    pub manifests_fetched: usize,
    /// Archives downloaded and extracted
    pub archives_extracted: usize,
}

/// Result of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Names classified untyped, deduplicated, in first-seen input order
    pub untyped: Vec<String>,
    pub stats: RunStats,
}

#[derive(Default)]
struct RunCounters {
    manifests_fetched: AtomicUsize,
    archives_extracted: AtomicUsize,
}

/// Typed-package detection pipeline
pub struct Pipeline {
    coverage: Arc<dyn CoverageIndex>,
    cache: Arc<dyn CacheStore>,
    registry: Arc<dyn ManifestSource>,
    observer: Arc<dyn ProgressObserver>,
    concurrency: usize,
    /// Serializes extraction per cache key
    key_locks: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl Pipeline {
    pub fn new(
        coverage: Arc<dyn CoverageIndex>,
        cache: Arc<dyn CacheStore>,
        registry: Arc<dyn ManifestSource>,
    ) -> Self {
        Self {
            coverage,
            cache,
            registry,
            observer: Arc::new(NoopObserver),
            concurrency: DEFAULT_CONCURRENCY,
            key_locks: DashMap::new(),
        }
    }

    /// Maximum number of references in flight; at least 1
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Classify every reference and report the untyped ones
    pub async fn run(&self, refs: Vec<PackageRef>) -> EngineResult<RunReport> {
        let total = refs.len();
        let unique: IndexSet<PackageRef> = refs.into_iter().collect();
        let counters = RunCounters::default();

        info!(total, unique = unique.len(), concurrency = self.concurrency, "Starting scan");
        self.observer.on_start(unique.len());

        let outcomes: IndexMap<PackageRef, Outcome> = stream::iter(unique.iter())
            .map(|package| {
                let counters = &counters;
                async move {
                    let outcome = self.process(package, counters).await?;
                    self.observer.on_complete(package, outcome);
                    Ok::<_, untyped_core::UntypedError>((package.clone(), outcome))
                }
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        let mut stats = RunStats {
            total,
            unique: unique.len(),
            manifests_fetched: counters.manifests_fetched.load(Ordering::Relaxed),
            archives_extracted: counters.archives_extracted.load(Ordering::Relaxed),
            ..RunStats::default()
        };

        let mut untyped = IndexSet::new();
        for package in &unique {
            let Some(outcome) = outcomes.get(package) else {
                continue;
            };

            match outcome {
                Outcome::Covered => stats.covered += 1,
                Outcome::Typed { source } => {
                    stats.typed += 1;
                    stats.from_cache += usize::from(*source == Source::Cache);
                },
                Outcome::Untyped { source } => {
                    stats.untyped += 1;
                    stats.from_cache += usize::from(*source == Source::Cache);
                    untyped.insert(package.name().to_string());
                },
            }
        }

        info!(
            typed = stats.typed,
            untyped = stats.untyped,
            covered = stats.covered,
            from_cache = stats.from_cache,
            fetched = stats.manifests_fetched,
            extracted = stats.archives_extracted,
            "Scan finished"
        );
        self.observer.on_finish(&stats);

        Ok(RunReport {
            untyped: untyped.into_iter().collect(),
            stats,
        })
    }

    async fn process(&self, package: &PackageRef, counters: &RunCounters) -> EngineResult<Outcome> {
        if self.coverage.covers(&package.normalized_name()) {
            debug!(%package, "Covered by published declarations");
            return Ok(Outcome::Covered);
        }

        // Pinned refs can be answered from a previous run
        let mut cached_manifest = None;
        if package.is_pinned() {
            let key = package.cache_key();
            if let Some(entry) = self.cache.get(&key).await? {
                if let Some(classification) = classify_manifest(&entry.manifest) {
                    return Ok(self.record(package, &classification, Source::Cache));
                }
                if let Some(dir) = entry.extracted_dir {
                    let classification = is_typed_blocking(entry.manifest, Some(dir)).await?;
                    return Ok(self.record(package, &classification, Source::Cache));
                }
                cached_manifest = Some(entry.manifest);
            }
        }

        let (key, manifest) = match cached_manifest {
            Some(manifest) => (package.cache_key(), manifest),
            None => {
                let manifest = self.registry.fetch_manifest(package.name(), package.version()).await?;
                counters.manifests_fetched.fetch_add(1, Ordering::Relaxed);

                let key = if package.is_pinned() {
                    package.cache_key()
                } else {
                    package.cache_key_for(&manifest.version)?
                };
                self.cache.put_manifest(&key, &manifest).await?;

                if let Some(classification) = classify_manifest(&manifest) {
                    return Ok(self.record(package, &classification, Source::Manifest));
                }
                (key, manifest)
            },
        };

        let dir = self.extracted_dir(&key, &manifest, counters).await?;
        let classification = is_typed_blocking(manifest, Some(dir)).await?;
        Ok(self.record(package, &classification, Source::Archive))
    }

    /// Extracted archive for `key`, extracting it first if no earlier task has
    async fn extracted_dir(
        &self,
        key: &CacheKey,
        manifest: &PackageManifest,
        counters: &RunCounters,
    ) -> EngineResult<PathBuf> {
        let lock = self.key_locks.entry(key.clone()).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            self.extract_once(key, manifest, counters).await
        };

        // Last holder out removes the lock; later tasks see the marker instead
        drop(lock);
        self.key_locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn extract_once(
        &self,
        key: &CacheKey,
        manifest: &PackageManifest,
        counters: &RunCounters,
    ) -> EngineResult<PathBuf> {
        if let Some(dir) = self.cache.get(key).await?.and_then(|entry| entry.extracted_dir) {
            return Ok(dir);
        }

        let dir = self.cache.put_extracted_archive(key, manifest).await?;
        counters.archives_extracted.fetch_add(1, Ordering::Relaxed);
        Ok(dir)
    }

    #[cfg(test)]
    pub(crate) fn pending_locks(&self) -> usize {
        self.key_locks.len()
    }

    fn record(&self, package: &PackageRef, classification: &Classification, source: Source) -> Outcome {
        debug!(%package, typed = classification.typed, evidence = ?classification.evidence, ?source, "Classified");
        if classification.typed {
            Outcome::Typed { source }
        } else {
            Outcome::Untyped { source }
        }
    }
}
