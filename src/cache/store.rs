//! The collection cache: read-through per resource with invalidate-on-write.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::future::join_all;
use metrics::{counter, histogram};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::application::repos::{CollectionStore, RepoError, Row, WriteOp};
use crate::domain::resource::Resource;

use super::config::CacheConfig;
use super::entry::{CacheEntry, EntrySnapshot, Payload};
use super::lock::{rw_read, rw_write};
use super::shape::shape;

const SOURCE: &str = "cache::store";

const METRIC_CACHE_HIT: &str = "folio_cache_hit_total";
const METRIC_CACHE_MISS: &str = "folio_cache_miss_total";
const METRIC_CACHE_INVALIDATE: &str = "folio_cache_invalidate_total";
const METRIC_CACHE_FETCH_ERROR: &str = "folio_cache_fetch_error_total";
const METRIC_CACHE_FETCH_MS: &str = "folio_cache_fetch_ms";
const METRIC_CACHE_PRELOAD_MS: &str = "folio_cache_preload_ms";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to fetch `{resource}` from the store")]
    FetchFailed {
        resource: Resource,
        #[source]
        source: RepoError,
    },
    #[error("failed to write `{resource}` to the store")]
    WriteFailed {
        resource: Resource,
        #[source]
        source: RepoError,
    },
}

impl CacheError {
    pub fn resource(&self) -> Resource {
        match self {
            CacheError::FetchFailed { resource, .. } | CacheError::WriteFailed { resource, .. } => {
                *resource
            }
        }
    }

    pub fn repo_error(&self) -> &RepoError {
        match self {
            CacheError::FetchFailed { source, .. } | CacheError::WriteFailed { source, .. } => {
                source
            }
        }
    }

    pub fn into_repo_error(self) -> RepoError {
        match self {
            CacheError::FetchFailed { source, .. } | CacheError::WriteFailed { source, .. } => {
                source
            }
        }
    }
}

/// Outcome of a start-up preload. Failures are reported, never raised.
#[derive(Debug, Default)]
pub struct PreloadReport {
    pub loaded: Vec<(Resource, usize)>,
    pub failed: Vec<(Resource, String)>,
}

impl PreloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ============================================================================
// Collection cache
// ============================================================================

/// Read-through cache of the five public collections.
///
/// Each resource owns one entry behind its own lock. Locks are only held for
/// in-memory reads and swaps; store round-trips happen with no lock held, so
/// concurrent misses on the same resource each fetch independently.
pub struct CollectionCache {
    store: Arc<dyn CollectionStore>,
    freshness_window: Duration,
    entries: [RwLock<CacheEntry>; Resource::COUNT],
}

impl CollectionCache {
    pub fn new(store: Arc<dyn CollectionStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            freshness_window: config.freshness_window(),
            entries: Resource::ALL.map(|resource| RwLock::new(CacheEntry::empty(resource))),
        }
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    fn slot(&self, resource: Resource) -> &RwLock<CacheEntry> {
        &self.entries[resource.index()]
    }

    fn generation(&self, resource: Resource) -> u64 {
        rw_read(self.slot(resource), SOURCE, "generation").generation()
    }

    /// Return the shaped payload for `resource`, fetching from the store when
    /// the entry is empty or older than the freshness window.
    pub async fn get(&self, resource: Resource) -> Result<Arc<Payload>, CacheError> {
        let generation = {
            let entry = rw_read(self.slot(resource), SOURCE, "get");
            let now = Instant::now();
            if let Some(payload) = entry.fresh_payload(now, self.freshness_window) {
                counter!(METRIC_CACHE_HIT, "resource" => resource.as_str()).increment(1);
                return Ok(payload);
            }

            let reason = entry.state(now, self.freshness_window).as_str();
            counter!(
                METRIC_CACHE_MISS,
                "resource" => resource.as_str(),
                "reason" => reason
            )
            .increment(1);
            debug!(resource = %resource, reason, "Collection cache miss");
            entry.generation()
        };

        self.refresh(resource, generation).await
    }

    async fn refresh(&self, resource: Resource, generation: u64) -> Result<Arc<Payload>, CacheError> {
        let started_at = Instant::now();
        let rows = match self.store.fetch_all(resource).await {
            Ok(rows) => rows,
            Err(source) => {
                counter!(METRIC_CACHE_FETCH_ERROR, "resource" => resource.as_str()).increment(1);
                return Err(CacheError::FetchFailed { resource, source });
            }
        };
        histogram!(METRIC_CACHE_FETCH_MS, "resource" => resource.as_str())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        let payload = Arc::new(shape(resource, rows));
        self.install(resource, generation, Arc::clone(&payload));
        Ok(payload)
    }

    /// Store a fetched payload unless an invalidation happened since the fetch began.
    fn install(&self, resource: Resource, generation: u64, payload: Arc<Payload>) -> bool {
        let mut entry = rw_write(self.slot(resource), SOURCE, "install");
        if entry.generation() != generation {
            debug!(
                resource = %resource,
                started = generation,
                current = entry.generation(),
                "Discarding fetch that raced an invalidation"
            );
            return false;
        }
        entry.install(payload, Instant::now());
        true
    }

    /// Drop the cached payload so the next read goes to the store.
    pub fn invalidate(&self, resource: Resource) {
        rw_write(self.slot(resource), SOURCE, "invalidate").clear();
        counter!(METRIC_CACHE_INVALIDATE, "resource" => resource.as_str()).increment(1);
        debug!(resource = %resource, "Collection cache invalidated");
    }

    pub fn invalidate_all(&self) {
        for resource in Resource::ALL {
            self.invalidate(resource);
        }
    }

    /// Apply a mutation through the store and invalidate `resource` on success.
    ///
    /// A failed write leaves the entry untouched. A successful write never
    /// repopulates the entry; the next read does.
    pub async fn write(&self, resource: Resource, op: WriteOp) -> Result<Option<Row>, CacheError> {
        let operation = op.name();
        let row = self
            .store
            .write(resource, op)
            .await
            .map_err(|source| CacheError::WriteFailed { resource, source })?;

        self.invalidate(resource);
        info!(
            resource = %resource,
            operation,
            affected = row.is_some(),
            "Collection write applied"
        );
        Ok(row)
    }

    /// Populate every resource concurrently. Individual failures are logged
    /// and reported but never abort the other fetches.
    #[instrument(skip(self))]
    pub async fn preload(&self) -> PreloadReport {
        let started_at = Instant::now();
        let outcomes = join_all(Resource::ALL.into_iter().map(|resource| async move {
            let generation = self.generation(resource);
            (resource, self.refresh(resource, generation).await)
        }))
        .await;

        let mut report = PreloadReport::default();
        for (resource, outcome) in outcomes {
            match outcome {
                Ok(payload) => {
                    info!(resource = %resource, items = payload.len(), "Collection preloaded");
                    report.loaded.push((resource, payload.len()));
                }
                Err(err) => {
                    let reason = err.repo_error().to_string();
                    warn!(
                        resource = %resource,
                        error = %reason,
                        "Collection preload failed"
                    );
                    report.failed.push((resource, reason));
                }
            }
        }

        histogram!(METRIC_CACHE_PRELOAD_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Collection preload complete"
        );
        report
    }

    pub fn snapshot(&self, resource: Resource) -> EntrySnapshot {
        rw_read(self.slot(resource), SOURCE, "snapshot").snapshot(Instant::now(), self.freshness_window)
    }

    pub fn snapshots(&self) -> Vec<EntrySnapshot> {
        Resource::ALL
            .into_iter()
            .map(|resource| self.snapshot(resource))
            .collect()
    }
}
