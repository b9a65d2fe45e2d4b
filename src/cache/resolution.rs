//! Resolution cache: asset path → resolved URL, plus origin metrics.
//!
//! Read once from [`Storage`] at construction and written back after every
//! mutation. Stored state carries a schema fingerprint (format version plus
//! origin table); a mismatch discards it, so changing an origin's base URL
//! never serves URLs built from the old one.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::metrics::MetricsTable;
use super::storage::{Storage, StorageError};
use crate::config::OriginConfig;
use crate::core::{AssetPath, now_millis};
use crate::{debug, log};

/// Storage key of the `[path, url]` pair array.
pub const CACHE_KEY: &str = "cdn-cache";
/// Storage key of the per-origin metrics object.
pub const METRICS_KEY: &str = "cdn-metrics";
/// Storage key of the schema fingerprint.
pub const SCHEMA_KEY: &str = "cdn-schema";

/// Bumped whenever the stored layout changes.
const SCHEMA_VERSION: &str = "multicdn/1";

#[derive(Debug, Default)]
struct CacheState {
    entries: BTreeMap<AssetPath, String>,
    metrics: MetricsTable,
}

/// Durable resolution state shared by all resolves of one resolver.
pub struct ResolutionCache {
    storage: Arc<dyn Storage>,
    fingerprint: String,
    state: Mutex<CacheState>,
    /// Incremented by [`ResolutionCache::clear`]; resolves started before
    /// a clear must not write their outcome back.
    generation: AtomicU64,
}

/// Fingerprint of the stored layout and the origin table.
fn schema_fingerprint(config: &OriginConfig) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(SCHEMA_VERSION.as_bytes());
    for (origin, base) in &config.cdns {
        hasher.update(origin.as_bytes());
        hasher.update(&[0]);
        hasher.update(base.as_bytes());
        hasher.update(&[0]);
    }
    hex::encode(&hasher.finalize().as_bytes()[..16])
}

impl ResolutionCache {
    /// Restore state from storage. Unreadable or stale state starts empty.
    pub fn load(storage: Arc<dyn Storage>, config: &OriginConfig) -> Self {
        let fingerprint = schema_fingerprint(config);
        let state = match restore(storage.as_ref(), &fingerprint) {
            Ok(state) => state,
            Err(err) => {
                log!("cdn"; "ignoring stored resolution state: {}", err);
                CacheState::default()
            }
        };

        debug!("cdn"; "restored {} cached resolutions, {} origin metrics",
            state.entries.len(), state.metrics.len());

        Self {
            storage,
            fingerprint,
            state: Mutex::new(state),
            generation: AtomicU64::new(0),
        }
    }

    /// Cached URL for a normalized path.
    pub fn get(&self, path: &str) -> Option<String> {
        self.state.lock().entries.get(path).cloned()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Cache `path → url` unless a clear happened since `generation`.
    ///
    /// An existing entry wins over the new one; the returned URL is whatever
    /// the cache holds afterwards (or `url` when the write was skipped).
    pub fn insert(&self, path: &AssetPath, url: String, generation: u64) -> String {
        let mut state = self.state.lock();
        if self.generation() != generation {
            debug!("cdn"; "cache cleared during resolve of {}, not caching", path);
            return url;
        }
        if let Some(existing) = state.entries.get(path) {
            return existing.clone();
        }
        state.entries.insert(path.clone(), url.clone());
        self.persist_entries(&state);
        url
    }

    /// Account one settled probe of `origin`.
    pub fn record(&self, origin: &str, elapsed: Duration, success: bool) {
        let mut state = self.state.lock();
        state
            .metrics
            .entry(origin.to_owned())
            .or_default()
            .record(elapsed, success, now_millis());
        self.persist_metrics(&state);
    }

    /// Empty cache and metrics and drop their stored entries.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        state.entries.clear();
        state.metrics.clear();
        for key in [CACHE_KEY, METRICS_KEY, SCHEMA_KEY] {
            if let Err(err) = self.storage.remove(key) {
                log!("cdn"; "failed to remove `{}`: {}", key, err);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Snapshot of the per-origin metrics.
    pub fn metrics(&self) -> MetricsTable {
        self.state.lock().metrics.clone()
    }

    /// Snapshot of all cached resolutions, ordered by path.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|(path, url)| (path.to_string(), url.clone()))
            .collect()
    }

    fn persist_entries(&self, state: &CacheState) {
        let pairs: Vec<(&str, &str)> = state
            .entries
            .iter()
            .map(|(path, url)| (path.as_str(), url.as_str()))
            .collect();
        self.persist(CACHE_KEY, &pairs);
    }

    fn persist_metrics(&self, state: &CacheState) {
        self.persist(METRICS_KEY, &state.metrics);
    }

    fn persist<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(StorageError::from)
            .and_then(|json| self.storage.set(key, &json))
            .and_then(|()| self.storage.set(SCHEMA_KEY, &self.fingerprint));

        if let Err(err) = result {
            debug!("cdn"; "failed to persist `{}`: {}", key, err);
        }
    }
}

/// Read stored state, discarding it when the fingerprint differs.
fn restore(storage: &dyn Storage, fingerprint: &str) -> Result<CacheState, StorageError> {
    let stored_schema = storage.get(SCHEMA_KEY)?;
    if stored_schema.as_deref() != Some(fingerprint) {
        if stored_schema.is_some() {
            debug!("cdn"; "origin table changed, discarding stored resolutions");
        }
        storage.remove(CACHE_KEY)?;
        storage.remove(METRICS_KEY)?;
        return Ok(CacheState::default());
    }

    let mut state = CacheState::default();

    if let Some(json) = storage.get(CACHE_KEY)? {
        let pairs: Vec<(String, String)> = serde_json::from_str(&json)?;
        state.entries = pairs
            .into_iter()
            .map(|(path, url)| (AssetPath::new(&path), url))
            .collect();
    }

    if let Some(json) = storage.get(METRICS_KEY)? {
        state.metrics = serde_json::from_str(&json)?;
    }

    Ok(state)
}
