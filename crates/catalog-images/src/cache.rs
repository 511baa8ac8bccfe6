/// Bounded, time-stamped cache of path resolutions.
///
/// Keyed by the declared path exactly as requested. Entries expire after the
/// configured TTL and the cache never grows past its capacity. Callers that know
/// the photo directories changed (a rescan, an upload) call `invalidate` or
/// `invalidate_all`; nothing else clears stale entries before they expire.
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::Resolution;

pub const DEFAULT_CAPACITY: u64 = 10_000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CachedResolution {
    pub resolution: Resolution,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ResolveCache {
    inner: Cache<String, CachedResolution>,
}

impl ResolveCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn get(&self, declared: &str) -> Option<CachedResolution> {
        self.inner.get(declared)
    }

    pub fn insert(&self, resolution: Resolution) -> CachedResolution {
        let entry = CachedResolution {
            resolution,
            resolved_at: Utc::now(),
        };
        self.inner
            .insert(entry.resolution.requested.clone(), entry.clone());
        entry
    }

    pub fn invalidate(&self, declared: &str) {
        self.inner.invalidate(declared);
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks();
    }

    /// Approximate number of live entries (pending evictions are flushed first).
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl Default for ResolveCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl std::fmt::Debug for ResolveCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveCache")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResolutionSource;

    fn resolution(path: &str) -> Resolution {
        Resolution {
            requested: path.to_string(),
            resolved: path.to_string(),
            source: ResolutionSource::Verbatim,
        }
    }

    #[test]
    fn test_insert_get_and_invalidate() {
        let cache = ResolveCache::default();
        cache.insert(resolution("/images/a.png"));
        cache.insert(resolution("/images/b.png"));

        let hit = cache.get("/images/a.png").unwrap();
        assert_eq!(hit.resolution.resolved, "/images/a.png");
        assert!(hit.resolved_at <= Utc::now());

        cache.invalidate("/images/a.png");
        assert!(cache.get("/images/a.png").is_none());
        assert!(cache.get("/images/b.png").is_some());

        cache.invalidate_all();
        assert!(cache.get("/images/b.png").is_none());
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn test_capacity_bounds_entries() {
        let cache = ResolveCache::new(8, DEFAULT_TTL);
        for i in 0..200 {
            cache.insert(resolution(&format!("/images/{i}.png")));
        }
        assert!(cache.entry_count() <= 8, "count {}", cache.entry_count());
    }

    #[test]
    fn test_ttl_expires_entries() {
        let cache = ResolveCache::new(16, Duration::from_millis(50));
        cache.insert(resolution("/images/a.png"));
        std::thread::sleep(Duration::from_millis(120));
        assert!(cache.get("/images/a.png").is_none());
    }
}
