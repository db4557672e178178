use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use impact_shared::ActivityDataset;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CachedDataset {
    stored_at: DateTime<Utc>,
    dataset: Arc<ActivityDataset>,
}

/// Merged dataset kept for a short TTL. Readers share the stored `Arc`; a
/// refresh swaps it instead of mutating it in place.
pub struct DatasetCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CachedDataset>>,
}

impl DatasetCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entry: RwLock::new(None),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn get(&self) -> Option<Arc<ActivityDataset>> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|cached| self.clock.now() - cached.stored_at < self.ttl)
            .map(|cached| cached.dataset.clone())
    }

    pub fn set(&self, dataset: Arc<ActivityDataset>) {
        let cached = CachedDataset {
            stored_at: self.clock.now(),
            dataset,
        };
        *self.entry.write().unwrap_or_else(PoisonError::into_inner) = Some(cached);
    }

    pub fn invalidate(&self) {
        *self.entry.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ManualClock;

    fn dataset(repo: &str) -> Arc<ActivityDataset> {
        Arc::new(ActivityDataset {
            repo: repo.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let cache = DatasetCache::new(Duration::seconds(300), clock.clone());

        assert!(cache.get().is_none());
        cache.set(dataset("acme/widgets"));
        clock.advance(Duration::seconds(299));
        assert_eq!(cache.get().unwrap().repo, "acme/widgets");

        clock.advance(Duration::seconds(1));
        assert!(cache.get().is_none());
    }

    #[test]
    fn readers_share_one_snapshot() {
        let cache = DatasetCache::new(Duration::seconds(60), Arc::new(ManualClock::default()));
        cache.set(dataset("acme/widgets"));

        let first = cache.get().unwrap();
        let second = cache.get().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalidate_drops_entry() {
        let cache = DatasetCache::new(Duration::seconds(60), Arc::new(ManualClock::default()));
        cache.set(dataset("acme/widgets"));

        cache.invalidate();

        assert!(cache.get().is_none());
    }

    #[test]
    fn set_replaces_without_touching_old_readers() {
        let cache = DatasetCache::new(Duration::seconds(60), Arc::new(ManualClock::default()));
        cache.set(dataset("old"));
        let held = cache.get().unwrap();

        cache.set(dataset("new"));

        assert_eq!(held.repo, "old");
        assert_eq!(cache.get().unwrap().repo, "new");
    }
}
