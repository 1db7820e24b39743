use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::metadata::types::UrlMetadata;

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60); // 24 hours
pub const DEFAULT_CAPACITY: usize = 1024;

/// Time source for expiry checks, injectable so tests can move time forward.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    data: UrlMetadata,
    created_at: Instant,
}

/// Process-lifetime memo of finished records, keyed by the exact requested
/// URL string. Expired entries are treated as absent when read; nothing
/// sweeps them in the background.
pub struct MetadataCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl MetadataCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self::with_clock(ttl, capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
            clock,
        }
    }

    pub fn get(&self, url: &str) -> Option<UrlMetadata> {
        let now = self.clock.now();
        let entries = self.lock();
        entries
            .get(url)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.data.clone())
    }

    pub fn put(&self, url: &str, data: UrlMetadata) {
        let now = self.clock.now();
        let mut entries = self.lock();

        if !entries.contains_key(url) && entries.len() >= self.capacity {
            entries.retain(|_, entry| !self.is_expired(entry, now));

            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.created_at)
                    .map(|(key, _)| key.clone());
                if let Some(key) = oldest {
                    log::debug!("cache full, evicting {key}");
                    entries.remove(&key);
                }
            }
        }

        entries.insert(
            url.to_string(),
            CacheEntry {
                data,
                created_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.created_at) >= self.ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        // a panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap()
    }
}
