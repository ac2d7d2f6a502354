use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_TTL_MS: u64 = 300_000;

/// Time source seam so expiry is testable without sleeping.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(Clone, Debug)]
struct CacheSlot<V> {
    value: V,
    written_at_ms: u64,
    ttl_ms: u64,
}

/// TTL keyed cache for fetched snapshots and derived summaries.
///
/// Entries expire lazily on access; there is no background sweep, no
/// capacity bound, and no coupling to writers. Callers invalidate after a
/// mutation. The cache is an explicitly constructed handle owned by its
/// composition root, not an ambient singleton.
#[derive(Clone, Debug)]
pub struct SnapshotCache<V, C = SystemClock> {
    entries: HashMap<String, CacheSlot<V>>,
    clock: C,
}

impl<V> SnapshotCache<V, SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<V> Default for SnapshotCache<V, SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, C: Clock> SnapshotCache<V, C> {
    pub fn with_clock(clock: C) -> Self {
        Self { entries: HashMap::new(), clock }
    }

    pub fn set(&mut self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, DEFAULT_TTL_MS);
    }

    pub fn set_with_ttl(&mut self, key: impl Into<String>, value: V, ttl_ms: u64) {
        let written_at_ms = self.clock.now_millis();
        self.entries.insert(key.into(), CacheSlot { value, written_at_ms, ttl_ms });
    }

    pub fn get(&mut self, key: &str) -> Option<&V> {
        if self.slot_expired(key) {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|slot| &slot.value)
    }

    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|slot| slot.value)
    }

    /// Remove every key containing `pattern`; with no pattern, clear all.
    pub fn invalidate(&mut self, pattern: Option<&str>) {
        match pattern {
            Some(pattern) => self.entries.retain(|key, _| !key.contains(pattern)),
            None => self.entries.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn slot_expired(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|slot| {
                self.clock.now_millis().saturating_sub(slot.written_at_ms) > slot.ttl_ms
            })
            .unwrap_or(false)
    }
}
