// In-process cache store.
// Fallback backend used when the shared store is unreachable at startup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::key::CacheKey;

/// A cached payload with the time it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached payload.
    pub value: String,
    /// When the payload was stored (monotonic clock).
    pub stored_at: Instant,
    /// How long the payload stays live after `stored_at`.
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
            ttl,
        }
    }

    /// An entry is expired once its age reaches the TTL.
    pub fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }

    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }
}

#[derive(Debug, Default)]
struct LocalState {
    entries: HashMap<CacheKey, CacheEntry>,
    counters: HashMap<CacheKey, u64>,
}

/// Lock-protected in-memory store.
///
/// Entries and counters sit behind one mutex so a payload and its timestamp
/// are always read and written together. The lock is only held for map
/// operations, never across a fetch. Expired entries stay in the map until
/// overwritten or until [`LocalStore::purge_expired`] is called.
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    state: Arc<Mutex<LocalState>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live payload for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let state = self.state.lock();
        state
            .entries
            .get(key)
            .filter(|entry| entry.is_valid())
            .map(|entry| entry.value.clone())
    }

    /// Store `value` for `key`, replacing any previous entry.
    pub fn set_with_expiry(&self, key: &CacheKey, value: &str, ttl: Duration) {
        let entry = CacheEntry::new(value.to_string(), ttl);
        self.state.lock().entries.insert(key.clone(), entry);
    }

    /// Bump the request counter for `key` and return the new value.
    pub fn increment_counter(&self, key: &CacheKey) -> u64 {
        let mut state = self.state.lock();
        let count = state.counters.entry(key.clone()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn request_count(&self, key: &CacheKey) -> u64 {
        self.state.lock().counters.get(key).copied().unwrap_or(0)
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_valid());
        before - state.entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    #[cfg(test)]
    fn backdate(&self, key: &CacheKey, age: Duration) {
        if let Some(entry) = self.state.lock().entries.get_mut(key) {
            entry.stored_at = Instant::now().checked_sub(age).unwrap();
        }
    }
}
