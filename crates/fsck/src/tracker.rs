//! Generic TTL-bounded dedup map (§3.1 `Tracker`). One instantiation backs
//! the FSCK repair dispatcher (TTL 10 min, GC 2 h); another backs the
//! balance scheduler (§4.7) with its own TTL — same data structure, two
//! configurations, not two copies of code.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct Tracker<K, V = ()> {
    entries: Mutex<HashMap<K, (Instant, V)>>,
    ttl: Duration,
}

impl<K, V> Tracker<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Tracker {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// True iff `key` was scheduled within the TTL window.
    pub fn is_tracked(&self, key: &K) -> bool {
        let entries = self.entries.lock().expect("tracker lock poisoned");
        entries
            .get(key)
            .map(|(at, _)| at.elapsed() < self.ttl)
            .unwrap_or(false)
    }

    /// Tracks `key` with `value` if it isn't already tracked within the TTL
    /// window. Returns `true` if this call newly tracked it (i.e. the
    /// caller should proceed to schedule work), `false` if it was already
    /// tracked (the caller must suppress the duplicate schedule).
    pub fn try_track(&self, key: K, value: V) -> bool {
        let mut entries = self.entries.lock().expect("tracker lock poisoned");
        if let Some((at, _)) = entries.get(&key) {
            if at.elapsed() < self.ttl {
                return false;
            }
        }
        entries.insert(key, (Instant::now(), value));
        true
    }

    /// Removes every entry older than `gc_window`. `gc_window` must exceed
    /// one cycle period plus expected repair latency (§5 shared-resource
    /// policy) so in-flight work is never GC'd out from under the tracker.
    pub fn gc(&self, gc_window: Duration) {
        let mut entries = self.entries.lock().expect("tracker lock poisoned");
        entries.retain(|_, (at, _)| at.elapsed() < gc_window);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("tracker lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_track_suppresses_duplicate_within_ttl() {
        let tracker: Tracker<u64> = Tracker::new(Duration::from_secs(600));
        assert!(tracker.try_track(42, ()));
        assert!(!tracker.try_track(42, ()));
        assert!(tracker.is_tracked(&42));
    }

    #[test]
    fn try_track_allows_rescheduling_after_ttl_elapses() {
        let tracker: Tracker<u64> = Tracker::new(Duration::from_millis(10));
        assert!(tracker.try_track(1, ()));
        std::thread::sleep(Duration::from_millis(20));
        assert!(tracker.try_track(1, ()));
    }

    #[test]
    fn gc_removes_only_entries_past_the_window() {
        let tracker: Tracker<u64> = Tracker::new(Duration::from_secs(600));
        tracker.try_track(1, ());
        std::thread::sleep(Duration::from_millis(20));
        tracker.gc(Duration::from_millis(5));
        assert_eq!(tracker.len(), 0);
    }
}
