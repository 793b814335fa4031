pub mod keys;

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;

use keys::{CandidateKey, CANDIDATE_IDS_TTL, DEFAULT_CANDIDATE_CAPACITY};

struct Entry {
    ids: Vec<String>,
    expires_at_ms: i64,
}

#[derive(Default)]
struct State {
    entries: HashMap<CandidateKey, Entry>,
    insertion_order: VecDeque<CandidateKey>,
}

impl State {
    fn forget(&mut self, key: &CandidateKey) -> Option<Entry> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.insertion_order.retain(|k| k != key);
        }
        removed
    }
}

/// Bounded, TTL-expiring store of candidate item ids shared by all learners.
///
/// Expiry is checked lazily on read. When full, the oldest inserted entry is
/// evicted regardless of how recently it was read.
pub struct CandidateCache {
    capacity: usize,
    default_ttl: Duration,
    state: Mutex<State>,
}

impl Default for CandidateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CANDIDATE_CAPACITY, CANDIDATE_IDS_TTL)
    }
}

impl CandidateCache {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            default_ttl,
            state: Mutex::new(State::default()),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &CandidateKey) -> Option<Vec<String>> {
        self.get_at(key, now_ms())
    }

    pub fn get_at(&self, key: &CandidateKey, now_ms: i64) -> Option<Vec<String>> {
        let mut state = self.state.lock();
        match state.entries.get(key) {
            None => return None,
            Some(entry) if now_ms < entry.expires_at_ms => return Some(entry.ids.clone()),
            Some(_) => {}
        }
        state.forget(key);
        tracing::trace!(key = %key, "candidate cache entry expired");
        None
    }

    pub fn insert(&self, key: CandidateKey, ids: Vec<String>, ttl: Option<Duration>) {
        self.insert_at(key, ids, ttl, now_ms());
    }

    /// Stores `ids` under `key`. Re-inserting a key counts as a fresh insertion
    /// for eviction order.
    pub fn insert_at(&self, key: CandidateKey, ids: Vec<String>, ttl: Option<Duration>, now_ms: i64) {
        let ttl_ms = i64::try_from(ttl.unwrap_or(self.default_ttl).as_millis()).unwrap_or(i64::MAX);
        let expires_at_ms = now_ms.saturating_add(ttl_ms);

        let mut state = self.state.lock();
        state.forget(&key);
        state.insertion_order.push_back(key.clone());
        state.entries.insert(key, Entry { ids, expires_at_ms });

        while state.entries.len() > self.capacity {
            let Some(oldest) = state.insertion_order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
            tracing::debug!(key = %oldest, "candidate cache evicted oldest entry");
        }
    }

    pub fn invalidate(&self, key: &CandidateKey) {
        self.state.lock().forget(key);
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.insertion_order.clear();
    }

    /// Number of stored entries, including ones that have expired but not yet been read.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
