use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::EvaluatorResponse;

/// Default retention for cached evaluator responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

struct CacheEntry {
    response: EvaluatorResponse,
    expires_at: Instant,
}

/// Keyed response cache with per-entry expiry, injected into the client so
/// tests never share state through a process global.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a cached response, evicting it if the TTL has lapsed.
    pub fn get(&self, key: &str) -> Option<EvaluatorResponse> {
        let mut guard = self.entries.lock().expect("cache mutex poisoned");
        match guard.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.response.clone()),
            Some(_) => {
                guard.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, response: EvaluatorResponse) {
        let mut guard = self.entries.lock().expect("cache mutex poisoned");
        guard.insert(
            key,
            CacheEntry {
                response,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
