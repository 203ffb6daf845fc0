//! Time-expiring response cache.
//!
//! Entries are evicted lazily: an entry older than the configured
//! expiration is removed when it is looked up, never by a background task.
//! Once the capacity is exceeded, the least recently used entry is dropped.
//!
//! # Example
//!
//! ```ignore
//! use networker::cache::{CacheConfig, ResponseCache};
//!
//! let cache = ResponseCache::new(CacheConfig::default());
//! cache.put("https://api.example.com/users", response);
//! assert!(cache.get("https://api.example.com/users").is_some());
//! ```

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::http::{HttpMethod, RawResponse};

/// How cache keys are derived from a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheKeyPolicy {
    /// Key by method, absolute URL and a hash of the body.
    #[default]
    MethodUrlBody,
    /// Key by absolute URL only.
    ///
    /// Different methods against the same URL share one entry, so a POST
    /// can be answered with a cached GET response.
    UrlOnly,
}

impl CacheKeyPolicy {
    /// Derive the cache key for a request.
    pub fn key(self, method: HttpMethod, url: &url::Url, body: Option<&[u8]>) -> String {
        match self {
            Self::UrlOnly => url.as_str().to_string(),
            Self::MethodUrlBody => {
                let mut hasher = DefaultHasher::new();
                body.unwrap_or_default().hash(&mut hasher);
                format!("{} {}#{:016x}", method, url, hasher.finish())
            }
        }
    }
}

/// Cache configuration.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Whether the networker consults and fills the cache.
    pub enabled: bool,
    /// Maximum age of an entry before it is treated as absent.
    pub expiration: Duration,
    /// Maximum number of entries.
    pub capacity: usize,
    /// How keys are derived from requests.
    pub key_policy: CacheKeyPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            expiration: Duration::from_secs(300),
            capacity: 100,
            key_policy: CacheKeyPolicy::default(),
        }
    }
}

/// Where a previously downloaded file was written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedDownloadLocation {
    /// The URL the file was downloaded from.
    pub url: String,
    /// The file location.
    pub destination: PathBuf,
}

/// A value stored in the cache.
#[derive(Clone, Debug, PartialEq)]
pub enum CachedValue {
    /// A complete data response.
    Response(RawResponse),
    /// The location of a finished download.
    Download(CachedDownloadLocation),
}

/// Counters for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that returned a live entry.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Entries removed on lookup because they were too old.
    pub expirations: u64,
    /// Entries removed to stay within capacity.
    pub evictions: u64,
}

struct CacheEntry {
    value: CachedValue,
    inserted_at: Instant,
    last_access: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    access_clock: u64,
    stats: CacheStats,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.access_clock += 1;
        self.access_clock
    }
}

/// A thread-safe, time-expiring cache keyed by request key strings.
pub struct ResponseCache {
    expiration: Duration,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl ResponseCache {
    /// Create a cache with the expiration and capacity from `config`.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_limits(config.expiration, config.capacity)
    }

    /// Create a cache with explicit limits.
    pub fn with_limits(expiration: Duration, capacity: usize) -> Self {
        Self {
            expiration,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// The configured expiration interval.
    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Look up a cached data response.
    pub fn get(&self, key: &str) -> Option<RawResponse> {
        self.lookup_with(key, |value| match value {
            CachedValue::Response(response) => Some(response.clone()),
            CachedValue::Download(_) => None,
        })
    }

    /// Store a data response.
    pub fn put(&self, key: impl Into<String>, response: RawResponse) {
        self.insert(key.into(), CachedValue::Response(response));
    }

    /// Look up a cached download location.
    pub fn get_download(&self, key: &str) -> Option<CachedDownloadLocation> {
        self.lookup_with(key, |value| match value {
            CachedValue::Download(location) => Some(location.clone()),
            CachedValue::Response(_) => None,
        })
    }

    /// Store a download location.
    pub fn put_download(&self, key: impl Into<String>, location: CachedDownloadLocation) {
        self.insert(key.into(), CachedValue::Download(location));
    }

    /// Look up any cached value, evicting it first if it has expired.
    pub fn lookup(&self, key: &str) -> Option<CachedValue> {
        self.lookup_with(key, |value| Some(value.clone()))
    }

    /// Live-entry lookup; `select` decides whether the stored value counts
    /// as a hit.
    fn lookup_with<T>(
        &self,
        key: &str,
        select: impl FnOnce(&CachedValue) -> Option<T>,
    ) -> Option<T> {
        let mut state = self.state.lock();
        let now = Instant::now();

        let expired = state
            .entries
            .get(key)
            .map(|entry| now.duration_since(entry.inserted_at) > self.expiration);

        match expired {
            None => {
                state.stats.misses += 1;
                return None;
            }
            Some(true) => {
                state.entries.remove(key);
                state.stats.expirations += 1;
                state.stats.misses += 1;
                tracing::debug!(target: "networker::cache", "Evicted expired entry {}", key);
                return None;
            }
            Some(false) => {}
        }

        let tick = state.tick();
        let selected = state.entries.get_mut(key).and_then(|entry| {
            let selected = select(&entry.value)?;
            entry.last_access = tick;
            Some(selected)
        });
        if selected.is_some() {
            state.stats.hits += 1;
        } else {
            state.stats.misses += 1;
        }
        selected
    }

    /// Insert or replace a value, stamping it with the current time.
    pub fn insert(&self, key: String, value: CachedValue) {
        let mut state = self.state.lock();
        let tick = state.tick();
        state.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                last_access: tick,
            },
        );

        while state.entries.len() > self.capacity {
            let Some(oldest) = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            state.entries.remove(&oldest);
            state.stats.evictions += 1;
            tracing::debug!(
                target: "networker::cache",
                "Evicted least recently used entry {}",
                oldest
            );
        }
    }

    /// Remove one entry. Returns `true` if it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// Number of stored entries, including ones that have expired but were
    /// not looked up yet.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("expiration", &self.expiration)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ResponseMetadata;

    fn response(body: &'static str) -> RawResponse {
        RawResponse::new(body, ResponseMetadata::new(200, "https://example.com"))
    }

    #[test]
    fn test_put_then_get() {
        let cache = ResponseCache::with_limits(Duration::from_secs(60), 10);
        cache.put("k", response("v"));
        assert_eq!(cache.get("k"), Some(response("v")));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_missing_key() {
        let cache = ResponseCache::default();
        assert!(cache.get("absent").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_lookup() {
        let cache = ResponseCache::with_limits(Duration::from_millis(20), 10);
        cache.put("k", response("v"));
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_live_entry_survives_short_delay() {
        let cache = ResponseCache::with_limits(Duration::from_secs(3600), 10);
        cache.put("k", response("v"));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k"), Some(response("v")));
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache = ResponseCache::with_limits(Duration::from_secs(60), 2);
        cache.put("a", response("a"));
        cache.put("b", response("b"));
        // Touch "a" so "b" becomes the least recently used.
        assert!(cache.get("a").is_some());
        cache.put("c", response("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_replace_resets_value() {
        let cache = ResponseCache::with_limits(Duration::from_secs(60), 10);
        cache.put("k", response("old"));
        cache.put("k", response("new"));
        assert_eq!(cache.get("k"), Some(response("new")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_downloads_and_responses_do_not_mix() {
        let cache = ResponseCache::with_limits(Duration::from_secs(60), 10);
        let location = CachedDownloadLocation {
            url: "https://example.com/file".to_string(),
            destination: PathBuf::from("/tmp/file"),
        };
        cache.put_download("d", location.clone());
        assert!(cache.get("d").is_none());
        assert_eq!(cache.get_download("d"), Some(location));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_key_policies() {
        let url = url::Url::parse("https://example.com/users").unwrap();
        let get = CacheKeyPolicy::MethodUrlBody.key(HttpMethod::Get, &url, None);
        let post =
            CacheKeyPolicy::MethodUrlBody.key(HttpMethod::Post, &url, Some(b"{}".as_slice()));
        let post_other =
            CacheKeyPolicy::MethodUrlBody.key(HttpMethod::Post, &url, Some(b"[]".as_slice()));
        assert_ne!(get, post);
        assert_ne!(post, post_other);

        assert_eq!(
            CacheKeyPolicy::UrlOnly.key(HttpMethod::Get, &url, None),
            CacheKeyPolicy::UrlOnly.key(HttpMethod::Post, &url, Some(b"{}".as_slice())),
        );
    }

    #[test]
    fn test_concurrent_access() {
        let cache = std::sync::Arc::new(ResponseCache::with_limits(Duration::from_secs(60), 50));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let key = format!("{t}-{i}");
                        cache.put(key.clone(), response("v"));
                        cache.get(&key);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 50);
    }
}
