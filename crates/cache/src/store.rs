use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use lru::LruCache;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::lock::{rw_read, rw_write};

struct Entry<V> {
    value: V,
    tags: HashSet<String>,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

struct State<V> {
    entries: LruCache<String, Entry<V>>,
    /// tag -> keys; the reverse direction lives on each entry.
    tag_index: HashMap<String, HashSet<String>>,
    /// Bumped by every invalidation; producers started under an older
    /// generation do not store their result.
    generation: u64,
}

impl<V> State<V> {
    fn new(config: &CacheConfig) -> Self {
        Self {
            entries: LruCache::new(config.max_entries_non_zero()),
            tag_index: HashMap::new(),
            generation: 0,
        }
    }

    fn unindex(&mut self, key: &str, tags: &HashSet<String>) {
        for tag in tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
    }

    fn remove_key(&mut self, key: &str) -> Option<Entry<V>> {
        let entry = self.entries.pop(key)?;
        self.unindex(key, &entry.tags);
        Some(entry)
    }

    /// Store an entry, returning whether the least recently used one was evicted.
    fn store(
        &mut self,
        key: String,
        tags: HashSet<String>,
        value: V,
        expires_at: Option<Instant>,
    ) -> bool {
        self.remove_key(&key);

        for tag in &tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }

        let entry = Entry {
            value,
            tags,
            expires_at,
        };
        match self.entries.push(key, entry) {
            Some((evicted, entry)) => {
                self.unindex(&evicted, &entry.tags);
                true
            }
            None => false,
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    invalidations: AtomicU64,
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    /// Entries dropped because the cache was full.
    pub evictions: u64,
    pub expirations: u64,
    /// Entries dropped by tag invalidation.
    pub invalidations: u64,
}

/// Keyed result cache with tag-based bulk invalidation and an optional TTL.
pub struct ResultCache<V> {
    config: CacheConfig,
    state: RwLock<State<V>>,
    counters: Counters,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: RwLock::new(State::new(&config)),
            config,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a live entry and mark it most recently used.
    ///
    /// Expired entries are dropped on the way.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut state = rw_write(&self.state, "get");
        let expired = match state.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.remove_key(key);
            self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, "cache entry expired");
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store `value` under `key`, replacing any previous entry and its tags.
    pub fn insert(&self, key: impl Into<String>, tags: &[&str], value: V) {
        let mut state = rw_write(&self.state, "insert");
        self.store_locked(&mut state, key.into(), tags, value);
    }

    fn store_locked(&self, state: &mut State<V>, key: String, tags: &[&str], value: V) {
        let tags: HashSet<String> = tags.iter().map(|tag| tag.to_string()).collect();
        let expires_at = self.config.ttl.map(|ttl| Instant::now() + ttl);

        let evicted = state.store(key, tags, value, expires_at);

        self.counters.insertions.fetch_add(1, Ordering::Relaxed);
        if evicted {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("cache full, evicted least recently used entry");
        }
    }

    /// Return the cached value for `key`, or run `producer`, store its result
    /// under `tags`, and return it.
    ///
    /// No lock is held while the producer runs. A failing producer stores
    /// nothing, and neither does one that was overtaken by an invalidation.
    pub async fn get_or_insert_with<F, Fut, E>(
        &self,
        key: &str,
        tags: &[&str],
        producer: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            tracing::debug!(key, "cache hit");
            return Ok(value);
        }

        tracing::debug!(key, "cache miss, running producer");
        let generation = rw_read(&self.state, "get_or_insert_with.generation").generation;
        let value = producer().await?;

        let mut state = rw_write(&self.state, "get_or_insert_with.store");
        if state.generation == generation {
            self.store_locked(&mut state, key.to_string(), tags, value.clone());
        } else {
            tracing::debug!(key, "invalidated while producing, result not cached");
        }
        Ok(value)
    }

    /// Evict every entry carrying any of `tags`. Returns the number of entries removed.
    pub fn invalidate_tags(&self, tags: &[&str]) -> usize {
        let mut state = rw_write(&self.state, "invalidate_tags");
        state.generation += 1;

        let keys: HashSet<String> = tags
            .iter()
            .filter_map(|tag| state.tag_index.get(*tag))
            .flat_map(|keys| keys.iter().cloned())
            .collect();

        let removed = keys
            .iter()
            .filter(|key| state.remove_key(key).is_some())
            .count();
        drop(state);

        self.counters
            .invalidations
            .fetch_add(removed as u64, Ordering::Relaxed);
        tracing::debug!(?tags, removed, "cache tags invalidated");
        removed
    }

    /// Drop a single entry. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        rw_write(&self.state, "remove").remove_key(key).is_some()
    }

    pub fn clear(&self) {
        let mut state = rw_write(&self.state, "clear");
        state.entries.clear();
        state.tag_index.clear();
        state.generation += 1;
    }

    /// Number of stored entries, expired ones included until they are next touched.
    pub fn len(&self) -> usize {
        rw_read(&self.state, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys currently labelled with `tag`.
    pub fn tagged(&self, tag: &str) -> usize {
        rw_read(&self.state, "tagged")
            .tag_index
            .get(tag)
            .map_or(0, HashSet::len)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            insertions: self.counters.insertions.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }
}

impl<V: Clone> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    fn cache(ttl: Option<Duration>) -> ResultCache<String> {
        ResultCache::new(CacheConfig {
            ttl,
            max_entries: 16,
        })
    }

    async fn fetch(
        cache: &ResultCache<String>,
        key: &str,
        tag: &str,
        calls: &AtomicUsize,
    ) -> String {
        cache
            .get_or_insert_with(key, &[tag], || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok::<_, Infallible>(format!("{key}#{n}"))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn producer_runs_once_per_key() {
        let cache = cache(None);
        let calls = AtomicUsize::new(0);

        assert_eq!(fetch(&cache, "getAllBooks-1-3", "bookCache", &calls).await, "getAllBooks-1-3#1");
        assert_eq!(fetch(&cache, "getAllBooks-1-3", "bookCache", &calls).await, "getAllBooks-1-3#1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.insertions, 1);
    }

    #[tokio::test]
    async fn invalidating_a_tag_evicts_every_page() {
        let cache = cache(None);
        let calls = AtomicUsize::new(0);

        for key in ["getAllBooks-1-3", "getAllBooks-2-3", "getAllBooks-1-10"] {
            fetch(&cache, key, "bookCache", &calls).await;
        }
        fetch(&cache, "getAllAuthors-1-3", "authorCache", &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        assert_eq!(cache.invalidate_tags(&["bookCache"]), 3);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.tagged("bookCache"), 0);

        // Every book page is recomputed, the author page is still served.
        for key in ["getAllBooks-1-3", "getAllBooks-2-3", "getAllBooks-1-10"] {
            fetch(&cache, key, "bookCache", &calls).await;
        }
        fetch(&cache, "getAllAuthors-1-3", "authorCache", &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 7);
        assert_eq!(cache.stats().invalidations, 3);
    }

    #[tokio::test]
    async fn invalidating_multiple_tags_counts_shared_keys_once() {
        let cache = cache(None);
        cache.insert("both", &["bookCache", "authorCache"], "v".to_string());
        cache.insert("books", &["bookCache"], "v".to_string());

        assert_eq!(cache.invalidate_tags(&["bookCache", "authorCache"]), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.tagged("authorCache"), 0);
    }

    #[tokio::test]
    async fn unknown_tag_is_a_no_op() {
        let cache = cache(None);
        cache.insert("k", &["bookCache"], "v".to_string());
        assert_eq!(cache.invalidate_tags(&["nope"]), 0);
        assert_eq!(cache.get("k").as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn failed_producer_stores_nothing() {
        let cache = cache(None);
        let result: Result<String, &str> = cache
            .get_or_insert_with("k", &["bookCache"], || async { Err("db down") })
            .await;
        assert_eq!(result, Err("db down"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn reinserting_replaces_tags() {
        let cache = cache(None);
        cache.insert("k", &["bookCache"], "a".to_string());
        cache.insert("k", &["authorCache"], "b".to_string());

        assert_eq!(cache.invalidate_tags(&["bookCache"]), 0);
        assert_eq!(cache.get("k").as_deref(), Some("b"));
        assert_eq!(cache.invalidate_tags(&["authorCache"]), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = cache(Some(Duration::from_secs(180)));
        let calls = AtomicUsize::new(0);

        fetch(&cache, "getAllBooks-1-3", "bookCache", &calls).await;
        tokio::time::advance(Duration::from_secs(179)).await;
        fetch(&cache, "getAllBooks-1-3", "bookCache", &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            fetch(&cache, "getAllBooks-1-3", "bookCache", &calls).await,
            "getAllBooks-1-3#2"
        );
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_ttl_keeps_entries() {
        let cache = cache(None);
        cache.insert("k", &["bookCache"], "v".to_string());
        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert_eq!(cache.get("k").as_deref(), Some("v"));
    }

    fn bounded(max_entries: usize) -> ResultCache<u32> {
        ResultCache::new(CacheConfig {
            ttl: None,
            max_entries,
        })
    }

    #[test]
    fn least_recently_used_entry_is_evicted_when_full() {
        let cache = bounded(2);
        cache.insert("a", &["t"], 1);
        cache.insert("b", &["t"], 2);
        cache.insert("c", &["t"], 3);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.tagged("t"), 2);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn frequently_read_page_survives_eviction() {
        let cache = bounded(2);
        cache.insert("getAllBooks-1-3", &["bookCache"], 1);
        cache.insert("getAllBooks-2-3", &["bookCache"], 2);
        for _ in 0..100 {
            assert_eq!(cache.get("getAllBooks-1-3"), Some(1));
        }

        cache.insert("getAllBooks-3-3", &["bookCache"], 3);

        assert_eq!(cache.get("getAllBooks-1-3"), Some(1));
        assert_eq!(cache.get("getAllBooks-2-3"), None);
        assert_eq!(cache.tagged("bookCache"), 2);
    }

    #[test]
    fn replacing_a_key_does_not_evict() {
        let cache = bounded(2);
        cache.insert("a", &["t"], 1);
        cache.insert("b", &["t"], 2);
        cache.insert("a", &["t"], 10);

        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[tokio::test]
    async fn invalidation_during_production_discards_the_result() {
        let cache = bounded(16);
        let (release, released) = oneshot::channel::<()>();

        let fetch = cache.get_or_insert_with("getAllBooks-1-3", &["bookCache"], || async move {
            let _ = released.await;
            Ok::<_, Infallible>(1)
        });
        let write = async {
            cache.invalidate_tags(&["bookCache"]);
            let _ = release.send(());
        };
        let (fetched, ()) = tokio::join!(fetch, write);

        // The caller still gets its value, but the next reader recomputes.
        assert_eq!(fetched, Ok(1));
        assert_eq!(cache.get("getAllBooks-1-3"), None);
        assert_eq!(cache.tagged("bookCache"), 0);

        let refreshed = cache
            .get_or_insert_with("getAllBooks-1-3", &["bookCache"], || async {
                Ok::<_, Infallible>(2)
            })
            .await;
        assert_eq!(refreshed, Ok(2));
        assert_eq!(cache.get("getAllBooks-1-3"), Some(2));
    }

    #[test]
    fn remove_and_clear() {
        let cache: ResultCache<u32> = ResultCache::default();
        cache.insert("a", &["t"], 1);
        cache.insert("b", &["t"], 2);

        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert_eq!(cache.tagged("t"), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.tagged("t"), 0);
    }
}
