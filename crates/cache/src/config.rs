use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_TTL: Duration = Duration::from_secs(180);
const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Tuning knobs for [`ResultCache`](crate::ResultCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of an entry; `None` keeps it until invalidated or evicted.
    pub ttl: Option<Duration>,
    /// Upper bound on stored entries. Least recently used entries are evicted first.
    pub max_entries: usize,
}

impl CacheConfig {
    /// Build from a TTL in seconds, where `0` disables expiry.
    pub fn from_secs(ttl_secs: u64, max_entries: usize) -> Self {
        Self {
            ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            max_entries: max_entries.max(1),
        }
    }

    /// Capacity for the LRU store, clamped to 1.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Some(DEFAULT_TTL),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}
