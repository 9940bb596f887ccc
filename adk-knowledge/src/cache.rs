//! Time-bounded cache of rendered context strings.

use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

/// A source of wall-clock time in milliseconds.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Start the clock at `millis`.
    pub fn new(millis: i64) -> Self {
        Self { millis: AtomicI64::new(millis) }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

struct CacheEntry {
    value: String,
    timestamp: i64,
}

/// Memoizes retrieval results per question for a fixed time window.
///
/// Questions are keyed by a lowercased prefix, so long questions that share
/// the prefix share an entry. Only successful builds are stored.
pub struct ContextCache {
    ttl_ms: i64,
    key_chars: usize,
    entries: Mutex<LruCache<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ContextCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextCache")
            .field("ttl_ms", &self.ttl_ms)
            .field("key_chars", &self.key_chars)
            .finish_non_exhaustive()
    }
}

impl ContextCache {
    /// Create a cache holding at most `capacity` contexts for `ttl`.
    pub fn new(ttl: Duration, key_chars: usize, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            key_chars,
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
        }
    }

    /// The key a question is stored under.
    pub fn cache_key(&self, question: &str) -> String {
        question.to_lowercase().chars().take(self.key_chars).collect()
    }

    /// A fresh cached context for `question`, if any.
    pub async fn get(&self, question: &str) -> Option<String> {
        let key = self.cache_key(question);
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().await;
        match entries.get(&key) {
            Some(entry) if now - entry.timestamp < self.ttl_ms => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(&key);
                None
            }
            None => None,
        }
    }

    /// Store `value` for `question`, stamped with the current time.
    pub async fn insert(&self, question: &str, value: String) {
        let key = self.cache_key(question);
        let timestamp = self.clock.now_millis();
        self.entries.lock().await.put(key, CacheEntry { value, timestamp });
    }

    /// Return the cached context or build, store and return a new one.
    ///
    /// # Errors
    ///
    /// Propagates the builder's error; nothing is stored in that case.
    pub async fn get_or_build<F, Fut>(&self, question: &str, build: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(hit) = self.get(question).await {
            debug!(key = %self.cache_key(question), "context cache hit");
            return Ok(hit);
        }
        let value = build().await?;
        self.insert(question, value.clone()).await;
        Ok(value)
    }

    /// Number of stored entries, fresh or stale.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
