//! 查询结果缓存：只持有弱引用，缓存本身从不延长结果集的生命周期。
//!
//! 命中时必须重新升级弱引用；引用失效或过期的条目视为未命中并立即移除。
//! 所有操作都不会失败，锁中毒时恢复内部数据继续工作。

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

type Erased = dyn Any + Send + Sync;

struct CacheEntry {
    value: Weak<Erased>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at && self.value.strong_count() > 0
    }
}

pub struct QueryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl QueryCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let mut entries = self.entries();
        let entry = entries.get(key)?;

        let live = if Instant::now() < entry.expires_at {
            entry.value.upgrade()
        } else {
            None
        };

        match live.and_then(|value| value.downcast::<T>().ok()) {
            Some(value) => Some(value),
            None => {
                entries.remove(key);
                None
            }
        }
    }

    /// Store a weak handle to `value`. The entry lives only while the caller keeps `value` alive.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: &Arc<T>, ttl: Duration) {
        let erased: Arc<Erased> = value.clone();
        let entry = CacheEntry {
            value: Arc::downgrade(&erased),
            expires_at: Instant::now() + ttl,
        };
        self.entries().insert(key.into(), entry);
    }

    pub fn invalidate<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut entries = self.entries();
        for key in keys {
            entries.remove(key.as_ref());
        }
    }

    /// Drop expired entries and entries whose value is gone. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
