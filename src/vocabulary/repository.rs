use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::VocabularyConfig;
use crate::store::StoreError;
use crate::vocabulary::query_cache::QueryCache;
use crate::vocabulary::types::{LearnedState, Topic, Word};

/// Shared, immutable query result. The query cache only holds weak handles to it.
pub type WordList = Arc<Vec<Word>>;

/// Durable collection of word records.
#[async_trait]
pub trait WordStore: Send + Sync {
    async fn any_words(&self) -> Result<bool, StoreError>;

    async fn words_not_learned_by_topic(
        &self,
        topic: Topic,
        limit: usize,
    ) -> Result<WordList, StoreError>;

    /// `Ok(false)` when no word has this id.
    async fn set_word_learned(&self, id: Uuid, state: LearnedState) -> Result<bool, StoreError>;

    async fn set_words_learned(&self, ids: &[Uuid], state: LearnedState)
        -> Result<bool, StoreError>;

    /// Inserts one word per entry; returns the number inserted.
    async fn bulk_insert(&self, words: &BTreeMap<String, Topic>) -> Result<usize, StoreError>;

    /// 1-based page of learned words, oldest first.
    async fn words_learned_page(&self, page: usize) -> Result<WordList, StoreError>;

    /// Most recently learned words, newest first.
    async fn words_learned_for_repetition(&self, limit: usize) -> Result<WordList, StoreError>;

    async fn count_learned(&self) -> Result<usize, StoreError>;

    async fn count_learned_since(&self, window: chrono::Duration) -> Result<usize, StoreError>;

    fn learned_page_size(&self) -> usize;
}

#[async_trait]
pub trait UserPreferences: Send + Sync {
    async fn favorite_topic(&self) -> Result<Topic, StoreError>;

    /// Culture code of the translation language, e.g. `uk-UA`.
    async fn native_language(&self) -> Result<String, StoreError>;
}

fn topic_pool_key(topic: Topic) -> String {
    format!("words_not_learned:topic:{topic}")
}

fn learned_page_key(page: usize) -> String {
    format!("words_learned:page:{page}")
}

const REPETITION_KEY: &str = "words_learned:repetition";

/// [`WordStore`] decorator that memoizes list queries in a [`QueryCache`].
///
/// Only the limits the rotation engine actually uses are cached, so the
/// invalidation list stays a fixed enumeration; other limits go straight to
/// the inner store.
pub struct CachedWordStore {
    inner: Arc<dyn WordStore>,
    cache: Arc<QueryCache>,
    topic_pool_limit: usize,
    repetition_limit: usize,
    /// Highest learned page cached with data; bounds the page keys to invalidate.
    highest_cached_page: AtomicUsize,
    /// Bumped on every invalidation. A read that straddles one is not cached.
    generation: AtomicU64,
}

impl CachedWordStore {
    pub fn new(inner: Arc<dyn WordStore>, cache: Arc<QueryCache>, config: &VocabularyConfig) -> Self {
        Self {
            inner,
            cache,
            topic_pool_limit: config.topic_pool_limit,
            repetition_limit: config.repetition_limit,
            highest_cached_page: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Every key a mutation can make stale.
    async fn invalidation_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Topic::ALL.into_iter().map(topic_pool_key).collect();
        keys.push(REPETITION_KEY.to_string());

        let page_size = self.inner.learned_page_size().max(1);
        let counted_pages = match self.inner.count_learned().await {
            Ok(count) => count / page_size + 1,
            Err(_) => 0,
        };
        let last_page = counted_pages.max(self.highest_cached_page.load(Ordering::Relaxed));
        keys.extend((1..=last_page).map(learned_page_key));
        keys
    }

    async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let keys = self.invalidation_keys().await;
        self.cache.invalidate(&keys);
    }

    /// Caches `words` unless a mutation happened since `generation` was read.
    fn store_if_current(&self, generation: u64, key: impl Into<String>, words: &WordList) -> bool {
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        self.cache.set(key, words, self.cache.default_ttl());
        true
    }

    /// Drops everything this store has cached, e.g. after a factory reset.
    pub async fn invalidate_all(&self) {
        self.invalidate().await;
        self.highest_cached_page.store(0, Ordering::Relaxed);
    }
}

#[async_trait]
impl WordStore for CachedWordStore {
    async fn any_words(&self) -> Result<bool, StoreError> {
        self.inner.any_words().await
    }

    async fn words_not_learned_by_topic(
        &self,
        topic: Topic,
        limit: usize,
    ) -> Result<WordList, StoreError> {
        if limit != self.topic_pool_limit {
            return self.inner.words_not_learned_by_topic(topic, limit).await;
        }

        let key = topic_pool_key(topic);
        if let Some(hit) = self.cache.get::<Vec<Word>>(&key) {
            return Ok(hit);
        }
        let generation = self.generation.load(Ordering::Acquire);
        let words = self.inner.words_not_learned_by_topic(topic, limit).await?;
        self.store_if_current(generation, key, &words);
        Ok(words)
    }

    async fn set_word_learned(&self, id: Uuid, state: LearnedState) -> Result<bool, StoreError> {
        let updated = self.inner.set_word_learned(id, state).await?;
        if updated {
            self.invalidate().await;
        }
        Ok(updated)
    }

    async fn set_words_learned(
        &self,
        ids: &[Uuid],
        state: LearnedState,
    ) -> Result<bool, StoreError> {
        let updated = self.inner.set_words_learned(ids, state).await?;
        if updated {
            self.invalidate().await;
        }
        Ok(updated)
    }

    async fn bulk_insert(&self, words: &BTreeMap<String, Topic>) -> Result<usize, StoreError> {
        let inserted = self.inner.bulk_insert(words).await?;
        if inserted > 0 {
            self.invalidate().await;
        }
        Ok(inserted)
    }

    async fn words_learned_page(&self, page: usize) -> Result<WordList, StoreError> {
        let key = learned_page_key(page);
        if let Some(hit) = self.cache.get::<Vec<Word>>(&key) {
            return Ok(hit);
        }
        let generation = self.generation.load(Ordering::Acquire);
        let words = self.inner.words_learned_page(page).await?;
        // 超出数据范围的空页不缓存，也不计入失效范围
        if (page == 1 || !words.is_empty()) && self.store_if_current(generation, key, &words) {
            self.highest_cached_page.fetch_max(page, Ordering::Relaxed);
        }
        Ok(words)
    }

    async fn words_learned_for_repetition(&self, limit: usize) -> Result<WordList, StoreError> {
        if limit != self.repetition_limit {
            return self.inner.words_learned_for_repetition(limit).await;
        }

        if let Some(hit) = self.cache.get::<Vec<Word>>(REPETITION_KEY) {
            return Ok(hit);
        }
        let generation = self.generation.load(Ordering::Acquire);
        let words = self.inner.words_learned_for_repetition(limit).await?;
        self.store_if_current(generation, REPETITION_KEY, &words);
        Ok(words)
    }

    async fn count_learned(&self) -> Result<usize, StoreError> {
        self.inner.count_learned().await
    }

    async fn count_learned_since(&self, window: chrono::Duration) -> Result<usize, StoreError> {
        self.inner.count_learned_since(window).await
    }

    fn learned_page_size(&self) -> usize {
        self.inner.learned_page_size()
    }
}
