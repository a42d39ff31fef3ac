//! 工作集轮换：从常用词池与用户偏好主题词池中随机抽样。
//!
//! 同一时刻只允许一个填充操作；并发的填充请求直接返回 `Busy`，不排队。
//! 标记学会/放弃不受填充闸门限制，但成员校验与移除都在工作集锁内完成。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::config::VocabularyConfig;
use crate::vocabulary::repository::{UserPreferences, WordList, WordStore};
use crate::vocabulary::seed::WordLists;
use crate::vocabulary::types::{LearnedState, Topic, Word};
use crate::vocabulary::VocabularyError;

/// Result of a refill request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RefillOutcome {
    Populated { added: usize },
    /// `initialize` on a non-empty working set.
    AlreadyPopulated,
    /// Another refill is running.
    Busy,
    /// The store has no words at all.
    StoreEmpty,
}

impl RefillOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Populated { .. } | Self::AlreadyPopulated)
    }
}

struct SelectorState {
    words: Vec<Word>,
    rng: StdRng,
    /// 持有最近一次抽样使用的词池，查询缓存只保存弱引用
    pools: Vec<WordList>,
}

/// Clears the initializing flag on every exit path.
struct PopulateGuard<'a> {
    selector: &'a WordSelector,
}

impl Drop for PopulateGuard<'_> {
    fn drop(&mut self) {
        self.selector.initializing.store(false, Ordering::Release);
        let _ = self.selector.events.send(false);
    }
}

pub struct WordSelector {
    store: Arc<dyn WordStore>,
    preferences: Arc<dyn UserPreferences>,
    word_lists: WordLists,
    config: VocabularyConfig,
    state: Mutex<SelectorState>,
    initializing: AtomicBool,
    /// 成功标记的次数，抽样据此判断词池是否在等锁期间过期
    marks: AtomicU64,
    events: broadcast::Sender<bool>,
}

/// Draws one word from `pool` that is in neither `picked` nor `existing`.
/// Gives up after `max_attempts` draws; drawn words leave the pool.
pub fn draw_into<R: Rng + ?Sized>(
    picked: &mut Vec<Word>,
    existing: &[Word],
    pool: &mut Vec<Word>,
    rng: &mut R,
    max_attempts: usize,
) -> bool {
    for _ in 0..max_attempts {
        if pool.is_empty() {
            return false;
        }
        let index = rng.gen_range(0..pool.len());
        let candidate = &pool[index];
        if picked.contains(candidate) || existing.contains(candidate) {
            continue;
        }
        picked.push(pool.swap_remove(index));
        return true;
    }
    false
}

impl WordSelector {
    pub fn new(
        store: Arc<dyn WordStore>,
        preferences: Arc<dyn UserPreferences>,
        word_lists: WordLists,
        config: VocabularyConfig,
    ) -> Self {
        Self::with_rng(store, preferences, word_lists, config, StdRng::from_entropy())
    }

    pub fn with_rng(
        store: Arc<dyn WordStore>,
        preferences: Arc<dyn UserPreferences>,
        word_lists: WordLists,
        config: VocabularyConfig,
        rng: StdRng,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            store,
            preferences,
            word_lists,
            config,
            state: Mutex::new(SelectorState {
                words: Vec::new(),
                rng,
                pools: Vec::new(),
            }),
            initializing: AtomicBool::new(false),
            marks: AtomicU64::new(0),
            events,
        }
    }

    pub async fn words(&self) -> Vec<Word> {
        self.state.lock().await.words.clone()
    }

    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::Acquire)
    }

    /// Initializing-state changes, `true` when a refill starts and `false` when it ends.
    pub fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.events.subscribe()
    }

    fn try_begin(&self) -> Option<PopulateGuard<'_>> {
        self.initializing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let _ = self.events.send(true);
        Some(PopulateGuard { selector: self })
    }

    pub async fn initialize(&self) -> Result<RefillOutcome, VocabularyError> {
        let Some(_guard) = self.try_begin() else {
            return Ok(RefillOutcome::Busy);
        };
        if !self.state.lock().await.words.is_empty() {
            return Ok(RefillOutcome::AlreadyPopulated);
        }

        if !self.store.any_words().await? {
            let seed = self.word_lists.load().await?;
            self.store.bulk_insert(&seed).await?;
        }

        let added = self.populate(false).await?;
        Ok(RefillOutcome::Populated { added })
    }

    pub async fn add_random_words(&self) -> Result<RefillOutcome, VocabularyError> {
        let Some(_guard) = self.try_begin() else {
            return Ok(RefillOutcome::Busy);
        };
        if !self.store.any_words().await? {
            return Ok(RefillOutcome::StoreEmpty);
        }

        let added = self.populate(false).await?;
        Ok(RefillOutcome::Populated { added })
    }

    /// Replaces the working set with a fresh sample.
    pub async fn update(&self) -> Result<RefillOutcome, VocabularyError> {
        let Some(_guard) = self.try_begin() else {
            return Ok(RefillOutcome::Busy);
        };
        if !self.store.any_words().await? {
            return Ok(RefillOutcome::StoreEmpty);
        }

        let added = self.populate(true).await?;
        Ok(RefillOutcome::Populated { added })
    }

    async fn fetch_pools(&self, favorite: Topic) -> Result<(WordList, WordList), VocabularyError> {
        let limit = self.config.topic_pool_limit;
        let common_pool = self
            .store
            .words_not_learned_by_topic(Topic::Common, limit)
            .await?;
        let favorite_pool = if favorite == Topic::Common {
            WordList::default()
        } else {
            self.store.words_not_learned_by_topic(favorite, limit).await?
        };
        Ok((common_pool, favorite_pool))
    }

    /// Pools are fetched before the working set is touched, so a store error
    /// leaves the previous set in place.
    async fn populate(&self, replace: bool) -> Result<usize, VocabularyError> {
        let favorite = self.preferences.favorite_topic().await?;

        let marks_before = self.marks.load(Ordering::Acquire);
        let (mut common_pool, mut favorite_pool) = self.fetch_pools(favorite).await?;

        let mut state = self.state.lock().await;
        if self.marks.load(Ordering::Acquire) != marks_before {
            // 持锁重新读取，标记操作无法再插入
            (common_pool, favorite_pool) = self.fetch_pools(favorite).await?;
        }
        if replace {
            state.words.clear();
        }
        if common_pool.is_empty() {
            state.pools = vec![common_pool, favorite_pool];
            return Ok(0);
        }

        let state = &mut *state;
        let target = self
            .config
            .working_set_size
            .saturating_sub(state.words.len());
        let attempts = self.config.max_draw_attempts;
        let mut common: Vec<Word> = common_pool.to_vec();
        let mut favorites: Vec<Word> = favorite_pool.to_vec();
        let mut picked = Vec::with_capacity(target);

        if favorites.is_empty() {
            for _ in 0..target {
                draw_into(&mut picked, &state.words, &mut common, &mut state.rng, attempts);
            }
        } else {
            for _ in 0..target / 2 {
                draw_into(&mut picked, &state.words, &mut common, &mut state.rng, attempts);
            }
            for _ in 0..target / 2 {
                draw_into(&mut picked, &state.words, &mut favorites, &mut state.rng, attempts);
            }
            let missing = target.saturating_sub(picked.len());
            for _ in 0..missing {
                draw_into(&mut picked, &state.words, &mut common, &mut state.rng, attempts);
            }
        }

        let added = picked.len();
        state.words.extend(picked);
        state.pools = vec![common_pool, favorite_pool];
        Ok(added)
    }

    async fn mark(&self, id: Uuid, learned: LearnedState) -> Result<bool, VocabularyError> {
        let mut state = self.state.lock().await;
        let Some(position) = state.words.iter().position(|w| w.id == id) else {
            return Ok(false);
        };

        if !self.store.set_word_learned(id, learned).await? {
            return Ok(false);
        }
        self.marks.fetch_add(1, Ordering::AcqRel);
        state.words.remove(position);
        Ok(true)
    }

    /// `Ok(false)` when the word is not in the working set.
    pub async fn mark_learned(&self, id: Uuid) -> Result<bool, VocabularyError> {
        self.mark(id, LearnedState::learned_now()).await
    }

    pub async fn mark_refused(&self, id: Uuid) -> Result<bool, VocabularyError> {
        self.mark(id, LearnedState::Refused).await
    }

    /// All-or-nothing: every id must be in the working set.
    pub async fn mark_many_learned(&self, ids: &[Uuid]) -> Result<bool, VocabularyError> {
        let mut state = self.state.lock().await;
        if ids.is_empty() || !ids.iter().all(|id| state.words.iter().any(|w| w.id == *id)) {
            return Ok(false);
        }

        if !self
            .store
            .set_words_learned(ids, LearnedState::learned_now())
            .await?
        {
            return Ok(false);
        }
        self.marks.fetch_add(1, Ordering::AcqRel);
        state.words.retain(|w| !ids.contains(&w.id));
        Ok(true)
    }

    /// Drops the working set, e.g. after the store was wiped.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.words.clear();
        state.pools.clear();
    }

    pub async fn learned_page(&self, page: usize) -> Result<WordList, VocabularyError> {
        if page < 1 {
            return Err(VocabularyError::InvalidArgument(format!(
                "page must be at least 1, got {page}"
            )));
        }
        Ok(self.store.words_learned_page(page).await?)
    }

    pub async fn repetition_words(&self) -> Result<WordList, VocabularyError> {
        Ok(self
            .store
            .words_learned_for_repetition(self.config.repetition_limit)
            .await?)
    }

    pub async fn count_learned(&self) -> Result<usize, VocabularyError> {
        Ok(self.store.count_learned().await?)
    }

    pub async fn count_learned_recently(&self) -> Result<usize, VocabularyError> {
        Ok(self
            .store
            .count_learned_since(self.config.recent_window())
            .await?)
    }
}
