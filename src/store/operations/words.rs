use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::store::keys;
use crate::store::{Store, StoreError};
use crate::vocabulary::repository::{WordList, WordStore};
use crate::vocabulary::types::{LearnedState, Topic, Word};

impl Store {
    pub fn get_word(&self, word_id: &Uuid) -> Result<Option<Word>, StoreError> {
        match self.words.get(keys::word_key(word_id))? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// 按插入顺序扫描全部单词
    fn scan_words(&self) -> impl Iterator<Item = Result<Word, StoreError>> + '_ {
        self.words.iter().map(|item| {
            let (_, raw) = item?;
            Self::deserialize::<Word>(&raw)
        })
    }

    fn learned_words(&self) -> Result<Vec<Word>, StoreError> {
        let mut learned = Vec::new();
        for word in self.scan_words() {
            let word = word?;
            if word.is_learned() {
                learned.push(word);
            }
        }
        Ok(learned)
    }
}

#[async_trait]
impl WordStore for Store {
    async fn any_words(&self) -> Result<bool, StoreError> {
        Ok(!self.words.is_empty())
    }

    async fn words_not_learned_by_topic(
        &self,
        topic: Topic,
        limit: usize,
    ) -> Result<WordList, StoreError> {
        let mut words = Vec::new();
        for word in self.scan_words() {
            if words.len() >= limit {
                break;
            }
            let word = word?;
            if word.topic == topic && word.learned == LearnedState::NotLearned {
                words.push(word);
            }
        }
        Ok(Arc::new(words))
    }

    async fn set_word_learned(&self, id: Uuid, state: LearnedState) -> Result<bool, StoreError> {
        let Some(mut word) = self.get_word(&id)? else {
            return Ok(false);
        };
        word.learned = state;
        self.words.insert(keys::word_key(&id), Self::serialize(&word)?)?;
        Ok(true)
    }

    async fn set_words_learned(
        &self,
        ids: &[Uuid],
        state: LearnedState,
    ) -> Result<bool, StoreError> {
        if ids.is_empty() {
            return Ok(false);
        }

        let mut batch = sled::Batch::default();
        let mut touched = 0usize;
        for id in ids {
            if let Some(mut word) = self.get_word(id)? {
                word.learned = state;
                batch.insert(keys::word_key(id).to_vec(), Self::serialize(&word)?);
                touched += 1;
            }
        }
        if touched == 0 {
            return Ok(false);
        }
        self.words.apply_batch(batch)?;
        Ok(true)
    }

    async fn bulk_insert(&self, words: &BTreeMap<String, Topic>) -> Result<usize, StoreError> {
        let mut batch = sled::Batch::default();
        let mut inserted = 0usize;
        for (text, topic) in words {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let word = Word::new(text, *topic);
            batch.insert(keys::word_key(&word.id).to_vec(), Self::serialize(&word)?);
            inserted += 1;
        }
        self.words.apply_batch(batch)?;
        Ok(inserted)
    }

    async fn words_learned_page(&self, page: usize) -> Result<WordList, StoreError> {
        if page < 1 {
            return Err(StoreError::Validation(format!(
                "page must be at least 1, got {page}"
            )));
        }

        let mut learned = self.learned_words()?;
        learned.sort_by_key(|w| w.learned.learned_at());

        let page_size = self.learned_page_size();
        Ok(Arc::new(
            learned
                .into_iter()
                .skip((page - 1).saturating_mul(page_size))
                .take(page_size)
                .collect(),
        ))
    }

    async fn words_learned_for_repetition(&self, limit: usize) -> Result<WordList, StoreError> {
        let mut learned = self.learned_words()?;
        learned.sort_by(|a, b| b.learned.learned_at().cmp(&a.learned.learned_at()));
        learned.truncate(limit);
        Ok(Arc::new(learned))
    }

    async fn count_learned(&self) -> Result<usize, StoreError> {
        let mut count = 0usize;
        for word in self.scan_words() {
            if word?.is_learned() {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn count_learned_since(&self, window: chrono::Duration) -> Result<usize, StoreError> {
        let since = Utc::now() - window;
        let mut count = 0usize;
        for word in self.scan_words() {
            if matches!(word?.learned.learned_at(), Some(at) if at >= since) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn learned_page_size(&self) -> usize {
        Store::learned_page_size(self)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        (dir, store)
    }

    fn seed(pairs: &[(&str, Topic)]) -> BTreeMap<String, Topic> {
        pairs.iter().map(|(w, t)| (w.to_string(), *t)).collect()
    }

    #[tokio::test]
    async fn bulk_insert_skips_blank_entries() {
        let (_dir, store) = temp_store();
        assert!(!store.any_words().await.unwrap());

        let inserted = store
            .bulk_insert(&seed(&[("apple", Topic::Common), ("  ", Topic::Common)]))
            .await
            .unwrap();

        assert_eq!(inserted, 1);
        assert!(store.any_words().await.unwrap());
    }

    #[tokio::test]
    async fn topic_pool_excludes_learned_and_refused() {
        let (_dir, store) = temp_store();
        store
            .bulk_insert(&seed(&[
                ("apple", Topic::Common),
                ("bread", Topic::Common),
                ("cheese", Topic::Common),
                ("ledger", Topic::Finance),
            ]))
            .await
            .unwrap();

        let pool = store.words_not_learned_by_topic(Topic::Common, 250).await.unwrap();
        assert_eq!(pool.len(), 3);

        store.set_word_learned(pool[0].id, LearnedState::learned_now()).await.unwrap();
        store.set_word_learned(pool[1].id, LearnedState::Refused).await.unwrap();

        let pool = store.words_not_learned_by_topic(Topic::Common, 250).await.unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].text, "cheese");
    }

    #[tokio::test]
    async fn topic_pool_respects_limit() {
        let (_dir, store) = temp_store();
        store
            .bulk_insert(&seed(&[
                ("a", Topic::Travel),
                ("b", Topic::Travel),
                ("c", Topic::Travel),
            ]))
            .await
            .unwrap();

        let pool = store.words_not_learned_by_topic(Topic::Travel, 2).await.unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test]
    async fn unknown_id_is_not_updated() {
        let (_dir, store) = temp_store();
        let updated = store
            .set_word_learned(Uuid::now_v7(), LearnedState::learned_now())
            .await
            .unwrap();
        assert!(!updated);
        assert!(!store.set_words_learned(&[], LearnedState::Refused).await.unwrap());
    }

    #[tokio::test]
    async fn learned_pages_are_oldest_first() {
        let (_dir, store) = temp_store();
        let store = store.with_learned_page_size(2);
        store
            .bulk_insert(&seed(&[
                ("one", Topic::Common),
                ("two", Topic::Common),
                ("three", Topic::Common),
            ]))
            .await
            .unwrap();
        let pool = store.words_not_learned_by_topic(Topic::Common, 250).await.unwrap();

        let base = Utc::now() - Duration::hours(1);
        for (i, word) in pool.iter().enumerate() {
            let at = base + Duration::minutes(i as i64);
            store.set_word_learned(word.id, LearnedState::Learned { at }).await.unwrap();
        }

        let first = store.words_learned_page(1).await.unwrap();
        let second = store.words_learned_page(2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].id, pool[0].id);
        assert_eq!(second[0].id, pool[2].id);

        assert!(matches!(
            store.words_learned_page(0).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn far_pages_are_empty_without_overflow() {
        let (_dir, store) = temp_store();
        store.bulk_insert(&seed(&[("one", Topic::Common)])).await.unwrap();
        let pool = store.words_not_learned_by_topic(Topic::Common, 250).await.unwrap();
        store
            .set_word_learned(pool[0].id, LearnedState::learned_now())
            .await
            .unwrap();

        assert!(store.words_learned_page(1_000_000_000_000).await.unwrap().is_empty());
        assert!(store.words_learned_page(usize::MAX).await.unwrap().is_empty());
        assert_eq!(store.words_learned_page(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repetition_is_newest_first() {
        let (_dir, store) = temp_store();
        store
            .bulk_insert(&seed(&[("old", Topic::Common), ("new", Topic::Common)]))
            .await
            .unwrap();
        let pool = store.words_not_learned_by_topic(Topic::Common, 250).await.unwrap();
        let old = pool.iter().find(|w| w.text == "old").unwrap().id;
        let new = pool.iter().find(|w| w.text == "new").unwrap().id;

        let at = Utc::now() - Duration::days(10);
        store.set_word_learned(old, LearnedState::Learned { at }).await.unwrap();
        store.set_word_learned(new, LearnedState::learned_now()).await.unwrap();

        let repetition = store.words_learned_for_repetition(100).await.unwrap();
        assert_eq!(repetition[0].id, new);
        assert_eq!(repetition[1].id, old);
        assert_eq!(store.words_learned_for_repetition(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn counts_honor_window_and_skip_refused() {
        let (_dir, store) = temp_store();
        store
            .bulk_insert(&seed(&[
                ("recent", Topic::Common),
                ("stale", Topic::Common),
                ("refused", Topic::Common),
            ]))
            .await
            .unwrap();
        let pool = store.words_not_learned_by_topic(Topic::Common, 250).await.unwrap();
        let id = |text: &str| pool.iter().find(|w| w.text == text).unwrap().id;

        store.set_word_learned(id("recent"), LearnedState::learned_now()).await.unwrap();
        let at = Utc::now() - Duration::days(7);
        store.set_word_learned(id("stale"), LearnedState::Learned { at }).await.unwrap();
        store.set_word_learned(id("refused"), LearnedState::Refused).await.unwrap();

        assert_eq!(store.count_learned().await.unwrap(), 2);
        assert_eq!(store.count_learned_since(Duration::days(3)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn batch_update_marks_every_known_id() {
        let (_dir, store) = temp_store();
        store
            .bulk_insert(&seed(&[("x", Topic::Travel), ("y", Topic::Travel)]))
            .await
            .unwrap();
        let ids: Vec<Uuid> = store
            .words_not_learned_by_topic(Topic::Travel, 250)
            .await
            .unwrap()
            .iter()
            .map(|w| w.id)
            .collect();

        assert!(store.set_words_learned(&ids, LearnedState::learned_now()).await.unwrap());
        assert_eq!(store.count_learned().await.unwrap(), 2);
    }
}
