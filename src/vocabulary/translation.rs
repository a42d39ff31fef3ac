use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::vocabulary::types::{Language, Word};

/// Words are joined with this before the single remote call...
pub const REQUEST_SEPARATOR: &str = ". ";
/// ...and the translated text is split back on this.
pub const RESPONSE_SEPARATOR: char = '.';

#[derive(Debug, thiserror::Error)]
pub enum TranslatorError {
    #[error("translator is disabled")]
    Disabled,
    #[error("translator request timed out")]
    Timeout,
    #[error("translator network error: {0}")]
    Network(String),
    #[error("translator api error: status={status}, message={message}")]
    ApiError { status: u16, message: String },
    #[error("translator returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Machine translation endpoint. One call translates one joined batch.
#[async_trait]
pub trait RemoteTranslator: Send + Sync {
    async fn translate_batch(
        &self,
        source: Language,
        target: Language,
        text: &str,
    ) -> Result<String, TranslatorError>;
}

struct CachedTranslation {
    text: String,
    expires_at: Instant,
}

type CacheKey = (Language, String);

fn cache_key(language: Language, text: &str) -> CacheKey {
    (language, text.trim().to_lowercase())
}

/// Memoizes per-word translations so repeated words cost one remote round trip in total.
pub struct TranslationMemoizer {
    remote: Arc<dyn RemoteTranslator>,
    cache: Mutex<HashMap<CacheKey, CachedTranslation>>,
    ttl: Duration,
}

impl TranslationMemoizer {
    pub fn new(remote: Arc<dyn RemoteTranslator>, ttl: Duration) -> Self {
        Self {
            remote,
            cache: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<CacheKey, CachedTranslation>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, key: &CacheKey, now: Instant) -> Option<String> {
        let mut cache = self.cache();
        match cache.get(key) {
            Some(hit) if now < hit.expires_at => Some(hit.text.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn translate(
        &self,
        language: Language,
        words: &[Word],
    ) -> Result<HashMap<Word, String>, TranslatorError> {
        if words.is_empty() {
            return Ok(HashMap::new());
        }
        if language == Language::English {
            return Ok(words.iter().map(|w| (w.clone(), w.text.clone())).collect());
        }

        let now = Instant::now();
        let mut translated = HashMap::with_capacity(words.len());
        // 相同文本只请求一次，译文分发给所有同文本单词
        let mut pending: Vec<(CacheKey, Vec<Word>)> = Vec::new();

        for word in words {
            if translated.contains_key(word) {
                continue;
            }
            let key = cache_key(language, &word.text);
            if let Some(text) = self.lookup(&key, now) {
                translated.insert(word.clone(), text);
                continue;
            }
            match pending.iter_mut().find(|(k, _)| *k == key) {
                Some((_, group)) => {
                    if !group.contains(word) {
                        group.push(word.clone());
                    }
                }
                None => pending.push((key, vec![word.clone()])),
            }
        }

        if pending.is_empty() {
            return Ok(translated);
        }

        let query = pending
            .iter()
            .map(|(_, group)| group[0].text.trim())
            .collect::<Vec<_>>()
            .join(REQUEST_SEPARATOR);
        let response = self
            .remote
            .translate_batch(Language::English, language, &query)
            .await?;

        let pieces: Vec<&str> = response
            .split(RESPONSE_SEPARATOR)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .collect();

        // 数量不一致时只保留对齐的前缀
        let expires_at = Instant::now() + self.ttl;
        let mut cache = self.cache();
        for ((key, group), piece) in pending.into_iter().zip(pieces) {
            cache.insert(
                key,
                CachedTranslation {
                    text: piece.to_string(),
                    expires_at,
                },
            );
            for word in group {
                translated.insert(word, piece.to_string());
            }
        }

        Ok(translated)
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut cache = self.cache();
        let before = cache.len();
        cache.retain(|_, entry| now < entry.expires_at);
        before - cache.len()
    }

    pub fn len(&self) -> usize {
        self.cache().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache().clear();
    }
}
