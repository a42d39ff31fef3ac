use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::services::translator::GoogleTranslator;
use crate::store::Store;
use crate::vocabulary::{
    CachedWordStore, QueryCache, RemoteTranslator, TranslationMemoizer, WordLists, WordSelector,
};

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    words: Arc<CachedWordStore>,
    selector: Arc<WordSelector>,
    memoizer: Arc<TranslationMemoizer>,
    query_cache: Arc<QueryCache>,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<Store>, config: &Config, shutdown_tx: broadcast::Sender<()>) -> Self {
        let remote = Arc::new(GoogleTranslator::new(&config.translator));
        Self::with_remote_translator(store, config, shutdown_tx, remote)
    }

    /// Same wiring with a custom translation backend.
    pub fn with_remote_translator(
        store: Arc<Store>,
        config: &Config,
        shutdown_tx: broadcast::Sender<()>,
        remote: Arc<dyn RemoteTranslator>,
    ) -> Self {
        let vocabulary = config.vocabulary.clone();
        let query_cache = Arc::new(QueryCache::new(vocabulary.cache_ttl()));
        let words = Arc::new(CachedWordStore::new(
            store.clone(),
            query_cache.clone(),
            &vocabulary,
        ));
        let word_lists = match &config.words_dir {
            Some(dir) => WordLists::with_dir(dir),
            None => WordLists::embedded(),
        };
        let selector = Arc::new(WordSelector::new(
            words.clone(),
            store.clone(),
            word_lists,
            vocabulary.clone(),
        ));
        let memoizer = Arc::new(TranslationMemoizer::new(remote, vocabulary.cache_ttl()));

        Self {
            store,
            words,
            selector,
            memoizer,
            query_cache,
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Cached view of the word store shared with the selector.
    pub fn words(&self) -> &CachedWordStore {
        &self.words
    }

    pub fn selector(&self) -> &WordSelector {
        &self.selector
    }

    pub fn memoizer(&self) -> &TranslationMemoizer {
        &self.memoizer
    }

    pub fn query_cache(&self) -> &QueryCache {
        &self.query_cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_tx(&self) -> &broadcast::Sender<()> {
        &self.shutdown_tx
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
