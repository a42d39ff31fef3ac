//! 单词轮换引擎：工作集抽样、查询缓存与翻译记忆。
//!
//! 这里的组件不记录日志，日志在路由、worker 与外部服务层输出。

pub mod query_cache;
pub mod repository;
pub mod seed;
pub mod selector;
pub mod translation;
pub mod types;

use thiserror::Error;

use crate::store::StoreError;

pub use query_cache::QueryCache;
pub use repository::{CachedWordStore, UserPreferences, WordList, WordStore};
pub use seed::WordLists;
pub use selector::{RefillOutcome, WordSelector};
pub use translation::{RemoteTranslator, TranslationMemoizer, TranslatorError};
pub use types::{Language, LearnedState, Topic, Word};

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Translation(#[from] TranslatorError),
    #[error("word list for {topic} unavailable: {message}")]
    WordList { topic: Topic, message: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
