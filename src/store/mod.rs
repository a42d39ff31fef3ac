pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

use crate::constants::DEFAULT_LEARNED_PAGE_SIZE;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub words: sled::Tree,
    pub users: sled::Tree,
    pub meta: sled::Tree,
    learned_page_size: usize,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error: version={version}, message={message}")]
    Migration { version: u32, message: String },
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let words = db.open_tree(trees::WORDS)?;
        let users = db.open_tree(trees::USERS)?;
        let meta = db.open_tree(trees::META)?;

        Ok(Self {
            db,
            words,
            users,
            meta,
            learned_page_size: DEFAULT_LEARNED_PAGE_SIZE,
        })
    }

    pub fn with_learned_page_size(mut self, page_size: usize) -> Self {
        self.learned_page_size = page_size.max(1);
        self
    }

    pub fn learned_page_size(&self) -> usize {
        self.learned_page_size
    }

    /// 清空全部单词与用户数据（恢复出厂设置）
    pub fn factory_reset(&self) -> Result<(), StoreError> {
        self.words.clear()?;
        self.users.clear()?;
        self.db.flush()?;
        Ok(())
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
