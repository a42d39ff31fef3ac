use crate::store::keys;
use crate::store::{Store, StoreError};
use crate::vocabulary::types::Word;

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_normalize_word_text", m002_normalize_word_text),
    ]
}

/// 执行所有未应用的迁移。
///
/// 每个迁移必须幂等：进程可能在迁移完成后、写入版本号前退出，重启后会重跑。
/// 版本号只增不减。
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;

    for (index, (name, func)) in migrations().iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.meta.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().unwrap_or([0; 4]);
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {current} to {version}"),
        });
    }

    store
        .meta
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

/// 旧数据中的单词可能带首尾空白；空白单词直接删除
fn m002_normalize_word_text(store: &Store) -> Result<(), StoreError> {
    let mut batch = sled::Batch::default();
    let mut changed = 0usize;

    for item in store.words.iter() {
        let (key, value) = item?;
        let mut word: Word = Store::deserialize(&value)?;
        let trimmed = word.text.trim();

        if trimmed.is_empty() {
            batch.remove(key);
            changed += 1;
        } else if trimmed.len() != word.text.len() {
            word.text = trimmed.to_string();
            batch.insert(keys::word_key(&word.id).to_vec(), Store::serialize(&word)?);
            changed += 1;
        }
    }

    if changed > 0 {
        store.words.apply_batch(batch)?;
        tracing::info!(changed, "Normalized stored word text");
    }
    Ok(())
}
