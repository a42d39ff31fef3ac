//! 缓存清理（每 10 分钟）：移除过期或已失效的查询缓存条目，以及过期的译文缓存

use crate::vocabulary::{QueryCache, TranslationMemoizer};

pub async fn run(query_cache: &QueryCache, memoizer: &TranslationMemoizer) {
    tracing::debug!("Cache cleanup worker tick");

    let queries = query_cache.purge_expired();
    let translations = memoizer.purge_expired();

    if queries > 0 || translations > 0 {
        tracing::info!(
            queries,
            translations,
            remaining_queries = query_cache.len(),
            remaining_translations = memoizer.len(),
            "Cache cleanup: removed stale entries"
        );
    }
}
