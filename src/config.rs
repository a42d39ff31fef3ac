use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_LEARNED_PAGE_SIZE, DEFAULT_RECENT_DAYS,
    DEFAULT_REPETITION_LIMIT, DEFAULT_TOPIC_POOL_LIMIT, DEFAULT_TRANSLATOR_API_URL,
    DEFAULT_TRANSLATOR_TIMEOUT_SECS, DEFAULT_WORKING_SET_SIZE, MAX_DRAW_ATTEMPTS,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    pub words_dir: Option<String>,
    pub vocabulary: VocabularyConfig,
    pub translator: TranslatorConfig,
    pub worker: WorkerConfig,
}

/// Tunables of the rotation engine and its caches.
#[derive(Debug, Clone)]
pub struct VocabularyConfig {
    pub working_set_size: usize,
    pub topic_pool_limit: usize,
    pub max_draw_attempts: usize,
    pub learned_page_size: usize,
    pub repetition_limit: usize,
    pub recent_days: i64,
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub enabled: bool,
    pub mock: bool,
    pub api_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            working_set_size: DEFAULT_WORKING_SET_SIZE,
            topic_pool_limit: DEFAULT_TOPIC_POOL_LIMIT,
            max_draw_attempts: MAX_DRAW_ATTEMPTS,
            learned_page_size: DEFAULT_LEARNED_PAGE_SIZE,
            repetition_limit: DEFAULT_REPETITION_LIMIT,
            recent_days: DEFAULT_RECENT_DAYS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl VocabularyConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn recent_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.recent_days)
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mock: true,
            api_url: DEFAULT_TRANSLATOR_API_URL.to_string(),
            timeout_secs: DEFAULT_TRANSLATOR_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let words_dir = env_or("WORDS_DIR", "");
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/vocabulary.sled"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            words_dir: (!words_dir.trim().is_empty()).then_some(words_dir),
            vocabulary: VocabularyConfig {
                // 工作集至少为 1，否则轮换永远为空
                working_set_size: env_or_parse("WORKING_SET_SIZE", DEFAULT_WORKING_SET_SIZE)
                    .max(1),
                topic_pool_limit: env_or_parse("TOPIC_POOL_LIMIT", DEFAULT_TOPIC_POOL_LIMIT)
                    .max(1),
                max_draw_attempts: MAX_DRAW_ATTEMPTS,
                learned_page_size: env_or_parse("LEARNED_PAGE_SIZE", DEFAULT_LEARNED_PAGE_SIZE)
                    .max(1),
                repetition_limit: env_or_parse("REPETITION_LIMIT", DEFAULT_REPETITION_LIMIT),
                recent_days: env_or_parse("RECENT_DAYS", DEFAULT_RECENT_DAYS),
                cache_ttl_secs: env_or_parse("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
            },
            translator: TranslatorConfig {
                enabled: env_or_bool("TRANSLATOR_ENABLED", true),
                mock: env_or_bool("TRANSLATOR_MOCK", true),
                api_url: env_or("TRANSLATOR_API_URL", DEFAULT_TRANSLATOR_API_URL),
                timeout_secs: env_or_parse(
                    "TRANSLATOR_TIMEOUT_SECS",
                    DEFAULT_TRANSLATOR_TIMEOUT_SECS,
                ),
            },
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
