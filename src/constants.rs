/// 每次轮换的目标工作集大小
pub const DEFAULT_WORKING_SET_SIZE: usize = 10;

/// 每个主题候选池的最大加载数量
pub const DEFAULT_TOPIC_POOL_LIMIT: usize = 250;

/// 单个槽位的随机抽取最大尝试次数
pub const MAX_DRAW_ATTEMPTS: usize = 5;

/// 已学单词分页大小
pub const DEFAULT_LEARNED_PAGE_SIZE: usize = 25;

/// 已学单词页码上限
pub const MAX_LEARNED_PAGE: usize = 10_000;

/// 复习列表最大单词数
pub const DEFAULT_REPETITION_LIMIT: usize = 100;

/// "最近学习"统计窗口（天）
pub const DEFAULT_RECENT_DAYS: i64 = 3;

/// 查询缓存与翻译缓存的绝对过期时间（秒）
pub const DEFAULT_CACHE_TTL_SECS: u64 = 2 * 60 * 60;

/// 远程翻译请求超时（秒）
pub const DEFAULT_TRANSLATOR_TIMEOUT_SECS: u64 = 30;

/// 默认翻译接口地址
pub const DEFAULT_TRANSLATOR_API_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// 默认界面语言
pub const DEFAULT_CULTURE_CODE: &str = "en-US";

/// 同时在线的 SSE 连接上限
pub const MAX_SSE_CONNECTIONS: usize = 64;
