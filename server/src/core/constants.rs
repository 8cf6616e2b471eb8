// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Sentinews";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "sentinews";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "sentinews.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "SENTINEWS_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "SENTINEWS_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "SENTINEWS_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "SENTINEWS_LOG";

// =============================================================================
// Environment Variables - Infrastructure
// =============================================================================

/// Environment variable for the infra backend (`memory` or `redis`)
pub const ENV_INFRA_BACKEND: &str = "SENTINEWS_INFRA_BACKEND";

/// Environment variable for the Redis URL (bus + dedup window)
pub const ENV_REDIS_URL: &str = "SENTINEWS_REDIS_URL";

/// Environment variable for the SQLite database path
pub const ENV_SQLITE_PATH: &str = "SENTINEWS_SQLITE_PATH";

/// Environment variable for the LLM provider name
pub const ENV_LLM_PROVIDER: &str = "SENTINEWS_LLM_PROVIDER";

/// Environment variable for the LLM base URL
pub const ENV_LLM_BASE_URL: &str = "SENTINEWS_LLM_BASE_URL";

/// Environment variable for the LLM model id
pub const ENV_LLM_MODEL: &str = "SENTINEWS_LLM_MODEL";

/// Environment variable for the vector store URL
pub const ENV_QDRANT_URL: &str = "SENTINEWS_QDRANT_URL";

/// Environment variable for the embedding server URL
pub const ENV_EMBED_URL: &str = "SENTINEWS_EMBED_URL";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5180;

// =============================================================================
// Stream Bus Wire Contract
// =============================================================================

/// Stream carrying freshly collected articles
pub const NEWS_STREAM: &str = "news.raw";

/// Consumer group for the sentiment analyzer
pub const ANALYZER_GROUP: &str = "group_analyzer";

/// Consumer name for the sentiment analyzer (one replica per name)
pub const ANALYZER_CONSUMER: &str = "analyzer_1";

/// Consumer group for the vector archiver
pub const ARCHIVER_GROUP: &str = "group_archiver";

/// Consumer name for the vector archiver (one replica per name)
pub const ARCHIVER_CONSUMER: &str = "archiver_1";

/// Approximate ring-buffer cap for the news stream
pub const NEWS_STREAM_MAXLEN: u64 = 100_000;

/// Maximum block time for a group read in milliseconds
pub const READ_BLOCK_MS: u64 = 2000;

// =============================================================================
// Dedup Window
// =============================================================================

/// Prefix for day-keyed dedup sets (`dedup:news:YYYYMMDD`)
pub const DEDUP_KEY_PREFIX: &str = "dedup:news:";

/// Number of adjacent day keys probed for membership
pub const DEDUP_WINDOW_DAYS: u32 = 3;

/// TTL applied to a day key on every write
pub const DEDUP_TTL_SECS: u64 = 3 * 86_400;

// =============================================================================
// Pipeline Cadence and Budgets
// =============================================================================

/// Seconds between cycles during market hours
pub const DEFAULT_MARKET_INTERVAL_SECS: u64 = 10 * 60;

/// Seconds between cycles outside market hours
pub const DEFAULT_OFF_INTERVAL_SECS: u64 = 30 * 60;

/// First local hour counted as market hours (inclusive)
pub const MARKET_OPEN_HOUR: u32 = 7;

/// Local hour at which market hours end (exclusive)
pub const MARKET_CLOSE_HOUR: u32 = 16;

/// Archive phase runs every Nth cycle
pub const ARCHIVE_EVERY_N_CYCLES: u64 = 3;

/// Analyzer budget per cycle is `collected` plus this slack
pub const ANALYZER_BUDGET_SLACK: usize = 50;

/// Analyzer budget for the manual `/analyze` trigger
pub const ANALYZE_TRIGGER_BUDGET: usize = 500;

/// Entries per analyzer group read
pub const ANALYZER_READ_BATCH: usize = 10;

/// Entries per archiver group read
pub const ARCHIVER_BATCH_SIZE: usize = 20;

/// Archiver budget per run
pub const ARCHIVER_BUDGET: usize = 1000;

/// Concurrent in-flight LLM calls in the analyzer
pub const DEFAULT_ANALYZER_CONCURRENCY: usize = 10;

/// Pages crawled per ticker
pub const DEFAULT_MAX_PAGES: u32 = 2;

/// Delay between tickers (and between pages) in milliseconds
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 300;

// =============================================================================
// Persisted Field Bounds
// =============================================================================

/// Maximum stored headline length
pub const MAX_HEADLINE_LEN: usize = 500;

/// Maximum stored sentiment reason length
pub const MAX_REASON_LEN: usize = 2000;

/// Maximum stored article URL length
pub const MAX_URL_LEN: usize = 1000;

// =============================================================================
// External Call Timeouts
// =============================================================================

/// Timeout for upstream news index fetches in seconds
pub const CRAWL_TIMEOUT_SECS: u64 = 10;

/// Timeout for embedding and vector-store calls in seconds
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Timeout ceiling for a single LLM call in seconds
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Shutdown
// =============================================================================

/// Maximum seconds to wait for background tasks during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Curated Keyword Defaults
// =============================================================================

/// Default noise-headline blocklist: short-lived market colour that is
/// useless for per-ticker sentiment. Tunable via config without a deploy.
pub const DEFAULT_NOISE_KEYWORDS: &[&str] = &[
    "특징주",
    "오전 시황",
    "장마감",
    "마감 시황",
    "급등락",
    "오늘의 증시",
    "환율",
    "개장",
    "출발",
    "상위 종목",
    "단독",
    "인포",
    "증권리포트",
    "장중시황",
    "[이슈종합]",
    "인기 기업",
    "한줄리포트",
    "이 시각 증권",
];

/// Default breaking-news markers. Surfaced as a flag on analyzed
/// headlines; does not change delivery semantics.
pub const DEFAULT_EMERGENCY_KEYWORDS: &[&str] = &[
    "속보",
    "긴급",
    "전쟁",
    "관세",
    "Emergency",
    "Breaking",
    "파병",
    "계엄",
    "공습",
    "폭격",
];
